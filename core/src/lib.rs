#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Wayfinder engine.
//!
//! This crate defines the vocabulary that connects the authoritative grid
//! world, the pure systems that plan and move entities, and the adapters that
//! present the simulation. The world owns a dense occupancy grid of [`Cell`]
//! values, systems read it through an [`OccupancyView`], and every observable
//! change is reported as an [`Event`] so external sinks (logs, narration,
//! network relays) can follow along without feeding back into core logic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Wayfinder.";

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Squared Euclidean distance between two cell coordinates.
    #[must_use]
    pub fn squared_distance(self, other: CellCoord) -> u64 {
        let columns = u64::from(self.column().abs_diff(other.column()));
        let rows = u64::from(self.row().abs_diff(other.row()));
        columns * columns + rows * rows
    }

    /// Cardinal neighbours that lie inside a `columns` x `rows` grid.
    ///
    /// Neighbours are yielded in [`Direction::ALL`] order.
    pub fn neighbors(self, columns: u32, rows: u32) -> impl Iterator<Item = CellCoord> {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| direction.step(self, columns, rows))
    }
}

/// Cardinal movement directions on the 4-connected grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in canonical clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Returns the cell one step away in this direction, if it is inside the grid.
    #[must_use]
    pub fn step(self, cell: CellCoord, columns: u32, rows: u32) -> Option<CellCoord> {
        let (column, row) = match self {
            Direction::North => (cell.column(), cell.row().checked_sub(1)?),
            Direction::East => (cell.column().checked_add(1)?, cell.row()),
            Direction::South => (cell.column(), cell.row().checked_add(1)?),
            Direction::West => (cell.column().checked_sub(1)?, cell.row()),
        };

        if column < columns && row < rows {
            Some(CellCoord::new(column, row))
        } else {
            None
        }
    }

    /// Direction of a single axis-aligned step from `from` to `to`.
    ///
    /// Returns `None` unless the two cells are exactly one step apart.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());

        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row() > from.row() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Kinds of obstacles that never move once placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaticKind {
    /// A tree.
    Tree,
    /// A park bench.
    Bench,
    /// A wall segment.
    Wall,
    /// A chair.
    Chair,
}

impl StaticKind {
    /// Every static kind, used for uniform random selection.
    pub const ALL: [StaticKind; 4] = [
        StaticKind::Tree,
        StaticKind::Bench,
        StaticKind::Wall,
        StaticKind::Chair,
    ];
}

/// Kinds of obstacles that wander the grid every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MobileKind {
    /// A dog.
    Dog,
    /// A bike.
    Bike,
}

impl MobileKind {
    /// Every mobile kind, used for uniform random selection.
    pub const ALL: [MobileKind; 2] = [MobileKind::Dog, MobileKind::Bike];
}

/// Identity of any obstacle, static or mobile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Obstacle that never moves.
    Static(StaticKind),
    /// Obstacle that moves one cell per tick.
    Mobile(MobileKind),
}

impl ObstacleKind {
    /// Human readable name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Static(StaticKind::Tree) => "Tree",
            Self::Static(StaticKind::Bench) => "Bench",
            Self::Static(StaticKind::Wall) => "Wall",
            Self::Static(StaticKind::Chair) => "Chair",
            Self::Mobile(MobileKind::Dog) => "Dog",
            Self::Mobile(MobileKind::Bike) => "Bike",
        }
    }
}

/// Unique identifier assigned to a mobile entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Contents of a single grid cell. A cell holds at most one occupant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Nothing occupies the cell.
    #[default]
    Empty,
    /// A static obstacle of the given kind.
    StaticObstacle(StaticKind),
    /// A mobile obstacle of the given kind owned by the given entity.
    MobileObstacle(MobileKind, EntityId),
}

impl Cell {
    /// Reports whether the cell holds no occupant.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Kind of the occupant, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<ObstacleKind> {
        match *self {
            Cell::Empty => None,
            Cell::StaticObstacle(kind) => Some(ObstacleKind::Static(kind)),
            Cell::MobileObstacle(kind, _) => Some(ObstacleKind::Mobile(kind)),
        }
    }

    /// Entity owning the cell when it holds a mobile obstacle.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityId> {
        match *self {
            Cell::MobileObstacle(_, id) => Some(id),
            _ => None,
        }
    }
}

/// A mobile obstacle tracked by the obstacle scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MobileEntity {
    /// Unique identifier of the entity.
    pub id: EntityId,
    /// Kind of the entity.
    pub kind: MobileKind,
    /// Cell currently occupied by the entity.
    pub cell: CellCoord,
}

/// Canonical representation of the agent's destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Goal {
    cell: CellCoord,
}

impl Goal {
    /// Creates a goal anchored at the provided cell coordinate.
    #[must_use]
    pub const fn at(cell: CellCoord) -> Self {
        Self { cell }
    }

    /// Returns the cell that defines the goal.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }
}

/// Ordered sequence of cells from a query start to a query goal.
///
/// Consecutive cells differ by exactly one axis-aligned step. An empty path
/// means no path exists; a single-cell path means the start already is the
/// goal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Wraps an ordered list of cells.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>) -> Self {
        Self { cells }
    }

    /// Path denoting that the goal is unreachable.
    #[must_use]
    pub fn unreachable() -> Self {
        Self { cells: Vec::new() }
    }

    /// Number of cells in the path, start and goal inclusive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the path is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells composing the path.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Cell following the start, when further movement is possible.
    #[must_use]
    pub fn next_hop(&self) -> Option<CellCoord> {
        self.cells.get(1).copied()
    }
}

/// Read-only view into the dense occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Cell],
    columns: u32,
    rows: u32,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Cell], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Returns the occupant of the provided cell, or `None` when out of bounds.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<Cell> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the cell is in bounds and empty.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.occupant(cell).map_or(false, |occupant| occupant.is_empty())
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Provides the dimensions of the underlying occupancy grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Row-major index of the cell, when it is in bounds.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Progress of the navigation controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationState {
    /// The agent is still travelling toward the goal.
    #[default]
    Planning,
    /// The agent occupies the goal cell. Terminal.
    Arrived,
    /// No path to the goal exists. Terminal.
    Stuck,
}

impl NavigationState {
    /// Reports whether no further progress can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Arrived | Self::Stuck)
    }
}

/// Events broadcast by the simulation for external sinks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces the start of a joint simulation tick.
    TickStarted {
        /// Zero-based index of the tick.
        tick: u64,
    },
    /// The agent moved one cell.
    AgentStepped {
        /// Cell the agent left.
        from: CellCoord,
        /// Cell the agent now occupies.
        to: CellCoord,
        /// Direction of travel.
        direction: Direction,
    },
    /// The agent's planned step was rejected because the target was not free.
    StepRejected {
        /// Cell the agent stayed on.
        from: CellCoord,
        /// Cell the agent attempted to enter.
        to: CellCoord,
        /// Reason the move failed.
        reason: MoveError,
    },
    /// An occupied cell borders the agent after a step.
    NeighborDetected {
        /// Cell holding the detected occupant.
        cell: CellCoord,
        /// Kind of the detected occupant.
        kind: ObstacleKind,
    },
    /// No path exists this tick but the controller is still willing to wait.
    AgentBlocked {
        /// Cell the agent occupies.
        cell: CellCoord,
        /// Consecutive ticks spent blocked, including this one.
        waited: u32,
    },
    /// The agent reached the goal.
    Arrived {
        /// Goal cell.
        cell: CellCoord,
    },
    /// The goal is unreachable from the agent's position.
    Stuck {
        /// Cell the agent occupies.
        cell: CellCoord,
    },
    /// A mobile entity moved one cell.
    EntityMoved {
        /// Identifier of the entity.
        entity: EntityId,
        /// Cell the entity left.
        from: CellCoord,
        /// Cell the entity now occupies.
        to: CellCoord,
    },
    /// A mobile entity found no qualifying neighbour and stayed put.
    EntityHeld {
        /// Identifier of the entity.
        entity: EntityId,
        /// Cell the entity still occupies.
        cell: CellCoord,
    },
}

/// Immutable picture of the simulation handed to renderers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneSnapshot {
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Row-major grid contents.
    pub cells: Vec<Cell>,
    /// Cell the agent occupies.
    pub agent: CellCoord,
    /// Goal cell.
    pub goal: CellCoord,
    /// Cells the agent has occupied so far, oldest first.
    pub trail: Vec<CellCoord>,
    /// Navigation state at capture time.
    pub state: NavigationState,
    /// Number of joint ticks executed.
    pub tick: u64,
}

impl SceneSnapshot {
    /// Occupant of the provided cell, or `None` when out of bounds.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<Cell> {
        OccupancyView::new(&self.cells, self.columns, self.rows).occupant(cell)
    }
}

/// Visual appearance applied to an obstacle kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl DisplayColor {
    /// Creates a new color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// Display metadata registered for a single obstacle kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KindDisplay {
    /// Single character key used by text renderers and legends.
    pub key: char,
    /// Fill color used by graphical renderers.
    pub color: DisplayColor,
}

/// Immutable mapping from obstacle kind to display metadata.
///
/// The core never consults the registry; it is injected into renderers at
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRegistry {
    entries: Vec<(ObstacleKind, KindDisplay)>,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns a registry with `kind` mapped to the provided display, replacing
    /// any previous mapping.
    #[must_use]
    pub fn with_entry(mut self, kind: ObstacleKind, key: char, color: DisplayColor) -> Self {
        let display = KindDisplay { key, color };
        match self.entries.iter_mut().find(|(existing, _)| *existing == kind) {
            Some(entry) => entry.1 = display,
            None => self.entries.push((kind, display)),
        }
        self
    }

    /// Display metadata registered for the kind.
    #[must_use]
    pub fn display(&self, kind: ObstacleKind) -> Option<&KindDisplay> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == kind)
            .map(|(_, display)| display)
    }

    /// Registered entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ObstacleKind, &KindDisplay)> {
        self.entries.iter().map(|(kind, display)| (*kind, display))
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::empty()
            .with_entry(
                ObstacleKind::Static(StaticKind::Tree),
                'T',
                DisplayColor::from_rgb(0x00, 0x64, 0x00),
            )
            .with_entry(
                ObstacleKind::Static(StaticKind::Bench),
                'B',
                DisplayColor::from_rgb(0xa0, 0x52, 0x2d),
            )
            .with_entry(
                ObstacleKind::Static(StaticKind::Wall),
                'W',
                DisplayColor::from_rgb(0x80, 0x80, 0x80),
            )
            .with_entry(
                ObstacleKind::Static(StaticKind::Chair),
                'C',
                DisplayColor::from_rgb(0x8b, 0x00, 0x00),
            )
            .with_entry(
                ObstacleKind::Mobile(MobileKind::Dog),
                'D',
                DisplayColor::from_rgb(0xff, 0xa5, 0x00),
            )
            .with_entry(
                ObstacleKind::Mobile(MobileKind::Bike),
                'K',
                DisplayColor::from_rgb(0x00, 0x00, 0xff),
            )
    }
}

/// Setup-time failures raised while constructing a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SetupError {
    /// The grid must be at least one cell wide and tall.
    #[error("grid dimensions {columns}x{rows} are invalid; both must be at least 1")]
    InvalidDimensions {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// More entities were requested than free cells are available.
    #[error("requested {requested} placements but only {available} free cells remain")]
    InsufficientCapacity {
        /// Number of placements requested.
        requested: usize,
        /// Number of empty, unreserved cells.
        available: usize,
    },
    /// A coordinate lies outside the grid.
    #[error("cell ({}, {}) lies outside the grid", .0.column(), .0.row())]
    OutOfBounds(CellCoord),
    /// A coordinate is already occupied or reserved.
    #[error("cell ({}, {}) is already occupied or reserved", .0.column(), .0.row())]
    CellUnavailable(CellCoord),
    /// The goal coincides with the agent's start.
    #[error("goal coincides with the agent's start cell")]
    GoalMatchesStart,
    /// The mobile entity list does not mirror the grid's mobile cells.
    #[error("mobile entity list does not match the grid occupancy")]
    EntityMismatch,
    /// No goal cell satisfies the requested separation from any start cell.
    #[error("no start/goal pair is further apart than {min_distance} cells")]
    NoGoalCandidate {
        /// Required exclusive minimum distance.
        min_distance: u32,
    },
}

/// Reasons a grid move is rejected at the world boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum MoveError {
    /// Either endpoint lies outside the grid.
    #[error("move endpoint lies outside the grid")]
    OutOfBounds,
    /// The source cell holds no occupant.
    #[error("source cell is empty")]
    SourceEmpty,
    /// The destination cell is occupied or reserved.
    #[error("destination cell is not free")]
    TargetOccupied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
        assert_eq!(origin.squared_distance(destination), 13);
    }

    #[test]
    fn direction_between_neighbors() {
        let origin = CellCoord::new(3, 3);
        assert_eq!(
            Direction::between(origin, CellCoord::new(3, 2)),
            Some(Direction::North)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(4, 3)),
            Some(Direction::East)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(3, 4)),
            Some(Direction::South)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(2, 3)),
            Some(Direction::West)
        );
        assert_eq!(Direction::between(origin, origin), None);
        assert_eq!(Direction::between(origin, CellCoord::new(4, 4)), None);
    }

    #[test]
    fn neighbors_clip_to_grid_edges() {
        let corner: Vec<_> = CellCoord::new(0, 0).neighbors(3, 3).collect();
        assert_eq!(corner, vec![CellCoord::new(1, 0), CellCoord::new(0, 1)]);

        let centre: Vec<_> = CellCoord::new(1, 1).neighbors(3, 3).collect();
        assert_eq!(centre.len(), 4);

        let far: Vec<_> = CellCoord::new(2, 2).neighbors(3, 3).collect();
        assert_eq!(far, vec![CellCoord::new(2, 1), CellCoord::new(1, 2)]);
    }

    #[test]
    fn occupancy_view_treats_out_of_bounds_as_blocked() {
        let mut cells = vec![Cell::Empty; 4];
        cells[1] = Cell::StaticObstacle(StaticKind::Tree);
        let view = OccupancyView::new(&cells, 2, 2);

        assert!(view.is_free(CellCoord::new(0, 0)));
        assert!(!view.is_free(CellCoord::new(1, 0)));
        assert!(!view.is_free(CellCoord::new(2, 0)));
        assert_eq!(view.occupant(CellCoord::new(0, 5)), None);
        assert_eq!(
            view.occupant(CellCoord::new(1, 0)).and_then(|cell| cell.kind()),
            Some(ObstacleKind::Static(StaticKind::Tree))
        );
    }

    #[test]
    fn path_exposes_next_hop() {
        let path = Path::new(vec![CellCoord::new(0, 0), CellCoord::new(1, 0)]);
        assert_eq!(path.next_hop(), Some(CellCoord::new(1, 0)));
        assert_eq!(Path::new(vec![CellCoord::new(0, 0)]).next_hop(), None);
        assert!(Path::unreachable().is_empty());
    }

    #[test]
    fn default_registry_covers_every_kind() {
        let registry = ObjectRegistry::default();
        for kind in StaticKind::ALL {
            assert!(registry.display(ObstacleKind::Static(kind)).is_some());
        }
        for kind in MobileKind::ALL {
            assert!(registry.display(ObstacleKind::Mobile(kind)).is_some());
        }
    }

    #[test]
    fn registry_entries_can_be_replaced() {
        let kind = ObstacleKind::Mobile(MobileKind::Dog);
        let registry =
            ObjectRegistry::default().with_entry(kind, 'g', DisplayColor::from_rgb(1, 2, 3));
        let display = registry.display(kind).expect("dog registered");
        assert_eq!(display.key, 'g');
        assert_eq!(registry.iter().count(), 6);
    }

    #[test]
    fn terminal_states_are_flagged() {
        assert!(!NavigationState::Planning.is_terminal());
        assert!(NavigationState::Arrived.is_terminal());
        assert!(NavigationState::Stuck.is_terminal());
    }
}
