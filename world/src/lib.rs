#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative occupancy grid for Wayfinder.
//!
//! [`GridWorld`] owns a dense, row-major array of [`Cell`] values together
//! with the set of cells reserved for the agent and the goal. Every mutation
//! goes through a primitive that checks the occupancy-uniqueness invariant at
//! the world boundary, so callers never have to assume a move is safe.

use rand::{seq::SliceRandom, Rng};
use tracing::debug;
use wayfinder_core::{
    Cell, CellCoord, EntityId, MobileEntity, MobileKind, MoveError, SetupError, StaticKind,
};

/// Represents the authoritative occupancy grid.
#[derive(Clone, Debug)]
pub struct GridWorld {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
    reserved: Vec<CellCoord>,
    next_entity: u32,
}

impl GridWorld {
    /// Creates an empty grid with the provided dimensions.
    pub fn new(columns: u32, rows: u32) -> Result<Self, SetupError> {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        if capacity == 0 {
            return Err(SetupError::InvalidDimensions { columns, rows });
        }

        Ok(Self {
            columns,
            rows,
            cells: vec![Cell::Empty; capacity],
            reserved: Vec::new(),
            next_entity: 0,
        })
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Marks a cell that random placement must never select.
    pub fn reserve(&mut self, cell: CellCoord) -> Result<(), SetupError> {
        let occupant = self.occupant_at(cell).ok_or(SetupError::OutOfBounds(cell))?;
        if !occupant.is_empty() {
            return Err(SetupError::CellUnavailable(cell));
        }
        if !self.is_reserved(cell) {
            self.reserved.push(cell);
        }
        Ok(())
    }

    /// Drops a reservation, returning whether the cell was reserved.
    pub fn release(&mut self, cell: CellCoord) -> bool {
        let before = self.reserved.len();
        self.reserved.retain(|reserved| *reserved != cell);
        self.reserved.len() != before
    }

    /// Reports whether the cell was reserved for the agent or goal.
    #[must_use]
    pub fn is_reserved(&self, cell: CellCoord) -> bool {
        self.reserved.contains(&cell)
    }

    /// Number of empty cells that are not reserved.
    #[must_use]
    pub fn free_cell_count(&self) -> usize {
        self.placement_candidates().len()
    }

    /// Places `count` static obstacles of random kinds on distinct free cells.
    ///
    /// Fails without mutating the grid when fewer than `count` free cells
    /// remain.
    pub fn place_static<R>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<CellCoord>, SetupError>
    where
        R: Rng + ?Sized,
    {
        let cells = self.sample_free(count, rng)?;
        for &cell in &cells {
            let kind = StaticKind::ALL[rng.gen_range(0..StaticKind::ALL.len())];
            self.write(cell, Cell::StaticObstacle(kind));
        }
        debug!(count, "placed static obstacles");
        Ok(cells)
    }

    /// Spawns `count` mobile obstacles of random kinds on distinct free cells.
    ///
    /// Reserved cells are never selected. Fails without mutating the grid when
    /// fewer than `count` free cells remain.
    pub fn spawn_mobile<R>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<MobileEntity>, SetupError>
    where
        R: Rng + ?Sized,
    {
        let cells = self.sample_free(count, rng)?;
        let mut entities = Vec::with_capacity(cells.len());
        for cell in cells {
            let kind = MobileKind::ALL[rng.gen_range(0..MobileKind::ALL.len())];
            let id = self.allocate_entity_id();
            self.write(cell, Cell::MobileObstacle(kind, id));
            entities.push(MobileEntity { id, kind, cell });
        }
        debug!(count, "spawned mobile obstacles");
        Ok(entities)
    }

    /// Places a static obstacle on a specific free, unreserved cell.
    pub fn set_static(&mut self, cell: CellCoord, kind: StaticKind) -> Result<(), SetupError> {
        self.ensure_placeable(cell)?;
        self.write(cell, Cell::StaticObstacle(kind));
        Ok(())
    }

    /// Places a mobile obstacle on a specific free, unreserved cell.
    pub fn insert_mobile(
        &mut self,
        cell: CellCoord,
        kind: MobileKind,
    ) -> Result<MobileEntity, SetupError> {
        self.ensure_placeable(cell)?;
        let id = self.allocate_entity_id();
        self.write(cell, Cell::MobileObstacle(kind, id));
        Ok(MobileEntity { id, kind, cell })
    }

    /// Returns the occupant of the cell, or `None` when out of bounds.
    #[must_use]
    pub fn occupant_at(&self, cell: CellCoord) -> Option<Cell> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the cell is in bounds and empty.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.occupant_at(cell).map_or(false, |occupant| occupant.is_empty())
    }

    /// Atomically moves the occupant of `from` onto `to`.
    ///
    /// The move is rejected, leaving the grid untouched, when either endpoint
    /// is out of bounds, `from` is empty, or `to` is occupied or reserved.
    pub fn move_occupant(&mut self, from: CellCoord, to: CellCoord) -> Result<Cell, MoveError> {
        let (Some(from_index), Some(to_index)) = (self.index(from), self.index(to)) else {
            return Err(MoveError::OutOfBounds);
        };

        let occupant = self.cells[from_index];
        if occupant.is_empty() {
            return Err(MoveError::SourceEmpty);
        }
        if !self.cells[to_index].is_empty() || self.is_reserved(to) {
            return Err(MoveError::TargetOccupied);
        }

        self.cells[from_index] = Cell::Empty;
        self.cells[to_index] = occupant;
        Ok(occupant)
    }

    /// Clears the cell, returning its previous occupant.
    pub fn vacate(&mut self, cell: CellCoord) -> Option<Cell> {
        let index = self.index(cell)?;
        let previous = self.cells[index];
        self.cells[index] = Cell::Empty;
        Some(previous)
    }

    fn ensure_placeable(&self, cell: CellCoord) -> Result<(), SetupError> {
        let occupant = self.occupant_at(cell).ok_or(SetupError::OutOfBounds(cell))?;
        if !occupant.is_empty() || self.is_reserved(cell) {
            return Err(SetupError::CellUnavailable(cell));
        }
        Ok(())
    }

    fn sample_free<R>(&self, count: usize, rng: &mut R) -> Result<Vec<CellCoord>, SetupError>
    where
        R: Rng + ?Sized,
    {
        let mut candidates = self.placement_candidates();
        if count > candidates.len() {
            return Err(SetupError::InsufficientCapacity {
                requested: count,
                available: candidates.len(),
            });
        }

        candidates.shuffle(rng);
        candidates.truncate(count);
        Ok(candidates)
    }

    fn placement_candidates(&self) -> Vec<CellCoord> {
        let mut candidates = Vec::with_capacity(self.cells.len());
        for row in 0..self.rows {
            for column in 0..self.columns {
                let cell = CellCoord::new(column, row);
                if self.is_free(cell) && !self.is_reserved(cell) {
                    candidates.push(cell);
                }
            }
        }
        candidates
    }

    fn allocate_entity_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity = self.next_entity.saturating_add(1);
        id
    }

    fn write(&mut self, cell: CellCoord, occupant: Cell) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = occupant;
            }
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
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

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::GridWorld;
    use wayfinder_core::{Cell, CellCoord, EntityId, OccupancyView};

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &GridWorld) -> OccupancyView<'_> {
        OccupancyView::new(&world.cells, world.columns, world.rows)
    }

    /// Copies the row-major grid contents.
    #[must_use]
    pub fn cells(world: &GridWorld) -> Vec<Cell> {
        world.cells.clone()
    }

    /// Enumerates every mobile-occupied cell in row-major order.
    #[must_use]
    pub fn mobile_cells(world: &GridWorld) -> Vec<(EntityId, CellCoord)> {
        let view = occupancy_view(world);
        let (columns, rows) = view.dimensions();
        let mut occupied = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                let cell = CellCoord::new(column, row);
                if let Some(id) = view.occupant(cell).and_then(|occupant| occupant.entity()) {
                    occupied.push((id, cell));
                }
            }
        }
        occupied
    }

    /// Number of cells holding static obstacles.
    #[must_use]
    pub fn static_count(world: &GridWorld) -> usize {
        world
            .cells
            .iter()
            .filter(|cell| matches!(cell, Cell::StaticObstacle(_)))
            .count()
    }
}
