#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Navigation controller that replans and advances the agent every tick.
//!
//! The agent is tracked out-of-band: it is never written into the occupancy
//! grid, so obstacle placement and movement cannot collide with it except
//! through the reserved-cell list the simulation hands to the scheduler.

use tracing::{debug, info, warn};
use wayfinder_core::{
    CellCoord, Direction, Event, Goal, MoveError, NavigationState, OccupancyView, Path,
};
use wayfinder_system_planner::PathPlanner;

/// Drives the agent one step per tick toward a fixed goal.
#[derive(Clone, Debug)]
pub struct NavigationController {
    agent: CellCoord,
    goal: Goal,
    trail: Vec<CellCoord>,
    state: NavigationState,
    planner: PathPlanner,
    patience: u32,
    blocked_for: u32,
    steps: u64,
}

impl NavigationController {
    /// Creates a controller that reports `Stuck` as soon as no path exists.
    #[must_use]
    pub fn new(start: CellCoord, goal: Goal) -> Self {
        Self::with_patience(start, goal, 0)
    }

    /// Creates a controller that waits up to `patience` consecutive blocked
    /// ticks before reporting `Stuck`.
    #[must_use]
    pub fn with_patience(start: CellCoord, goal: Goal, patience: u32) -> Self {
        Self {
            agent: start,
            goal,
            trail: Vec::new(),
            state: NavigationState::Planning,
            planner: PathPlanner::new(),
            patience,
            blocked_for: 0,
            steps: 0,
        }
    }

    /// Cell the agent currently occupies.
    #[must_use]
    pub const fn agent(&self) -> CellCoord {
        self.agent
    }

    /// Goal the agent travels toward.
    #[must_use]
    pub const fn goal(&self) -> Goal {
        self.goal
    }

    /// Cells the agent has occupied, oldest first.
    #[must_use]
    pub fn trail(&self) -> &[CellCoord] {
        &self.trail
    }

    /// Current navigation state.
    #[must_use]
    pub const fn state(&self) -> NavigationState {
        self.state
    }

    /// Number of successful steps taken.
    #[must_use]
    pub const fn steps_taken(&self) -> u64 {
        self.steps
    }

    /// Replans from scratch against `view` and advances the agent one cell.
    ///
    /// Once `Arrived` or `Stuck` is reached further calls return the same state
    /// without touching the agent, the trail, or `out`.
    pub fn advance(&mut self, view: OccupancyView<'_>, out: &mut Vec<Event>) -> NavigationState {
        if self.state.is_terminal() {
            return self.state;
        }

        let path = self.planner.find_path(view, self.agent, self.goal.cell());
        self.follow(&path, view, out)
    }

    /// Advances the agent one cell along a previously planned `path`.
    ///
    /// The step is checked against `view`, the grid as it is now. When the
    /// next cell has been taken since planning, the step is rejected and the
    /// agent stays put. A next hop that is not adjacent to the agent counts as
    /// no path.
    pub fn follow(
        &mut self,
        path: &Path,
        view: OccupancyView<'_>,
        out: &mut Vec<Event>,
    ) -> NavigationState {
        if self.state.is_terminal() {
            return self.state;
        }

        let Some(next) = path.next_hop() else {
            return self.halt(out);
        };
        let Some(direction) = Direction::between(self.agent, next) else {
            return self.halt(out);
        };
        self.blocked_for = 0;

        if !view.is_free(next) {
            warn!(?next, "planned step rejected");
            out.push(Event::StepRejected {
                from: self.agent,
                to: next,
                reason: MoveError::TargetOccupied,
            });
            return self.state;
        }

        let from = self.agent;
        self.trail.push(from);
        self.agent = next;
        self.steps += 1;
        debug!(?from, to = ?next, ?direction, "agent stepped");
        out.push(Event::AgentStepped {
            from,
            to: next,
            direction,
        });
        self.detect_neighbors(view, out);

        if self.agent == self.goal.cell() {
            self.trail.push(self.agent);
            self.arrive(out);
        }

        self.state
    }

    fn halt(&mut self, out: &mut Vec<Event>) -> NavigationState {
        if self.agent == self.goal.cell() {
            self.arrive(out);
        } else if self.blocked_for < self.patience {
            self.blocked_for += 1;
            debug!(cell = ?self.agent, waited = self.blocked_for, "agent blocked");
            out.push(Event::AgentBlocked {
                cell: self.agent,
                waited: self.blocked_for,
            });
        } else {
            self.state = NavigationState::Stuck;
            warn!(cell = ?self.agent, steps = self.steps, "goal unreachable");
            out.push(Event::Stuck { cell: self.agent });
        }
        self.state
    }

    fn arrive(&mut self, out: &mut Vec<Event>) {
        self.state = NavigationState::Arrived;
        info!(cell = ?self.agent, steps = self.steps, "agent arrived");
        out.push(Event::Arrived { cell: self.agent });
    }

    fn detect_neighbors(&self, view: OccupancyView<'_>, out: &mut Vec<Event>) {
        let (columns, rows) = view.dimensions();
        for neighbor in self.agent.neighbors(columns, rows) {
            if let Some(kind) = view.occupant(neighbor).and_then(|cell| cell.kind()) {
                out.push(Event::NeighborDetected {
                    cell: neighbor,
                    kind,
                });
            }
        }
    }
}
