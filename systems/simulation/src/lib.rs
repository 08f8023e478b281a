#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Joint tick driver that wires the grid, the obstacle scheduler and the
//! navigation controller into one deterministic simulation.
//!
//! Every tick runs both phases inside a single mutation section in the order
//! selected by [`TickOrder`], so neither phase ever observes a grid that the
//! other is halfway through mutating.

use std::time::Duration;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use wayfinder_core::{
    CellCoord, Event, Goal, MobileEntity, NavigationState, SceneSnapshot, SetupError,
};
use wayfinder_system_navigation::NavigationController;
use wayfinder_system_obstacles::ObstacleScheduler;
use wayfinder_system_relay::{RelayConfig, RelayConfigError};
use wayfinder_world::{query, GridWorld};

const PLACEMENT_STREAM: u64 = 0;
const SCHEDULER_STREAM: u64 = 1;
const DEFAULT_TICK_BUDGET_FACTOR: u64 = 4;

/// Order in which the two phases run inside a joint tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOrder {
    /// Obstacles move, then the agent replans and steps.
    #[default]
    ObstaclesFirst,
    /// The agent replans and steps, then obstacles move.
    AgentFirst,
    /// Even ticks run obstacles first, odd ticks run the agent first.
    Alternating,
}

impl TickOrder {
    /// Reports whether obstacles move before the agent on the given tick.
    #[must_use]
    pub const fn obstacles_first(self, tick: u64) -> bool {
        match self {
            Self::ObstaclesFirst => true,
            Self::AgentFirst => false,
            Self::Alternating => tick % 2 == 0,
        }
    }
}

/// Failures raised while loading or validating a simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration describes an impossible world.
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// The relay thresholds are inconsistent.
    #[error(transparent)]
    Relay(#[from] RelayConfigError),
}

/// Recognised simulation options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid width in cells.
    pub columns: u32,
    /// Grid height in cells.
    pub rows: u32,
    /// Number of static obstacles placed at setup.
    pub static_count: usize,
    /// Number of mobile obstacles spawned at setup.
    pub mobile_count: usize,
    /// Real-time pacing between ticks, in milliseconds.
    pub tick_period_ms: u64,
    /// Seed for placement and obstacle movement.
    pub seed: u64,
    /// Phase order inside a joint tick.
    pub tick_order: TickOrder,
    /// Start and goal must be strictly further apart than this many cells.
    /// Defaults to half the grid width.
    pub min_goal_distance: Option<u32>,
    /// Consecutive blocked ticks tolerated before the agent gives up.
    pub blocked_patience: u32,
    /// Upper bound on executed ticks. Defaults to four times the grid area.
    pub max_ticks: Option<u64>,
    /// Explicit agent start cell.
    pub start: Option<CellCoord>,
    /// Explicit goal cell.
    pub goal: Option<CellCoord>,
    /// Instruction relay thresholds.
    pub relay: RelayConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            columns: 20,
            rows: 20,
            static_count: 60,
            mobile_count: 7,
            tick_period_ms: 1_000,
            seed: 0x5eed_cafe,
            tick_order: TickOrder::default(),
            min_goal_distance: None,
            blocked_patience: 0,
            max_ticks: None,
            start: None,
            goal: None,
            relay: RelayConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parses a configuration from a TOML document; absent keys keep defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks dimensions, placement capacity, endpoints and relay thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(SetupError::InvalidDimensions {
                columns: self.columns,
                rows: self.rows,
            }
            .into());
        }

        let area = self.area();
        let endpoint_cells = 2_u64;
        if area < endpoint_cells {
            return Err(SetupError::InsufficientCapacity {
                requested: 2,
                available: usize::try_from(area).unwrap_or(usize::MAX),
            }
            .into());
        }

        let requested = self.static_count.saturating_add(self.mobile_count);
        let available = usize::try_from(area - endpoint_cells).unwrap_or(usize::MAX);
        if requested > available {
            return Err(SetupError::InsufficientCapacity {
                requested,
                available,
            }
            .into());
        }

        for cell in [self.start, self.goal].into_iter().flatten() {
            if cell.column() >= self.columns || cell.row() >= self.rows {
                return Err(SetupError::OutOfBounds(cell).into());
            }
        }
        if self.start.is_some() && self.start == self.goal {
            return Err(SetupError::GoalMatchesStart.into());
        }

        self.relay.validate()?;
        Ok(())
    }

    /// Pacing between ticks.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Exclusive minimum start/goal separation.
    #[must_use]
    pub fn min_goal_distance(&self) -> u32 {
        self.min_goal_distance.unwrap_or(self.columns / 2)
    }

    /// Tick budget for [`Simulation::run`].
    #[must_use]
    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
            .unwrap_or_else(|| self.area().saturating_mul(DEFAULT_TICK_BUDGET_FACTOR))
    }

    fn area(&self) -> u64 {
        u64::from(self.columns) * u64::from(self.rows)
    }
}

/// Pre-built world contents handed to [`Simulation::from_layout`].
#[derive(Clone, Debug)]
pub struct Layout {
    /// Grid holding every obstacle.
    pub world: GridWorld,
    /// Mobile entities in resolution order, mirroring the grid.
    pub entities: Vec<MobileEntity>,
    /// Agent start cell.
    pub start: CellCoord,
    /// Goal cell.
    pub goal: CellCoord,
}

/// Consumer of the per-tick event stream.
pub trait EventSink {
    /// Receives every event emitted during `tick`.
    fn publish(&mut self, tick: u64, events: &[Event]);
}

impl EventSink for Vec<Event> {
    fn publish(&mut self, _tick: u64, events: &[Event]) {
        self.extend_from_slice(events);
    }
}

/// Sink that forwards events into `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&mut self, tick: u64, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentStepped {
                    from,
                    to,
                    direction,
                } => info!(tick, ?from, ?to, ?direction, "agent stepped"),
                Event::NeighborDetected { cell, kind } => {
                    info!(tick, ?cell, kind = kind.name(), "neighbor object detected")
                }
                Event::AgentBlocked { cell, waited } => {
                    info!(tick, ?cell, waited, "agent blocked")
                }
                Event::Arrived { cell } => info!(tick, ?cell, "arrived"),
                Event::Stuck { cell } => warn!(tick, ?cell, "stuck"),
                Event::StepRejected { from, to, reason } => {
                    warn!(tick, ?from, ?to, %reason, "step rejected")
                }
                Event::EntityMoved { entity, from, to } => {
                    debug!(tick, entity = entity.get(), ?from, ?to, "entity moved")
                }
                Event::EntityHeld { entity, cell } => {
                    debug!(tick, entity = entity.get(), ?cell, "entity held")
                }
                Event::TickStarted { .. } => {}
            }
        }
    }
}

/// Outcome of [`Simulation::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Navigation state when the run stopped.
    pub state: NavigationState,
    /// Joint ticks executed in total.
    pub ticks: u64,
    /// Successful agent steps.
    pub steps: u64,
    /// Cells recorded in the agent's trail.
    pub trail_len: usize,
    /// Reports whether the tick budget ran out before a terminal state.
    pub exhausted: bool,
}

/// Owns every component and advances them one joint tick at a time.
#[derive(Clone, Debug)]
pub struct Simulation {
    world: GridWorld,
    scheduler: ObstacleScheduler,
    controller: NavigationController,
    order: TickOrder,
    tick: u64,
    max_ticks: u64,
}

impl Simulation {
    /// Builds a randomly populated simulation from the configuration.
    ///
    /// Start and goal are chosen (unless given) and reserved before any
    /// obstacle is placed. Capacity violations fail before placement starts.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        rng.set_stream(PLACEMENT_STREAM);

        let mut world = GridWorld::new(config.columns, config.rows)?;
        let (start, goal) = select_endpoints(config, &mut rng)?;
        world.reserve(start)?;
        world.reserve(goal)?;
        let _ = world.place_static(config.static_count, &mut rng)?;
        let entities = world.spawn_mobile(config.mobile_count, &mut rng)?;

        info!(
            columns = config.columns,
            rows = config.rows,
            ?start,
            ?goal,
            statics = config.static_count,
            mobiles = entities.len(),
            "simulation initialised"
        );

        Self::from_layout(
            Layout {
                world,
                entities,
                start,
                goal,
            },
            config,
        )
    }

    /// Builds a simulation around an explicit layout.
    ///
    /// Only the seed, tick order, patience and tick budget are read from
    /// `config`.
    pub fn from_layout(layout: Layout, config: &SimulationConfig) -> Result<Self, ConfigError> {
        let Layout {
            mut world,
            entities,
            start,
            goal,
        } = layout;

        if start == goal {
            return Err(SetupError::GoalMatchesStart.into());
        }
        world.reserve(start)?;
        world.reserve(goal)?;
        // The agent moves on, so only the goal stays closed to obstacles.
        let _ = world.release(start);

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        rng.set_stream(SCHEDULER_STREAM);
        let scheduler = ObstacleScheduler::new(entities, rng);
        if !scheduler.mirrors(&world) {
            return Err(SetupError::EntityMismatch.into());
        }

        Ok(Self {
            world,
            scheduler,
            controller: NavigationController::with_patience(
                start,
                Goal::at(goal),
                config.blocked_patience,
            ),
            order: config.tick_order,
            tick: 0,
            max_ticks: config.max_ticks(),
        })
    }

    /// Runs one joint tick: both phases in the configured order.
    ///
    /// After a terminal state obstacles keep moving but the agent and trail
    /// are frozen.
    pub fn tick(&mut self, out: &mut Vec<Event>) -> NavigationState {
        out.push(Event::TickStarted { tick: self.tick });

        if self.order.obstacles_first(self.tick) {
            self.step_obstacles(out);
            self.step_agent(out);
        } else {
            self.step_agent(out);
            self.step_obstacles(out);
        }

        self.tick = self.tick.saturating_add(1);
        self.controller.state()
    }

    /// Ticks until a terminal state or the tick budget, publishing every
    /// tick's events to `sink`.
    pub fn run<S>(&mut self, sink: &mut S) -> RunSummary
    where
        S: EventSink + ?Sized,
    {
        let mut events = Vec::new();
        while !self.state().is_terminal() && self.tick < self.max_ticks {
            events.clear();
            let tick = self.tick;
            let _ = self.tick(&mut events);
            sink.publish(tick, &events);
        }

        let state = self.state();
        if !state.is_terminal() {
            warn!(ticks = self.tick, "tick budget exhausted before a terminal state");
        }

        RunSummary {
            state,
            ticks: self.tick,
            steps: self.controller.steps_taken(),
            trail_len: self.controller.trail().len(),
            exhausted: !state.is_terminal(),
        }
    }

    /// Captures grid contents, agent, goal and trail for renderers.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            columns: self.world.columns(),
            rows: self.world.rows(),
            cells: query::cells(&self.world),
            agent: self.controller.agent(),
            goal: self.controller.goal().cell(),
            trail: self.controller.trail().to_vec(),
            state: self.controller.state(),
            tick: self.tick,
        }
    }

    /// Current navigation state.
    #[must_use]
    pub fn state(&self) -> NavigationState {
        self.controller.state()
    }

    /// Number of joint ticks executed.
    #[must_use]
    pub const fn tick_index(&self) -> u64 {
        self.tick
    }

    /// Read-only access to the grid.
    #[must_use]
    pub const fn world(&self) -> &GridWorld {
        &self.world
    }

    /// Read-only access to the navigation controller.
    #[must_use]
    pub const fn controller(&self) -> &NavigationController {
        &self.controller
    }

    /// Read-only access to the obstacle scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &ObstacleScheduler {
        &self.scheduler
    }

    fn step_obstacles(&mut self, out: &mut Vec<Event>) {
        let reserved = [self.controller.agent(), self.controller.goal().cell()];
        let _ = self.scheduler.tick(&mut self.world, &reserved, out);
    }

    fn step_agent(&mut self, out: &mut Vec<Event>) {
        let view = query::occupancy_view(&self.world);
        let _ = self.controller.advance(view, out);
    }
}

fn select_endpoints(
    config: &SimulationConfig,
    rng: &mut ChaCha8Rng,
) -> Result<(CellCoord, CellCoord), SetupError> {
    if let (Some(start), Some(goal)) = (config.start, config.goal) {
        return Ok((start, goal));
    }

    let mut cells: Vec<CellCoord> = (0..config.rows)
        .flat_map(|row| (0..config.columns).map(move |column| CellCoord::new(column, row)))
        .collect();
    cells.shuffle(rng);

    let starts = config.start.map_or_else(|| cells.clone(), |start| vec![start]);
    let goals = config.goal.map_or_else(|| cells.clone(), |goal| vec![goal]);
    let min_distance = config.min_goal_distance();
    let threshold = u64::from(min_distance) * u64::from(min_distance);

    for &start in &starts {
        if let Some(&goal) = goals
            .iter()
            .find(|goal| **goal != start && start.squared_distance(**goal) > threshold)
        {
            return Ok((start, goal));
        }
    }

    Err(SetupError::NoGoalCandidate { min_distance })
}
