#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Wayfinder simulation in the terminal.

mod narration;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wayfinder_core::{ObjectRegistry, WELCOME_BANNER};
use wayfinder_rendering::{legend, Palette, Renderer, TextRenderer};
use wayfinder_system_relay::InstructionFilter;
use wayfinder_system_simulation::{EventSink, Simulation, SimulationConfig, TickOrder};

use crate::narration::NarrationSink;

const DEFAULT_CONFIG_FILE: &str = "wayfinder.toml";
const DEFAULT_LOG_DIRECTIVE: &str = "wayfinder=info";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TickOrderArg {
    ObstaclesFirst,
    AgentFirst,
    Alternating,
}

impl From<TickOrderArg> for TickOrder {
    fn from(value: TickOrderArg) -> Self {
        match value {
            TickOrderArg::ObstaclesFirst => Self::ObstaclesFirst,
            TickOrderArg::AgentFirst => Self::AgentFirst,
            TickOrderArg::Alternating => Self::Alternating,
        }
    }
}

/// Runs an agent across a grid of static and moving obstacles.
#[derive(Debug, Parser)]
#[command(name = "wayfinder", version, about)]
struct Args {
    /// TOML configuration file; `wayfinder.toml` is used when present.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Grid width in cells.
    #[arg(long)]
    columns: Option<u32>,
    /// Grid height in cells.
    #[arg(long)]
    rows: Option<u32>,
    /// Number of static obstacles.
    #[arg(long = "static")]
    static_count: Option<usize>,
    /// Number of mobile obstacles.
    #[arg(long = "mobile")]
    mobile_count: Option<usize>,
    /// Milliseconds between ticks when running in real time.
    #[arg(long = "tick-ms")]
    tick_period_ms: Option<u64>,
    /// Seed for placement and obstacle movement.
    #[arg(long)]
    seed: Option<u64>,
    /// Phase order inside a tick.
    #[arg(long, value_enum)]
    tick_order: Option<TickOrderArg>,
    /// Blocked ticks tolerated before giving up.
    #[arg(long)]
    patience: Option<u32>,
    /// Maximum number of ticks to execute.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Draw every tick and pace the run with the tick period.
    #[arg(long)]
    realtime: bool,
    /// Colour the agent, goal and trail with ANSI escapes.
    #[arg(long)]
    color: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                load_config(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                info!("using default configuration");
                SimulationConfig::default()
            }
        };

        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(count) = self.static_count {
            config.static_count = count;
        }
        if let Some(count) = self.mobile_count {
            config.mobile_count = count;
        }
        if let Some(period) = self.tick_period_ms {
            config.tick_period_ms = period;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(order) = self.tick_order {
            config.tick_order = order.into();
        }
        if let Some(patience) = self.patience {
            config.blocked_patience = patience;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = Some(max_ticks);
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    info!(?path, "loading configuration");
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    SimulationConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load {}", path.display()))
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVE))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// Entry point for the Wayfinder command-line interface.
fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();
    let config = args.resolve_config()?;

    let registry = ObjectRegistry::default();
    let mut renderer = TextRenderer::new(io::stdout(), registry.clone())?;
    if args.color {
        renderer = renderer.with_palette(Palette::default());
    }

    let mut simulation = Simulation::new(&config)?;
    let mut sink = NarrationSink::new(InstructionFilter::new(config.relay)?);

    println!("{WELCOME_BANNER}");
    for line in legend(&registry) {
        println!("{line}");
    }
    renderer.draw(&simulation.snapshot())?;

    if args.realtime {
        let mut events = Vec::new();
        while !simulation.state().is_terminal() && simulation.tick_index() < config.max_ticks() {
            thread::sleep(config.tick_period());
            events.clear();
            let tick = simulation.tick_index();
            let _ = simulation.tick(&mut events);
            sink.publish(tick, &events);
            announce(&mut sink)?;
            renderer.draw(&simulation.snapshot())?;
        }
    } else {
        let _ = simulation.run(&mut sink);
        announce(&mut sink)?;
        renderer.draw(&simulation.snapshot())?;
    }

    let state = simulation.state();
    if state.is_terminal() {
        info!(
            ?state,
            ticks = simulation.tick_index(),
            steps = simulation.controller().steps_taken(),
            "run finished"
        );
    } else {
        warn!(
            ticks = simulation.tick_index(),
            "tick budget exhausted before reaching a terminal state"
        );
    }
    Ok(())
}

fn announce(sink: &mut NarrationSink) -> Result<()> {
    let mut out = io::stdout().lock();
    for (tick, instruction) in sink.drain() {
        writeln!(out, "[{tick:>4}] {instruction}")?;
    }
    Ok(())
}
