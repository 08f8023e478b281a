use std::collections::HashSet;

use wayfinder_core::{Cell, CellCoord, Event, MobileKind, NavigationState, StaticKind};
use wayfinder_system_simulation::{Layout, Simulation, SimulationConfig, TickOrder};
use wayfinder_world::{query, GridWorld};

fn assert_scene_invariants(simulation: &Simulation) {
    let snapshot = simulation.snapshot();
    let agent = snapshot.agent;

    assert_eq!(
        snapshot.occupant(agent),
        Some(Cell::Empty),
        "agent shares a cell with an obstacle"
    );

    let mobiles = query::mobile_cells(simulation.world());
    let cells: HashSet<_> = mobiles.iter().map(|(_, cell)| *cell).collect();
    assert_eq!(cells.len(), mobiles.len());
    assert!(!cells.contains(&snapshot.goal));
    assert!(simulation.scheduler().mirrors(simulation.world()));

    for pair in snapshot.trail.windows(2) {
        assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
    }
}

#[test]
fn invariants_hold_through_random_runs() {
    for (seed, order) in [
        (1, TickOrder::ObstaclesFirst),
        (2, TickOrder::AgentFirst),
        (3, TickOrder::Alternating),
        (4, TickOrder::ObstaclesFirst),
    ] {
        let config = SimulationConfig {
            columns: 12,
            rows: 10,
            static_count: 20,
            mobile_count: 8,
            seed,
            tick_order: order,
            blocked_patience: 3,
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(&config).expect("simulation");
        let statics = query::static_count(simulation.world());

        for _ in 0..config.max_ticks() {
            let mut events = Vec::new();
            let state = simulation.tick(&mut events);
            assert_scene_invariants(&simulation);
            assert_eq!(query::static_count(simulation.world()), statics);
            if state.is_terminal() {
                break;
            }
        }
    }
}

#[test]
fn two_by_two_example_routes_around_obstacle() {
    let mut world = GridWorld::new(2, 2).expect("grid");
    world
        .set_static(CellCoord::new(1, 0), StaticKind::Tree)
        .expect("tree");
    let mut simulation = Simulation::from_layout(
        Layout {
            world,
            entities: Vec::new(),
            start: CellCoord::new(0, 0),
            goal: CellCoord::new(1, 1),
        },
        &SimulationConfig::default(),
    )
    .expect("simulation");

    let summary = simulation.run(&mut Vec::new());

    assert_eq!(summary.state, NavigationState::Arrived);
    assert_eq!(summary.steps, 2);
    assert_eq!(summary.trail_len, 3);
    assert!(!summary.exhausted);
    assert_eq!(
        simulation.controller().trail(),
        &[
            CellCoord::new(0, 0),
            CellCoord::new(0, 1),
            CellCoord::new(1, 1)
        ]
    );
}

#[test]
fn enclosed_goal_reports_stuck_within_grid_area() {
    let mut world = GridWorld::new(5, 5).expect("grid");
    let goal = CellCoord::new(4, 4);
    world
        .set_static(CellCoord::new(3, 4), StaticKind::Wall)
        .expect("wall");
    world
        .set_static(CellCoord::new(4, 3), StaticKind::Wall)
        .expect("wall");
    let mut simulation = Simulation::from_layout(
        Layout {
            world,
            entities: Vec::new(),
            start: CellCoord::new(0, 0),
            goal,
        },
        &SimulationConfig::default(),
    )
    .expect("simulation");

    let mut events: Vec<Event> = Vec::new();
    let summary = simulation.run(&mut events);

    assert_eq!(summary.state, NavigationState::Stuck);
    assert!(summary.ticks <= 25);
    assert!(events.contains(&Event::Stuck {
        cell: CellCoord::new(0, 0)
    }));
}

#[test]
fn obstacles_keep_moving_after_arrival() {
    let mut world = GridWorld::new(6, 1).expect("grid");
    let dog = world
        .insert_mobile(CellCoord::new(4, 0), MobileKind::Dog)
        .expect("dog");
    let mut simulation = Simulation::from_layout(
        Layout {
            world,
            entities: vec![dog],
            start: CellCoord::new(0, 0),
            goal: CellCoord::new(1, 0),
        },
        &SimulationConfig::default(),
    )
    .expect("simulation");

    let summary = simulation.run(&mut Vec::new());
    assert_eq!(summary.state, NavigationState::Arrived);

    let trail = simulation.controller().trail().to_vec();
    let mut events = Vec::new();
    for _ in 0..10 {
        assert_eq!(simulation.tick(&mut events), NavigationState::Arrived);
    }

    assert_eq!(simulation.controller().trail(), trail.as_slice());
    assert_eq!(simulation.controller().agent(), CellCoord::new(1, 0));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EntityMoved { .. })));
}

#[test]
fn exhausted_budget_is_reported() {
    let mut world = GridWorld::new(3, 1).expect("grid");
    world
        .set_static(CellCoord::new(1, 0), StaticKind::Bench)
        .expect("bench");
    let config = SimulationConfig {
        blocked_patience: 100,
        max_ticks: Some(5),
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::from_layout(
        Layout {
            world,
            entities: Vec::new(),
            start: CellCoord::new(0, 0),
            goal: CellCoord::new(2, 0),
        },
        &config,
    )
    .expect("simulation");

    let summary = simulation.run(&mut Vec::new());

    assert_eq!(summary.state, NavigationState::Planning);
    assert_eq!(summary.ticks, 5);
    assert!(summary.exhausted);
}
