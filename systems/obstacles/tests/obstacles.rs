use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wayfinder_core::{CellCoord, Event};
use wayfinder_system_obstacles::ObstacleScheduler;
use wayfinder_world::{query, GridWorld};

const AGENT: CellCoord = CellCoord::new(0, 0);
const GOAL: CellCoord = CellCoord::new(9, 9);

fn populated_world(seed: u64) -> (GridWorld, ObstacleScheduler) {
    let mut world = GridWorld::new(10, 10).expect("grid");
    world.reserve(AGENT).expect("reserve agent");
    world.reserve(GOAL).expect("reserve goal");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let _ = world.place_static(25, &mut rng).expect("statics");
    let entities = world.spawn_mobile(12, &mut rng).expect("mobiles");
    (world, ObstacleScheduler::seeded(entities, seed))
}

#[test]
fn uniqueness_invariant_holds_after_every_tick() {
    let (mut world, mut scheduler) = populated_world(0xfeed);
    let statics_before = query::static_count(&world);

    for _ in 0..250 {
        let mut events = Vec::new();
        let entities = scheduler.tick(&mut world, &[AGENT, GOAL], &mut events);

        let cells: HashSet<_> = entities.iter().map(|entity| entity.cell).collect();
        assert_eq!(cells.len(), entities.len(), "two entities share a cell");
        assert!(!cells.contains(&AGENT), "entity entered the agent cell");
        assert!(!cells.contains(&GOAL), "entity entered the goal cell");
        assert!(scheduler.mirrors(&world));
        assert_eq!(query::static_count(&world), statics_before);
    }
}

#[test]
fn every_reported_move_is_a_single_step() {
    let (mut world, mut scheduler) = populated_world(0xbead);

    for _ in 0..100 {
        let mut events = Vec::new();
        let _ = scheduler.tick(&mut world, &[AGENT, GOAL], &mut events);
        assert_eq!(events.len(), scheduler.entities().len());

        for event in events {
            match event {
                Event::EntityMoved { from, to, .. } => {
                    assert_eq!(from.manhattan_distance(to), 1);
                }
                Event::EntityHeld { .. } => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}

#[test]
fn replay_with_same_seed_is_identical() {
    let replay = |seed: u64| {
        let (mut world, mut scheduler) = populated_world(seed);
        let mut log = Vec::new();
        for _ in 0..60 {
            let _ = scheduler.tick(&mut world, &[AGENT, GOAL], &mut log);
        }
        (log, query::cells(&world))
    };

    assert_eq!(replay(7), replay(7));
}
