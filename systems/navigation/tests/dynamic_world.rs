use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wayfinder_core::{CellCoord, Event, Goal, NavigationState};
use wayfinder_system_navigation::NavigationController;
use wayfinder_system_obstacles::ObstacleScheduler;
use wayfinder_world::{query, GridWorld};

const START: CellCoord = CellCoord::new(0, 0);
const GOAL: CellCoord = CellCoord::new(11, 7);

fn crowded_world(seed: u64) -> (GridWorld, ObstacleScheduler) {
    let mut world = GridWorld::new(12, 8).expect("grid");
    world.reserve(START).expect("start");
    world.reserve(GOAL).expect("goal");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let _ = world.place_static(14, &mut rng).expect("statics");
    let entities = world.spawn_mobile(10, &mut rng).expect("mobiles");
    let _ = world.release(START);
    (world, ObstacleScheduler::seeded(entities, seed))
}

#[test]
fn agent_never_enters_an_occupied_cell_among_moving_obstacles() {
    for seed in 0..16 {
        let (mut world, mut scheduler) = crowded_world(seed);
        let mut controller = NavigationController::with_patience(START, Goal::at(GOAL), 4);
        let budget = 4 * 12 * 8;

        for _ in 0..budget {
            let mut events = Vec::new();
            let _ = scheduler.tick(&mut world, &[controller.agent(), GOAL], &mut events);
            let state = controller.advance(query::occupancy_view(&world), &mut events);

            assert!(world.is_free(controller.agent()), "seed {seed}");
            for event in &events {
                if let Event::AgentStepped { from, to, .. } = event {
                    assert_eq!(from.manhattan_distance(*to), 1);
                }
            }
            if state.is_terminal() {
                break;
            }
        }

        match controller.state() {
            NavigationState::Arrived => {
                assert_eq!(controller.agent(), GOAL);
                assert_eq!(controller.trail().last(), Some(&GOAL));
                assert_eq!(controller.trail().first(), Some(&START));
            }
            NavigationState::Stuck => assert_ne!(controller.agent(), GOAL),
            NavigationState::Planning => {}
        }
    }
}

#[test]
fn trail_records_every_step_in_order() {
    let (mut world, mut scheduler) = crowded_world(42);
    let mut controller = NavigationController::with_patience(START, Goal::at(GOAL), 8);
    let mut visited = Vec::new();

    for _ in 0..200 {
        let mut events = Vec::new();
        let _ = scheduler.tick(&mut world, &[controller.agent(), GOAL], &mut events);
        let before = controller.agent();
        let _ = controller.advance(query::occupancy_view(&world), &mut events);
        if controller.agent() != before {
            visited.push(before);
        }
        if controller.state().is_terminal() {
            break;
        }
    }

    if controller.state() == NavigationState::Arrived {
        visited.push(GOAL);
    }
    assert_eq!(controller.trail(), visited.as_slice());
    assert_eq!(
        controller.steps_taken() as usize,
        visited.len() - usize::from(controller.state() == NavigationState::Arrived)
    );
}
