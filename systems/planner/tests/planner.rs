use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wayfinder_core::{CellCoord, OccupancyView};
use wayfinder_system_planner::{find_path, HeapFrontier, PathPlanner};
use wayfinder_world::{query, GridWorld};

fn random_world(seed: u64) -> (GridWorld, CellCoord, CellCoord) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let columns = rng.gen_range(4..14);
    let rows = rng.gen_range(4..14);
    let start = CellCoord::new(0, 0);
    let goal = CellCoord::new(columns - 1, rows - 1);
    let mut world = GridWorld::new(columns, rows).expect("grid");
    world.reserve(start).expect("start");
    world.reserve(goal).expect("goal");
    let density = rng.gen_range(0..(columns * rows / 3)) as usize;
    let _ = world.place_static(density, &mut rng).expect("statics");
    let _ = world.spawn_mobile(3, &mut rng).expect("mobiles");
    (world, start, goal)
}

fn reachable(view: OccupancyView<'_>, start: CellCoord, goal: CellCoord) -> bool {
    let (columns, rows) = view.dimensions();
    let mut seen = HashSet::from([start]);
    let mut stack = vec![start];
    while let Some(cell) = stack.pop() {
        if cell == goal {
            return true;
        }
        for neighbor in cell.neighbors(columns, rows) {
            if view.is_free(neighbor) && seen.insert(neighbor) {
                stack.push(neighbor);
            }
        }
    }
    false
}

#[test]
fn paths_are_connected_free_and_agree_with_flood_fill() {
    for seed in 0..64 {
        let (world, start, goal) = random_world(seed);
        let view = query::occupancy_view(&world);
        let path = find_path(view, start, goal);

        assert_eq!(!path.is_empty(), reachable(view, start, goal), "seed {seed}");
        if path.is_empty() {
            continue;
        }

        let cells = path.cells();
        assert_eq!(cells.first(), Some(&start));
        assert_eq!(cells.last(), Some(&goal));
        assert!(cells.len() > start.manhattan_distance(goal) as usize);
        for pair in cells.windows(2) {
            assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
        }
        for cell in &cells[1..] {
            assert!(view.is_free(*cell), "seed {seed}: path crosses {cell:?}");
        }
    }
}

#[test]
fn reused_heap_planner_matches_fresh_bfs() {
    let mut planner: PathPlanner<HeapFrontier> = PathPlanner::new();
    for seed in 100..132 {
        let (world, start, goal) = random_world(seed);
        let view = query::occupancy_view(&world);

        assert_eq!(
            planner.find_path(view, start, goal),
            find_path(view, start, goal)
        );
    }
}
