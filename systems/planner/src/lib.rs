#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Unweighted shortest-path planner over an occupancy snapshot.
//!
//! The planner runs a uniform-cost search over the 4-connected grid where
//! every edge costs one. Occupied cells are impassable except for the start
//! cell, which the agent is standing on. Because every weight is equal the
//! search degenerates into breadth-first search; the [`Frontier`] seam lets a
//! binary-heap frontier stand in for the FIFO queue without changing results.
//!
//! Nothing is cached between calls: each query rebuilds its search state from
//! the view it is given.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, VecDeque},
};

use wayfinder_core::{CellCoord, OccupancyView, Path};

/// Open list used by the planner to order cell expansion.
pub trait Frontier: Default {
    /// Removes every pending cell.
    fn clear(&mut self);

    /// Queues a discovered cell together with its path cost from the start.
    fn push(&mut self, cell: CellCoord, cost: u32);

    /// Yields the next cell to expand.
    fn pop(&mut self) -> Option<CellCoord>;
}

/// First-in first-out frontier; plain breadth-first search.
#[derive(Clone, Debug, Default)]
pub struct FifoFrontier {
    queue: VecDeque<CellCoord>,
}

impl Frontier for FifoFrontier {
    fn clear(&mut self) {
        self.queue.clear();
    }

    fn push(&mut self, cell: CellCoord, _cost: u32) {
        self.queue.push_back(cell);
    }

    fn pop(&mut self) -> Option<CellCoord> {
        self.queue.pop_front()
    }
}

/// Binary min-heap frontier keyed by cost, then discovery order.
///
/// Ties on cost are broken by discovery sequence, so under unit weights the
/// expansion order matches [`FifoFrontier`] exactly.
#[derive(Clone, Debug, Default)]
pub struct HeapFrontier {
    heap: BinaryHeap<Reverse<(u32, u64, CellCoord)>>,
    sequence: u64,
}

impl Frontier for HeapFrontier {
    fn clear(&mut self) {
        self.heap.clear();
        self.sequence = 0;
    }

    fn push(&mut self, cell: CellCoord, cost: u32) {
        self.heap.push(Reverse((cost, self.sequence, cell)));
        self.sequence = self.sequence.wrapping_add(1);
    }

    fn pop(&mut self) -> Option<CellCoord> {
        self.heap.pop().map(|Reverse((_, _, cell))| cell)
    }
}

/// Shortest-path planner with reusable scratch buffers.
#[derive(Clone, Debug, Default)]
pub struct PathPlanner<F: Frontier = FifoFrontier> {
    frontier: F,
    visited: Vec<bool>,
    costs: Vec<u32>,
    predecessors: Vec<Option<CellCoord>>,
}

impl<F: Frontier> PathPlanner<F> {
    /// Creates a planner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes a shortest path from `start` to `goal` over the provided view.
    ///
    /// Returns the single-cell path `[start]` when `start == goal`, and an
    /// empty path when either endpoint is out of bounds or no path exists.
    /// When several shortest paths exist, the one discovered first wins.
    pub fn find_path(
        &mut self,
        view: OccupancyView<'_>,
        start: CellCoord,
        goal: CellCoord,
    ) -> Path {
        let (Some(start_index), Some(goal_index)) = (view.index(start), view.index(goal)) else {
            return Path::unreachable();
        };

        if start == goal {
            return Path::new(vec![start]);
        }

        if !view.is_free(goal) {
            return Path::unreachable();
        }

        let (columns, rows) = view.dimensions();
        let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        self.prepare(cell_count);
        self.visited[start_index] = true;
        self.costs[start_index] = 0;
        self.frontier.push(start, 0);

        while let Some(cell) = self.frontier.pop() {
            if cell == goal {
                break;
            }

            let Some(index) = view.index(cell) else {
                continue;
            };
            let next_cost = self.costs[index].saturating_add(1);

            for neighbor in cell.neighbors(columns, rows) {
                if !view.is_free(neighbor) {
                    continue;
                }

                let Some(neighbor_index) = view.index(neighbor) else {
                    continue;
                };

                if self.visited[neighbor_index] {
                    continue;
                }

                self.visited[neighbor_index] = true;
                self.costs[neighbor_index] = next_cost;
                self.predecessors[neighbor_index] = Some(cell);
                self.frontier.push(neighbor, next_cost);
            }
        }

        if !self.visited[goal_index] {
            return Path::unreachable();
        }

        self.reconstruct(view, start, goal)
    }

    fn prepare(&mut self, cell_count: usize) {
        self.frontier.clear();
        self.visited.clear();
        self.visited.resize(cell_count, false);
        self.costs.clear();
        self.costs.resize(cell_count, u32::MAX);
        self.predecessors.clear();
        self.predecessors.resize(cell_count, None);
    }

    fn reconstruct(&self, view: OccupancyView<'_>, start: CellCoord, goal: CellCoord) -> Path {
        let mut cells = vec![goal];
        let mut current = goal;

        while current != start {
            let previous = view
                .index(current)
                .and_then(|index| self.predecessors.get(index).copied().flatten());
            let Some(previous) = previous else {
                return Path::unreachable();
            };
            cells.push(previous);
            current = previous;
        }

        cells.reverse();
        Path::new(cells)
    }
}

/// Computes a shortest path with a fresh breadth-first planner.
#[must_use]
pub fn find_path(view: OccupancyView<'_>, start: CellCoord, goal: CellCoord) -> Path {
    PathPlanner::<FifoFrontier>::new().find_path(view, start, goal)
}
