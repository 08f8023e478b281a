#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic scheduler that wanders mobile obstacles one cell per tick.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};
use wayfinder_core::{Cell, CellCoord, Direction, Event, MobileEntity};
use wayfinder_world::{query, GridWorld};

/// Owns the mobile entity list and advances it against the grid.
///
/// Entities resolve sequentially in list order within a tick: later entities
/// observe the moves already applied by earlier ones. Direction order is drawn
/// from the injected random source, so a seeded source yields reproducible
/// trajectories.
#[derive(Clone, Debug)]
pub struct ObstacleScheduler<R = ChaCha8Rng> {
    entities: Vec<MobileEntity>,
    rng: R,
}

impl ObstacleScheduler<ChaCha8Rng> {
    /// Creates a scheduler driven by a ChaCha8 stream seeded with `seed`.
    #[must_use]
    pub fn seeded(entities: Vec<MobileEntity>, seed: u64) -> Self {
        Self::new(entities, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> ObstacleScheduler<R> {
    /// Creates a scheduler over `entities` using the provided random source.
    #[must_use]
    pub fn new(entities: Vec<MobileEntity>, rng: R) -> Self {
        Self { entities, rng }
    }

    /// Entities in resolution order with their current cells.
    #[must_use]
    pub fn entities(&self) -> &[MobileEntity] {
        &self.entities
    }

    /// Moves every entity at most one cell and returns the updated list.
    ///
    /// For each entity the four directions are tried in shuffled order; the
    /// first neighbour that is in bounds, empty, absent from `reserved` and not
    /// claimed earlier in this tick wins. Otherwise the entity stays put.
    pub fn tick(
        &mut self,
        world: &mut GridWorld,
        reserved: &[CellCoord],
        out: &mut Vec<Event>,
    ) -> &[MobileEntity] {
        let (columns, rows) = (world.columns(), world.rows());
        let mut claimed: Vec<CellCoord> = Vec::with_capacity(self.entities.len());
        let mut moved = 0_usize;

        for entity in &mut self.entities {
            let from = entity.cell;
            let mut directions = Direction::ALL;
            directions.shuffle(&mut self.rng);

            if world.occupant_at(from) != Some(Cell::MobileObstacle(entity.kind, entity.id)) {
                warn!(entity = entity.id.get(), "entity does not own its recorded cell");
                claimed.push(from);
                continue;
            }

            let target = directions
                .iter()
                .filter_map(|direction| direction.step(from, columns, rows))
                .find(|cell| {
                    world.is_free(*cell) && !reserved.contains(cell) && !claimed.contains(cell)
                });

            match target.map(|to| (to, world.move_occupant(from, to))) {
                Some((to, Ok(_))) => {
                    entity.cell = to;
                    moved += 1;
                    out.push(Event::EntityMoved {
                        entity: entity.id,
                        from,
                        to,
                    });
                }
                Some((to, Err(reason))) => {
                    warn!(entity = entity.id.get(), ?to, %reason, "entity move rejected");
                    out.push(Event::EntityHeld {
                        entity: entity.id,
                        cell: from,
                    });
                }
                None => {
                    out.push(Event::EntityHeld {
                        entity: entity.id,
                        cell: from,
                    });
                }
            }

            claimed.push(entity.cell);
        }

        debug!(moved, held = self.entities.len() - moved, "obstacle tick resolved");
        debug_assert!(self.mirrors(world), "entity list diverged from grid");
        &self.entities
    }

    /// Reports whether the grid's mobile cells mirror the entity list exactly.
    #[must_use]
    pub fn mirrors(&self, world: &GridWorld) -> bool {
        let owned = self.entities.iter().all(|entity| {
            world.occupant_at(entity.cell) == Some(Cell::MobileObstacle(entity.kind, entity.id))
        });
        owned && query::mobile_cells(world).len() == self.entities.len()
    }
}
