//! World state management.
//!
//! Owns every player, food pellet and virus. Collections are keyed by ID in
//! `BTreeMap`s so every pass over the world visits entities in ascending ID
//! order, which makes simultaneous collisions resolve reproducibly.

use crate::config::SPAWN_MARGIN;
use crate::entity::{radius_to_mass, Cell, Food, Player, Virus};
use glam::DVec2;
use protocol::packets::{CellView, FoodView, PlayerView, StateSnapshot, VirusView};
use protocol::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Absolute tolerance for the mass/radius and aggregate checks.
pub const MASS_TOLERANCE: f64 = 1e-6;

/// The game world containing all entities.
#[derive(Debug)]
pub struct World {
    /// Next entity ID to assign.
    next_id: u32,

    /// Players by ID.
    pub players: BTreeMap<u32, Player>,
    /// Food pellets (regular and ejected) by ID.
    pub food: BTreeMap<u32, Food>,
    /// Viruses by ID.
    pub viruses: BTreeMap<u32, Virus>,

    /// World border.
    pub border: WorldBorder,

    rng: StdRng,
}

/// World border bounds. The playable area is `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub width: f64,
    pub height: f64,
}

impl WorldBorder {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Get a random position at least `margin` away from every edge.
    #[inline]
    pub fn random_position(&self, rng: &mut impl Rng, margin: f64) -> DVec2 {
        DVec2::new(
            rng.random_range(margin..self.width - margin),
            rng.random_range(margin..self.height - margin),
        )
    }
}

impl World {
    /// Create an empty world. A `seed` makes every random placement reproducible.
    pub fn new(width: f64, height: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            next_id: 1,
            players: BTreeMap::new(),
            food: BTreeMap::new(),
            viruses: BTreeMap::new(),
            border: WorldBorder::new(width, height),
            rng,
        }
    }

    /// Get the next entity ID.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1; // Skip 0
        }
        id
    }

    /// World RNG (seeded when the config asks for it).
    #[inline]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Add a player to the world.
    pub fn add_player(&mut self, player: Player) -> u32 {
        debug_assert!(!player.cells.is_empty(), "player {} added without cells", player.id);
        let id = player.id;
        self.players.insert(id, player);
        id
    }

    /// Remove a player and all of its cells.
    pub fn remove_player(&mut self, id: u32) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Add a food pellet to the world.
    pub fn add_food(&mut self, food: Food) -> u32 {
        let id = food.id;
        self.food.insert(id, food);
        id
    }

    /// Remove a food pellet.
    pub fn remove_food(&mut self, id: u32) -> Option<Food> {
        self.food.remove(&id)
    }

    /// Add a virus to the world (initialization only).
    pub fn add_virus(&mut self, virus: Virus) -> u32 {
        let id = virus.id;
        self.viruses.insert(id, virus);
        id
    }

    /// Number of regular (non-ejected) food pellets.
    pub fn regular_food_count(&self) -> usize {
        self.food.values().filter(|f| !f.ejected).count()
    }

    /// Generate a random color.
    #[inline]
    pub fn random_color(&mut self) -> Color {
        Color::new(
            self.rng.random_range(50..=255),
            self.rng.random_range(50..=255),
            self.rng.random_range(50..=255),
        )
    }

    /// Spawn regular food until `target` non-ejected pellets exist.
    /// Returns how many were spawned.
    pub fn spawn_food_to_target(&mut self, target: usize, radius: f64) -> usize {
        let missing = target.saturating_sub(self.regular_food_count());
        for _ in 0..missing {
            let position = self.border.random_position(&mut self.rng, radius);
            let color = self.random_color();
            let id = self.next_id();
            self.add_food(Food::new(id, position, radius, color));
        }
        missing
    }

    /// Spawn viruses up to `count`.
    pub fn spawn_viruses(&mut self, count: usize, radius: f64) {
        while self.viruses.len() < count {
            let position = self.border.random_position(&mut self.rng, radius);
            let id = self.next_id();
            self.add_virus(Virus::new(id, position, radius));
        }
    }

    /// Create a player with a single cell of `start_mass` at a random position.
    pub fn spawn_player(&mut self, start_mass: f64) -> u32 {
        let id = self.next_id();
        let cell_id = self.next_id();
        let position = self.border.random_position(&mut self.rng, SPAWN_MARGIN);
        let color = self.random_color();
        let cell = Cell::new(cell_id, position, start_mass);
        self.add_player(Player::new(id, format!("Player{id}"), color, cell))
    }

    /// Get the count of each entity kind.
    #[inline]
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            players: self.players.len(),
            cells: self.players.values().map(|p| p.cells.len()).sum(),
            food: self.food.len(),
            ejected: self.food.values().filter(|f| f.ejected).count(),
            viruses: self.viruses.len(),
        }
    }

    /// Build the full state broadcast to every client.
    pub fn snapshot(&self) -> StateSnapshot {
        let players = self
            .players
            .values()
            .map(|p| {
                let cells = p
                    .cells
                    .iter()
                    .map(|c| CellView {
                        id: c.id,
                        x: c.position.x,
                        y: c.position.y,
                        r: c.radius(),
                        mass: c.mass(),
                    })
                    .collect();
                let view = PlayerView {
                    name: p.name.clone(),
                    color: p.color,
                    mass: p.mass,
                    x: p.position.x,
                    y: p.position.y,
                    r: p.radius,
                    cells,
                };
                (p.id, view)
            })
            .collect();

        let food = self
            .food
            .values()
            .map(|f| {
                let view = FoodView {
                    x: f.position.x,
                    y: f.position.y,
                    r: f.radius(),
                    color: f.color,
                    ejected: f.ejected,
                };
                (f.id, view)
            })
            .collect();

        let viruses = self
            .viruses
            .values()
            .map(|v| {
                let view = VirusView {
                    x: v.position.x,
                    y: v.position.y,
                    r: v.radius,
                    color: v.color,
                };
                (v.id, view)
            })
            .collect();

        StateSnapshot { players, food, viruses }
    }

    /// Panic if any world invariant is broken.
    ///
    /// A violation means a bug in collision, split or merge logic; nothing here
    /// tries to repair it. Aggregates are checked too, so call this only after
    /// `stats::refresh_all`.
    pub fn assert_invariants(&self) {
        for player in self.players.values() {
            assert!(!player.cells.is_empty(), "player {} exists with no cells", player.id);

            let mut total = 0.0;
            for cell in &player.cells {
                assert!(
                    cell.mass() > 0.0,
                    "cell {} has non-positive mass {}",
                    cell.id,
                    cell.mass()
                );
                let expected = radius_to_mass(cell.radius());
                assert!(
                    (expected - cell.mass()).abs() <= MASS_TOLERANCE,
                    "cell {} mass {} does not match radius {}",
                    cell.id,
                    cell.mass(),
                    cell.radius()
                );
                total += cell.mass();
            }
            assert!(
                (player.mass - total).abs() <= MASS_TOLERANCE,
                "player {} aggregate mass {} != cell total {}",
                player.id,
                player.mass,
                total
            );
        }

        for food in self.food.values().filter(|f| !f.ejected) {
            let expected = radius_to_mass(food.radius());
            assert!(
                (expected - food.mass()).abs() <= MASS_TOLERANCE,
                "food {} mass {} does not match radius {}",
                food.id,
                food.mass(),
                food.radius()
            );
        }
    }
}

/// Entity count statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub players: usize,
    pub cells: usize,
    pub food: usize,
    pub ejected: usize,
    pub viruses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(2000.0, 2000.0, Some(7))
    }

    #[test]
    fn test_ids_are_unique_and_skip_zero() {
        let mut world = world();
        world.next_id = u32::MAX;
        assert_eq!(world.next_id(), u32::MAX);
        assert_eq!(world.next_id(), 1);
    }

    #[test]
    fn test_spawn_food_to_target_ignores_ejected() {
        let mut world = world();
        assert_eq!(world.spawn_food_to_target(20, 3.0), 20);
        assert_eq!(world.spawn_food_to_target(20, 3.0), 0);

        let id = world.next_id();
        let position = DVec2::new(50.0, 50.0);
        world.add_food(Food::ejected(id, position, 4.0, 16.0, Color::default(), DVec2::ZERO));
        assert_eq!(world.food.len(), 21);
        assert_eq!(world.regular_food_count(), 20);
        assert_eq!(world.spawn_food_to_target(20, 3.0), 0);

        let first = *world.food.keys().next().unwrap();
        world.remove_food(first);
        assert_eq!(world.spawn_food_to_target(20, 3.0), 1);
        assert_eq!(world.regular_food_count(), 20);
    }

    #[test]
    fn test_spawned_entities_stay_inside_border() {
        let mut world = world();
        world.spawn_food_to_target(200, 3.0);
        world.spawn_viruses(10, 35.0);
        let player_id = world.spawn_player(100.0);

        for food in world.food.values() {
            assert!(food.position.x >= 3.0 && food.position.x <= 1997.0);
            assert!(food.position.y >= 3.0 && food.position.y <= 1997.0);
        }
        assert_eq!(world.viruses.len(), 10);
        let cell = &world.players[&player_id].cells[0];
        assert!(cell.position.x >= SPAWN_MARGIN && cell.position.x <= 2000.0 - SPAWN_MARGIN);
        assert_eq!(world.players[&player_id].name, format!("Player{player_id}"));
    }

    #[test]
    fn test_same_seed_same_world() {
        let mut a = World::new(2000.0, 2000.0, Some(99));
        let mut b = World::new(2000.0, 2000.0, Some(99));
        a.spawn_food_to_target(50, 3.0);
        b.spawn_food_to_target(50, 3.0);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_remove_player_drops_all_cells() {
        let mut world = world();
        let id = world.spawn_player(100.0);
        assert_eq!(world.counts().cells, 1);
        assert!(world.remove_player(id).is_some());
        assert!(world.remove_player(id).is_none());
        assert_eq!(world.counts(), EntityCounts::default());
    }

    #[test]
    fn test_snapshot_contains_everything() {
        let mut world = world();
        world.spawn_food_to_target(5, 3.0);
        world.spawn_viruses(2, 35.0);
        let id = world.spawn_player(100.0);

        let snapshot = world.snapshot();
        assert_eq!(snapshot.food.len(), 5);
        assert_eq!(snapshot.viruses.len(), 2);
        assert_eq!(snapshot.players[&id].cells.len(), 1);
        assert_eq!(snapshot.players[&id].mass, 100.0);
    }

    #[test]
    fn test_invariants_hold_for_fresh_world() {
        let mut world = world();
        world.spawn_food_to_target(50, 3.0);
        world.spawn_player(100.0);
        world.assert_invariants();
    }

    #[test]
    #[should_panic(expected = "aggregate mass")]
    fn test_stale_aggregate_is_detected() {
        let mut world = world();
        let id = world.spawn_player(100.0);
        world.players.get_mut(&id).unwrap().cells[0].on_eat(10.0);
        world.assert_invariants();
    }
}
