//! Split, eject and merge: the cell lifecycle under player control.
//!
//! Splitting and bursting lock cells out of merging for `merge_time_ms`; the
//! merge pass recombines a player's cells once both sides of a pair are
//! eligible again.

use crate::config::{EjectConfig, PlayerConfig};
use crate::entity::{clamp_to_border, Cell, Food};
use crate::world::World;
use glam::DVec2;
use tracing::debug;

/// Cells merge when closer than this fraction of their summed radii.
pub const MERGE_OVERLAP: f64 = 0.7;

/// Unit vector from `from` toward `to`, or +x when the two coincide.
#[inline]
pub fn direction(from: DVec2, to: DVec2) -> DVec2 {
    (to - from).try_normalize().unwrap_or(DVec2::X)
}

/// Split every eligible cell of a player toward `target`.
///
/// A cell is eligible when its radius exceeds `min_split_radius` and it is not
/// locked out of merging. Nothing splits if the player already owns
/// `max_cells`; otherwise every eligible cell splits.
/// Returns the number of cells created.
pub fn split(
    world: &mut World,
    player_id: u32,
    target: DVec2,
    config: &PlayerConfig,
    now: u64,
) -> usize {
    let Some(player) = world.players.get(&player_id) else {
        return 0;
    };
    if player.cells.len() >= config.max_cells {
        return 0;
    }
    let candidates: Vec<u32> = player
        .cells
        .iter()
        .filter(|c| c.radius() > config.min_split_radius && c.is_merge_eligible(now))
        .map(|c| c.id)
        .collect();

    let border = world.border;
    let lock_until = now + config.merge_time_ms;
    let mut created = 0;
    for cell_id in candidates {
        let sibling_id = world.next_id();
        let Some(player) = world.players.get_mut(&player_id) else {
            break;
        };
        let Some(cell) = player.cell_mut(cell_id) else {
            continue;
        };

        let half = cell.mass() / 2.0;
        cell.set_mass(half);
        cell.lock_merge_until(lock_until);

        let direction = direction(cell.position, target);
        let offset = direction * (cell.radius() + config.split_offset);
        let mut sibling = Cell::new(sibling_id, cell.position + offset, half);
        sibling.velocity = direction * config.split_speed;
        sibling.lock_merge_until(lock_until);
        sibling.check_border(border.width, border.height);

        player.cells.push(sibling);
        created += 1;
    }

    if created > 0 {
        debug!("Player {} split {} cells", player_id, created);
    }
    created
}

/// Eject a pellet of mass from the player's first cell heavier than
/// `min_eject_mass`, toward `target`.
///
/// Returns the ID of the new food, or `None` when no cell qualifies.
pub fn eject(
    world: &mut World,
    player_id: u32,
    target: DVec2,
    config: &EjectConfig,
    min_eject_mass: f64,
) -> Option<u32> {
    let player = world.players.get(&player_id)?;
    let index = player.cells.iter().position(|c| c.mass() > min_eject_mass)?;
    let color = player.color;

    let food_id = world.next_id();
    let border = world.border;
    let cell = &mut world.players.get_mut(&player_id)?.cells[index];
    cell.set_mass(cell.mass() - config.mass);

    let direction = direction(cell.position, target);
    let position = clamp_to_border(
        cell.position + direction * (cell.radius() + config.offset),
        config.radius,
        border.width,
        border.height,
    );
    let velocity = direction * config.speed;
    let food = Food::ejected(food_id, position, config.radius, config.mass, color, velocity);
    Some(world.add_food(food))
}

/// Merge overlapping, eligible cells of the same player. The smaller cell of a
/// pair is absorbed by the larger, whose lockout is cleared.
///
/// Returns the number of merges performed.
pub fn merge_pass(world: &mut World, now: u64) -> usize {
    let mut merged = 0;
    for player in world.players.values_mut() {
        while let Some((keep, gone)) = find_merge(&player.cells, now) {
            let absorbed = player.cells.remove(gone);
            let keep = if gone < keep { keep - 1 } else { keep };
            let cell = &mut player.cells[keep];
            cell.on_eat(absorbed.mass());
            cell.reset_merge();
            merged += 1;
        }
    }
    merged
}

/// First mergeable pair in list order, as `(larger, smaller)` indices.
fn find_merge(cells: &[Cell], now: u64) -> Option<(usize, usize)> {
    for (i, a) in cells.iter().enumerate() {
        if !a.is_merge_eligible(now) {
            continue;
        }
        for (j, b) in cells.iter().enumerate().skip(i + 1) {
            if !b.is_merge_eligible(now) {
                continue;
            }
            if a.position.distance(b.position) < MERGE_OVERLAP * (a.radius() + b.radius()) {
                return Some(if b.radius() > a.radius() { (j, i) } else { (i, j) });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{radius_to_mass, Player};
    use protocol::Color;

    const NOW: u64 = 60_000;

    fn world_with(cells: Vec<Cell>) -> (World, u32) {
        let mut world = World::new(2000.0, 2000.0, Some(5));
        let id = world.next_id();
        let mut cells = cells.into_iter().map(|mut c| {
            c.id = world.next_id();
            c
        });
        let mut player = Player::new(id, "p".into(), Color::new(1, 2, 3), cells.next().unwrap());
        player.cells.extend(cells.collect::<Vec<_>>());
        world.add_player(player);
        (world, id)
    }

    fn total_mass(world: &World, id: u32) -> f64 {
        world.players[&id].cells.iter().map(|c| c.mass()).sum()
    }

    #[test]
    fn test_split_halves_and_launches_sibling() {
        let (mut world, id) = world_with(vec![Cell::new(2, DVec2::new(500.0, 500.0), 400.0)]);

        let target = DVec2::new(600.0, 500.0);
        let created = split(&mut world, id, target, &PlayerConfig::default(), NOW);
        assert_eq!(created, 1);

        let cells = &world.players[&id].cells;
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].mass(), 200.0);
        assert_eq!(cells[1].mass(), 200.0);
        assert_eq!(cells[0].position, DVec2::new(500.0, 500.0));
        assert!((cells[1].position.x - (500.0 + cells[0].radius() + 5.0)).abs() < 1e-9);
        assert_eq!(cells[1].position.y, 500.0);
        assert_eq!(cells[1].velocity, DVec2::new(15.0, 0.0));
        for cell in cells {
            assert_eq!(cell.merge_eligible_at(), NOW + 30_000);
        }
        assert_eq!(total_mass(&world, id), 400.0);
    }

    #[test]
    fn test_split_without_direction_goes_right() {
        let (mut world, id) = world_with(vec![Cell::new(2, DVec2::new(500.0, 500.0), 400.0)]);

        split(&mut world, id, DVec2::new(500.0, 500.0), &PlayerConfig::default(), NOW);
        let sibling = &world.players[&id].cells[1];
        assert!(sibling.position.x > 500.0);
        assert_eq!(sibling.position.y, 500.0);
    }

    #[test]
    fn test_split_skips_small_and_locked_cells() {
        let mut locked = Cell::new(3, DVec2::new(900.0, 900.0), 1000.0);
        locked.lock_merge_until(NOW + 1);
        let small = Cell::new(2, DVec2::new(500.0, 500.0), radius_to_mass(14.9));
        let (mut world, id) = world_with(vec![small, locked]);

        assert_eq!(split(&mut world, id, DVec2::new(0.0, 0.0), &PlayerConfig::default(), NOW), 0);
        assert_eq!(world.players[&id].cells.len(), 2);
    }

    #[test]
    fn test_split_twice_in_a_row_only_splits_once() {
        let (mut world, id) = world_with(vec![Cell::new(2, DVec2::new(500.0, 500.0), 4000.0)]);
        let config = PlayerConfig::default();

        assert_eq!(split(&mut world, id, DVec2::new(600.0, 500.0), &config, NOW), 1);
        assert_eq!(split(&mut world, id, DVec2::new(600.0, 500.0), &config, NOW), 0);

        let later = NOW + config.merge_time_ms;
        assert_eq!(split(&mut world, id, DVec2::new(600.0, 500.0), &config, later), 2);
        assert_eq!(world.players[&id].cells.len(), 4);
        assert!((total_mass(&world, id) - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_checks_cell_limit_once() {
        let config = PlayerConfig::default();
        let target = DVec2::new(1000.0, 1000.0);
        let cells = (0..10)
            .map(|i| Cell::new(0, DVec2::new(100.0 + i as f64 * 150.0, 500.0), 4000.0))
            .collect();
        let (mut world, id) = world_with(cells);

        assert_eq!(split(&mut world, id, target, &config, NOW), 10);
        assert_eq!(world.players[&id].cells.len(), 20);
        assert!((total_mass(&world, id) - 40_000.0).abs() < 1e-9);

        // Halves are still large enough to split, but the player is over the limit.
        let later = NOW + config.merge_time_ms;
        assert_eq!(split(&mut world, id, target, &config, later), 0);
        assert_eq!(world.players[&id].cells.len(), 20);
    }

    #[test]
    fn test_split_below_limit_splits_every_eligible_cell() {
        let config = PlayerConfig::default();
        let cells = (0..15)
            .map(|i| Cell::new(0, DVec2::new(100.0 + i as f64 * 100.0, 500.0), 1000.0))
            .collect();
        let (mut world, id) = world_with(cells);

        assert_eq!(split(&mut world, id, DVec2::new(1000.0, 1000.0), &config, NOW), 15);
        assert_eq!(world.players[&id].cells.len(), 30);
    }

    #[test]
    fn test_eject_from_150() {
        let (mut world, id) = world_with(vec![Cell::new(2, DVec2::new(500.0, 500.0), 150.0)]);

        let target = DVec2::new(700.0, 500.0);
        let food_id = eject(&mut world, id, target, &EjectConfig::default(), 100.0).unwrap();

        let cell = &world.players[&id].cells[0];
        assert_eq!(cell.mass(), 134.0);
        let food = &world.food[&food_id];
        assert!(food.ejected);
        assert_eq!(food.mass(), 16.0);
        assert_eq!(food.radius(), 4.0);
        assert_eq!(food.color, Color::new(1, 2, 3));
        assert!((food.position.x - (500.0 + cell.radius() + 10.0)).abs() < 1e-9);
        assert_eq!(food.position.y, 500.0);
        assert_eq!(food.velocity, Some(DVec2::new(10.0, 0.0)));
    }

    #[test]
    fn test_eject_uses_first_heavy_enough_cell() {
        let (mut world, id) = world_with(vec![
            Cell::new(2, DVec2::new(500.0, 500.0), 100.0),
            Cell::new(3, DVec2::new(800.0, 500.0), 200.0),
        ]);

        assert!(eject(&mut world, id, DVec2::ZERO, &EjectConfig::default(), 100.0).is_some());
        assert_eq!(world.players[&id].cells[0].mass(), 100.0);
        assert_eq!(world.players[&id].cells[1].mass(), 184.0);
    }

    #[test]
    fn test_eject_requires_mass_above_minimum() {
        let (mut world, id) = world_with(vec![Cell::new(2, DVec2::new(500.0, 500.0), 100.0)]);

        assert_eq!(eject(&mut world, id, DVec2::ZERO, &EjectConfig::default(), 100.0), None);
        assert!(world.food.is_empty());
        assert_eq!(eject(&mut world, 99, DVec2::ZERO, &EjectConfig::default(), 100.0), None);
    }

    #[test]
    fn test_merge_conserves_mass_and_resets_lock() {
        let (mut world, id) = world_with(vec![
            Cell::new(2, DVec2::new(500.0, 500.0), 300.0),
            Cell::new(3, DVec2::new(505.0, 500.0), 500.0),
        ]);

        assert_eq!(merge_pass(&mut world, NOW), 1);
        let cells = &world.players[&id].cells;
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].id, 3);
        assert_eq!(cells[0].mass(), 800.0);
        assert_eq!(cells[0].merge_eligible_at(), 0);
    }

    #[test]
    fn test_merge_waits_for_lockout() {
        let mut a = Cell::new(2, DVec2::new(500.0, 500.0), 300.0);
        let mut b = Cell::new(3, DVec2::new(505.0, 500.0), 300.0);
        a.lock_merge_until(NOW + 30_000);
        b.lock_merge_until(NOW + 30_000);
        let (mut world, id) = world_with(vec![a, b]);

        assert_eq!(merge_pass(&mut world, NOW + 29_999), 0);
        assert_eq!(world.players[&id].cells.len(), 2);
        assert_eq!(merge_pass(&mut world, NOW + 30_000), 1);
        assert_eq!(world.players[&id].cells[0].id, 2);
    }

    #[test]
    fn test_merge_needs_overlap() {
        // radii ~9.77 each, 0.7 * 19.5 ~ 13.7
        let (mut world, id) = world_with(vec![
            Cell::new(2, DVec2::new(500.0, 500.0), 300.0),
            Cell::new(3, DVec2::new(514.0, 500.0), 300.0),
        ]);

        assert_eq!(merge_pass(&mut world, NOW), 0);
        assert_eq!(world.players[&id].cells.len(), 2);
    }

    #[test]
    fn test_merge_collapses_a_cluster() {
        let (mut world, id) = world_with(vec![
            Cell::new(2, DVec2::new(500.0, 500.0), 200.0),
            Cell::new(3, DVec2::new(502.0, 500.0), 200.0),
            Cell::new(4, DVec2::new(500.0, 502.0), 200.0),
        ]);

        assert_eq!(merge_pass(&mut world, NOW), 2);
        assert_eq!(world.players[&id].cells.len(), 1);
        assert!((total_mass(&world, id) - 600.0).abs() < 1e-9);
    }
}
