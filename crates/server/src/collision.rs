//! Collision detection and resolution.
//!
//! This module handles the three per-tick collision passes:
//! - Food consumption (cells absorbing pellets they cover)
//! - Virus bursts (large cells touching a virus split into pieces)
//! - Player absorption (cells eating sufficiently smaller cells of other players)
//!
//! All passes walk players in ascending ID order and cells in list order, so
//! when two cells could claim the same target the earlier one always wins.

use crate::config::{FoodConfig, VirusConfig};
use crate::entity::{mass_to_radius, Cell, Virus};
use crate::world::World;
use fixedbitset::FixedBitSet;
use glam::DVec2;
use rand::Rng;
use std::f64::consts::TAU;
use tracing::debug;

/// A cell must be this many times the other's radius to absorb it.
pub const PLAYER_EAT_RATIO: f64 = 1.25;

/// Position, radius and mass of a cell at a point in a pass.
#[derive(Debug, Clone, Copy)]
struct Body {
    position: DVec2,
    radius: f64,
    mass: f64,
}

impl Body {
    fn of(cell: &Cell) -> Self {
        Self {
            position: cell.position,
            radius: cell.radius(),
            mass: cell.mass(),
        }
    }
}

/// Whether `cell` covers a pellet at `position` with radius `radius`.
#[inline]
pub fn can_eat_food(cell: &Cell, position: DVec2, radius: f64) -> bool {
    cell.radius() > radius && cell.position.distance(position) < cell.radius()
}

/// Whether `cell` is big enough and close enough to burst on `virus`.
#[inline]
pub fn touches_virus(cell: &Cell, virus: &Virus, burst_ratio: f64) -> bool {
    cell.radius() > burst_ratio * virus.radius
        && cell.position.distance(virus.position) < virus.radius
}

/// Whether `eater` can absorb `prey`: larger by more than [`PLAYER_EAT_RATIO`]
/// and covering its center.
#[inline]
fn can_absorb(eater: Body, prey: Body) -> bool {
    eater.radius / prey.radius > PLAYER_EAT_RATIO
        && eater.position.distance(prey.position) < eater.radius
}

/// Let cells eat the food they cover. Regular food is replenished back to the
/// configured target; ejected food is not.
///
/// Returns the number of pellets eaten.
pub fn resolve_food(world: &mut World, food: &FoodConfig) -> usize {
    let pellets: Vec<(u32, DVec2, f64, f64)> = world
        .food
        .values()
        .map(|f| (f.id, f.position, f.radius(), f.mass()))
        .collect();
    if pellets.is_empty() {
        return 0;
    }

    let mut eaten = FixedBitSet::with_capacity(pellets.len());
    for player in world.players.values_mut() {
        for cell in &mut player.cells {
            for (index, &(_, position, radius, mass)) in pellets.iter().enumerate() {
                if eaten.contains(index) {
                    continue;
                }
                if can_eat_food(cell, position, radius) {
                    cell.on_eat(mass);
                    eaten.insert(index);
                }
            }
        }
    }

    let count = eaten.count_ones(..);
    for index in eaten.ones() {
        world.remove_food(pellets[index].0);
    }
    if count > 0 {
        world.spawn_food_to_target(food.target_count, food.radius);
    }
    count
}

/// Burst every cell touching a virus. Each cell bursts at most once per pass,
/// on the lowest-ID virus it touches.
///
/// Returns the number of cells that burst.
pub fn resolve_viruses(
    world: &mut World,
    virus: &VirusConfig,
    merge_time_ms: u64,
    now: u64,
) -> usize {
    let mut bursts = Vec::new();
    for player in world.players.values() {
        for cell in &player.cells {
            let touched = world
                .viruses
                .values()
                .find(|v| touches_virus(cell, v, virus.burst_ratio));
            if let Some(v) = touched {
                bursts.push((player.id, cell.id, v.position));
            }
        }
    }

    bursts
        .into_iter()
        .filter(|&(player_id, cell_id, center)| {
            burst_cell(world, player_id, cell_id, center, virus, merge_time_ms, now)
        })
        .count()
}

/// Replace a cell with up to `max_splits` equal pieces spread evenly around
/// the virus center, each flying outward and locked out of merging.
fn burst_cell(
    world: &mut World,
    player_id: u32,
    cell_id: u32,
    center: DVec2,
    virus: &VirusConfig,
    merge_time_ms: u64,
    now: u64,
) -> bool {
    let border = world.border;
    let Some(player) = world.players.get(&player_id) else {
        return false;
    };
    let Some(index) = player.cells.iter().position(|c| c.id == cell_id) else {
        return false;
    };
    let cell = &player.cells[index];
    let (mass, radius) = (cell.mass(), cell.radius());

    let by_radius = (radius / virus.split_radius_step).floor() as usize;
    let pieces = virus.max_splits.min(by_radius);
    if pieces <= 1 {
        return false;
    }

    let piece_mass = mass / pieces as f64;
    let distance = mass_to_radius(piece_mass) + virus.burst_offset;
    let mut replacements = Vec::with_capacity(pieces);
    for i in 0..pieces {
        let jitter = if virus.burst_jitter > 0.0 {
            world.rng().random_range(-virus.burst_jitter..=virus.burst_jitter)
        } else {
            0.0
        };
        let direction = DVec2::from_angle(i as f64 / pieces as f64 * TAU + jitter);

        let mut piece = Cell::new(world.next_id(), center + direction * distance, piece_mass);
        piece.velocity = direction * virus.burst_speed;
        piece.lock_merge_until(now + merge_time_ms);
        piece.check_border(border.width, border.height);
        replacements.push(piece);
    }

    if let Some(player) = world.players.get_mut(&player_id) {
        player.cells.splice(index..=index, replacements);
    }
    debug!("Cell {} of player {} burst into {} pieces", cell_id, player_id, pieces);
    true
}

/// Let cells absorb smaller cells of other players. A player whose last cell
/// is absorbed is removed from the world.
///
/// Returns the IDs of removed players.
pub fn resolve_players(world: &mut World) -> Vec<u32> {
    let order: Vec<(u32, u32)> = world
        .players
        .values()
        .flat_map(|p| p.cells.iter().map(move |c| (p.id, c.id)))
        .collect();

    let mut removed = Vec::new();
    for i in 0..order.len() {
        for j in (i + 1)..order.len() {
            let (owner_a, cell_a) = order[i];
            let (owner_b, cell_b) = order[j];
            if owner_a == owner_b {
                continue;
            }
            let Some(a) = body(world, owner_a, cell_a) else {
                break;
            };
            let Some(b) = body(world, owner_b, cell_b) else {
                continue;
            };

            let (eater, prey) = if a.radius >= b.radius {
                ((owner_a, cell_a, a), (owner_b, cell_b, b))
            } else {
                ((owner_b, cell_b, b), (owner_a, cell_a, a))
            };
            if !can_absorb(eater.2, prey.2) {
                continue;
            }

            if let Some(victim) = absorb(world, eater, prey) {
                removed.push(victim);
            }
        }
    }
    removed
}

fn body(world: &World, owner: u32, cell: u32) -> Option<Body> {
    world.players.get(&owner)?.cell(cell).map(Body::of)
}

/// Move the prey's mass into the eater. Returns the prey's owner if that was
/// its last cell.
fn absorb(world: &mut World, eater: (u32, u32, Body), prey: (u32, u32, Body)) -> Option<u32> {
    let (eater_owner, eater_cell, _) = eater;
    let (prey_owner, prey_cell, prey_body) = prey;

    let emptied = {
        let victim = world.players.get_mut(&prey_owner)?;
        victim.remove_cell(prey_cell)?;
        victim.cells.is_empty()
    };
    if let Some(cell) = world.players.get_mut(&eater_owner).and_then(|p| p.cell_mut(eater_cell)) {
        cell.on_eat(prey_body.mass);
    }

    if emptied {
        world.remove_player(prey_owner);
        debug!("Player {} was absorbed by player {}", prey_owner, eater_owner);
        Some(prey_owner)
    } else {
        None
    }
}
