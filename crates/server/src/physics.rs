//! Physics integration: velocity, friction, steering, bounds and mass decay.

use crate::entity::{clamp_to_border, Cell, Food};
use crate::world::World;
use glam::DVec2;

/// Velocity components below this magnitude snap to zero.
pub const VELOCITY_EPSILON: f64 = 0.1;

/// Steering stops when a cell is this close to its target.
const ARRIVE_DISTANCE: f64 = 1.0;

/// Distance over which steering ramps up to full speed.
const FULL_SPEED_DISTANCE: f64 = 32.0;

/// Apply friction and snap near-zero components to zero.
#[inline]
pub fn decay_velocity(velocity: DVec2, friction: f64) -> DVec2 {
    let v = velocity * friction;
    DVec2::new(snap(v.x), snap(v.y))
}

#[inline]
fn snap(component: f64) -> f64 {
    if component.abs() < VELOCITY_EPSILON { 0.0 } else { component }
}

/// Advance every moving cell and food pellet by one tick.
///
/// Cells are clamped to the border every tick, moving or not, since their
/// radius may have grown since the last check.
pub fn integrate(world: &mut World, cell_friction: f64, food_friction: f64) {
    let border = world.border;

    for player in world.players.values_mut() {
        for cell in &mut player.cells {
            if cell.velocity != DVec2::ZERO {
                cell.position += cell.velocity;
                cell.velocity = decay_velocity(cell.velocity, cell_friction);
            }
            cell.check_border(border.width, border.height);
        }
    }

    for food in world.food.values_mut() {
        integrate_food(food, food_friction, border.width, border.height);
    }
}

fn integrate_food(food: &mut Food, friction: f64, width: f64, height: f64) {
    let Some(velocity) = food.velocity else {
        return;
    };
    food.position += velocity;
    let next = decay_velocity(velocity, friction);
    food.velocity = (next != DVec2::ZERO).then_some(next);
    food.position = clamp_to_border(food.position, food.radius(), width, height);
}

/// Move every player's cells toward the player's target point.
pub fn steer(world: &mut World, base_speed: f64) {
    let border = world.border;

    for player in world.players.values_mut() {
        let Some(target) = player.target else {
            continue;
        };
        for cell in &mut player.cells {
            steer_cell(cell, target, base_speed);
            cell.check_border(border.width, border.height);
        }
    }
}

fn steer_cell(cell: &mut Cell, target: DVec2, base_speed: f64) {
    let delta = target - cell.position;
    let dist = delta.length();
    if dist < ARRIVE_DISTANCE {
        return;
    }
    let speed = cell.speed(base_speed) * (dist.min(FULL_SPEED_DISTANCE) / FULL_SPEED_DISTANCE);
    cell.position += delta / dist * speed.min(dist);
}

/// Shrink every cell heavier than `min_mass` by `rate`, never below `min_mass`.
pub fn decay_mass(world: &mut World, rate: f64, min_mass: f64) {
    if rate <= 0.0 {
        return;
    }
    let factor = 1.0 - rate;
    for player in world.players.values_mut() {
        for cell in &mut player.cells {
            if cell.mass() > min_mass {
                cell.set_mass((cell.mass() * factor).max(min_mass));
            }
        }
    }
}
