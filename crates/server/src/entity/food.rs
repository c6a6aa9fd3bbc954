//! Food pellet and ejected mass.

use super::cell::radius_to_mass;
use glam::DVec2;
use protocol::Color;

/// A consumable pellet.
///
/// Regular food sits still and carries `π·r²` mass. Ejected food carries the
/// exact mass its cell lost, moves until friction stops it, and is never
/// respawned once eaten.
#[derive(Debug, Clone, PartialEq)]
pub struct Food {
    /// Unique entity ID.
    pub id: u32,
    pub position: DVec2,
    /// `None` once the pellet has come to rest.
    pub velocity: Option<DVec2>,
    radius: f64,
    mass: f64,
    pub color: Color,
    /// Whether this pellet was ejected by a player.
    pub ejected: bool,
}

impl Food {
    /// Create a regular, stationary food pellet.
    pub fn new(id: u32, position: DVec2, radius: f64, color: Color) -> Self {
        Self {
            id,
            position,
            velocity: None,
            radius,
            mass: radius_to_mass(radius),
            color,
            ejected: false,
        }
    }

    /// Create a pellet of ejected mass.
    pub fn ejected(
        id: u32,
        position: DVec2,
        radius: f64,
        mass: f64,
        color: Color,
        velocity: DVec2,
    ) -> Self {
        Self {
            id,
            position,
            velocity: (velocity != DVec2::ZERO).then_some(velocity),
            radius,
            mass,
            color,
            ejected: true,
        }
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Mass gained by the cell that eats this pellet.
    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_food_mass_follows_radius() {
        let food = Food::new(1, DVec2::new(5.0, 5.0), 3.0, Color::default());
        assert!((food.mass() - radius_to_mass(3.0)).abs() < 1e-9);
        assert!(!food.ejected);
        assert_eq!(food.velocity, None);
    }

    #[test]
    fn test_ejected_food_keeps_explicit_mass() {
        let velocity = DVec2::new(10.0, 0.0);
        let food = Food::ejected(2, DVec2::ZERO, 4.0, 16.0, Color::default(), velocity);
        assert_eq!(food.mass(), 16.0);
        assert!(food.ejected);
        assert_eq!(food.velocity, Some(DVec2::new(10.0, 0.0)));
    }
}
