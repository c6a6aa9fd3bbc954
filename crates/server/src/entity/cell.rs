//! Player cell and the mass/radius relation shared by all circular entities.

use glam::DVec2;
use std::f64::consts::PI;

/// Mass of a circle: `π·r²`.
#[inline]
pub fn radius_to_mass(radius: f64) -> f64 {
    PI * radius * radius
}

/// Radius of a circle of the given mass: `√(m/π)`.
#[inline]
pub fn mass_to_radius(mass: f64) -> f64 {
    (mass / PI).sqrt()
}

/// One mass-bearing circle owned by a player.
///
/// Mass and radius are private so every change goes through [`Cell::set_mass`]
/// and the two can never drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Unique entity ID.
    pub id: u32,
    /// Center in world coordinates.
    pub position: DVec2,
    /// Per-tick displacement, decayed by friction.
    pub velocity: DVec2,
    radius: f64,
    mass: f64,
    /// Millisecond timestamp before which this cell cannot merge (0 = eligible now).
    merge_eligible_at: u64,
}

impl Cell {
    /// Create a stationary, merge-eligible cell.
    pub fn new(id: u32, position: DVec2, mass: f64) -> Self {
        let mut cell = Self {
            id,
            position,
            velocity: DVec2::ZERO,
            radius: 0.0,
            mass: 0.0,
            merge_eligible_at: 0,
        };
        cell.set_mass(mass);
        cell
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Set the mass and recompute the radius.
    #[track_caller]
    #[inline]
    pub fn set_mass(&mut self, mass: f64) {
        assert!(
            mass.is_finite() && mass > 0.0,
            "cell {} mass must stay positive, got {}",
            self.id,
            mass
        );
        self.mass = mass;
        self.radius = mass_to_radius(mass);
    }

    /// Called when this cell absorbs `mass` (food, another cell, a sibling).
    #[inline]
    pub fn on_eat(&mut self, mass: f64) {
        self.set_mass(self.mass + mass);
    }

    #[inline]
    pub fn merge_eligible_at(&self) -> u64 {
        self.merge_eligible_at
    }

    /// Whether the merge lockout has passed at `now` (ms).
    #[inline]
    pub fn is_merge_eligible(&self, now: u64) -> bool {
        self.merge_eligible_at <= now
    }

    /// Lock merging until `deadline`. Never moves an existing deadline earlier.
    pub fn lock_merge_until(&mut self, deadline: u64) {
        self.merge_eligible_at = self.merge_eligible_at.max(deadline);
    }

    /// Clear the lockout after a merge.
    pub fn reset_merge(&mut self) {
        self.merge_eligible_at = 0;
    }

    /// Movement speed per tick. Larger cells are slower.
    #[inline]
    pub fn speed(&self, base_speed: f64) -> f64 {
        base_speed * self.radius.powf(-0.439)
    }

    /// Clamp the center so the whole circle stays inside `[0, width] x [0, height]`.
    #[inline]
    pub fn check_border(&mut self, width: f64, height: f64) {
        self.position = clamp_to_border(self.position, self.radius, width, height);
    }
}

/// Clamp a circle center componentwise to `[radius, dimension - radius]`.
#[inline]
pub(crate) fn clamp_to_border(position: DVec2, radius: f64, width: f64, height: f64) -> DVec2 {
    DVec2::new(
        position.x.max(radius).min(width - radius),
        position.y.max(radius).min(height - radius),
    )
}
