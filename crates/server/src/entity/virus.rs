//! Virus.

use glam::DVec2;
use protocol::Color;

/// Default virus color (green).
pub const VIRUS_COLOR: Color = Color::new(51, 255, 51);

/// A static hazard that bursts large cells touching it.
#[derive(Debug, Clone, PartialEq)]
pub struct Virus {
    pub id: u32,
    pub position: DVec2,
    pub radius: f64,
    pub color: Color,
}

impl Virus {
    /// Create a new virus.
    pub fn new(id: u32, position: DVec2, radius: f64) -> Self {
        Self {
            id,
            position,
            radius,
            color: VIRUS_COLOR,
        }
    }
}
