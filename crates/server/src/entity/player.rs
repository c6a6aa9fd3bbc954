//! Player: a named, colored owner of one or more cells.

use super::cell::Cell;
use glam::DVec2;
use protocol::Color;

/// A connected player and the cells it controls.
#[derive(Debug, Clone)]
pub struct Player {
    /// Unique player ID (sent to the client in `welcome`).
    pub id: u32,
    /// Display name.
    pub name: String,
    pub color: Color,
    /// Owned cells, in creation order. Never empty while the player is in the world.
    pub cells: Vec<Cell>,
    /// Last point the client asked to move toward.
    pub target: Option<DVec2>,

    // Derived by `stats::refresh`.
    /// Sum of cell masses.
    pub mass: f64,
    /// Center of the largest cell.
    pub position: DVec2,
    /// Radius of the largest cell.
    pub radius: f64,
}

impl Player {
    /// Create a player owning a single cell.
    pub fn new(id: u32, name: String, color: Color, cell: Cell) -> Self {
        Self {
            id,
            name,
            color,
            mass: cell.mass(),
            position: cell.position,
            radius: cell.radius(),
            cells: vec![cell],
            target: None,
        }
    }

    /// Set the display name, truncated to `max_len` characters.
    pub fn set_name(&mut self, name: &str, max_len: usize) {
        self.name = name.chars().take(max_len).collect();
    }

    /// Get a cell by ID.
    #[inline]
    pub fn cell(&self, id: u32) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }

    /// Get a mutable cell by ID.
    #[inline]
    pub fn cell_mut(&mut self, id: u32) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.id == id)
    }

    /// Remove a cell, preserving the order of the rest.
    pub fn remove_cell(&mut self, id: u32) -> Option<Cell> {
        let index = self.cells.iter().position(|c| c.id == id)?;
        Some(self.cells.remove(index))
    }
}
