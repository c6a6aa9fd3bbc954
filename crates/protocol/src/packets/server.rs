//! Server -> Client message building.

use crate::{Color, ProtocolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once on connect with the newly assigned player id.
    Welcome { id: u32 },
    /// Full world snapshot, broadcast every tick.
    State(StateSnapshot),
    /// Relayed chat line.
    Chat {
        /// Sender display name.
        id: String,
        message: String,
        /// Unix epoch milliseconds.
        timestamp: u64,
    },
}

impl ServerMessage {
    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Full state of all three entity collections, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub players: BTreeMap<u32, PlayerView>,
    pub food: BTreeMap<u32, FoodView>,
    pub viruses: BTreeMap<u32, VirusView>,
}

/// A player as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub name: String,
    pub color: Color,
    /// Total mass of all cells.
    pub mass: f64,
    /// Position of the largest cell.
    pub x: f64,
    pub y: f64,
    /// Radius of the largest cell.
    pub r: f64,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub color: Color,
    pub ejected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirusView {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub color: Color,
}
