//! Client -> Server message parsing.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Steer all cells toward a world-space point.
    Move { x: f64, y: f64 },
    /// Split toward the given point.
    Split {
        #[serde(rename = "mouseX")]
        mouse_x: f64,
        #[serde(rename = "mouseY")]
        mouse_y: f64,
    },
    /// Eject mass toward the given point.
    Eject {
        #[serde(rename = "mouseX")]
        mouse_x: f64,
        #[serde(rename = "mouseY")]
        mouse_y: f64,
    },
    /// Change display name.
    SetName { name: String },
    /// Chat message, relayed verbatim.
    Chat { message: String },
}

impl ClientMessage {
    /// Parse a client message from a text frame.
    ///
    /// Unknown `type` values, missing fields and non-finite coordinates are
    /// all rejected; callers drop the message and keep the connection.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(text)?;
        let finite = match &message {
            Self::Move { x, y } => x.is_finite() && y.is_finite(),
            Self::Split { mouse_x, mouse_y } | Self::Eject { mouse_x, mouse_y } => {
                mouse_x.is_finite() && mouse_y.is_finite()
            }
            Self::SetName { .. } | Self::Chat { .. } => true,
        };
        if !finite {
            return Err(ProtocolError::NonFinite(message.kind()));
        }
        Ok(message)
    }

    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Split { .. } => "split",
            Self::Eject { .. } => "eject",
            Self::SetName { .. } => "setName",
            Self::Chat { .. } => "chat",
        }
    }
}
