//! Shared protocol crate for the cell arena.
//!
//! This crate contains:
//! - JSON message definitions (client -> server and server -> client)
//! - Shared types (Color)

mod color;
mod error;
pub mod packets;

pub use color::Color;
pub use error::ProtocolError;
