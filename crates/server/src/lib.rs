//! Authoritative simulation server for the cell arena.

pub mod collision;
pub mod config;
pub mod entity;
pub mod physics;
pub mod server;
pub mod split_merge;
pub mod stats;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{run, run_game_loop, GameState, Intent};
pub use world::World;
