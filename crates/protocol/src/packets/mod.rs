//! Message definitions for the arena protocol.
//!
//! Every message is a JSON object with a `type` discriminant. This module
//! contains both client->server and server->client message types.

mod client;
mod server;

pub use client::*;
pub use server::*;
