//! Game entities.
//!
//! Players own cells; food and viruses are free-standing. Each kind is its own
//! struct with every optional field declared.

mod cell;
mod food;
mod player;
mod virus;

pub use cell::{mass_to_radius, radius_to_mass, Cell};
pub(crate) use cell::clamp_to_border;
pub use food::Food;
pub use player::Player;
pub use virus::{Virus, VIRUS_COLOR};
