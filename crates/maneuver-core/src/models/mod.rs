//! Shared data models

mod control;
mod field;
mod frame;
mod mode;
mod params;
mod state;

pub use control::*;
pub use field::*;
pub use frame::*;
pub use mode::*;
pub use params::*;
pub use state::*;
