//! maneuver-core - Core types for the longitudinal maneuver harness
//!
//! This crate holds the vocabulary shared by the bus layer, the runner and
//! vehicle implementations: raw bus frames, the safety operating mode,
//! the control/state records exchanged with a car interface, and the static
//! field descriptors used to flatten those records into traces.

pub mod error;
pub mod models;

pub use error::{DecodeError, EncodeError};
pub use models::*;
