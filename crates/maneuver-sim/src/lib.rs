//! maneuver-sim - Simulated vehicle for the maneuver harness
//!
//! Stands in for both sides of the bus so the harness can run end to end
//! without hardware:
//!
//! - [`SimBusDevice`] is the vehicle: a first-order longitudinal plant with
//!   a cruise system, broadcasting its state and obeying ACC commands while
//!   in the active mode.
//! - [`SimCarInterface`] and [`SimFingerprinter`] are the harness-side
//!   decoder/encoder for the same frame layout (see [`protocol`]).

pub mod car;
pub mod config;
pub mod device;
pub mod plant;
pub mod protocol;

pub use car::{SimCarInterface, SimFingerprinter, CAR_FINGERPRINT, CAR_NAME, SAFETY_PARAM};
pub use config::SimConfig;
pub use device::SimBusDevice;
pub use plant::PlantConfig;
