//! maneuver-bus - Bus transport and safety modes for the maneuver harness
//!
//! This crate wraps a raw bus device (SocketCAN, a mock, or a simulated
//! vehicle) behind two narrow handles that share it:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       BusDevice                           │
//! │        poll / send_many / set_safety_mode                 │
//! │                                                          │
//! │   ┌────────────────────┐     ┌────────────────────────┐  │
//! │   │  TransportAdapter  │     │ SafetyModeController   │  │
//! │   │ receive(block)     │     │ Disabled/Passive/Active│  │
//! │   │ send(batch)        │     │ SafetyScope guard      │  │
//! │   └────────────────────┘     └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport moves frames; the controller alone changes the operating
//! mode, and its scope guard returns the device to `Disabled` on every exit
//! path.

pub mod config;
pub mod safety;
pub mod transport;

pub use config::{BusInterface, DeviceConfig, SocketCanConfig};
pub use safety::{SafetyModeController, SafetyScope};
pub use transport::{create_device, BusDevice, TransportAdapter, TransportError};

pub use maneuver_core::{Frame, FrameBatch, OperatingMode};
