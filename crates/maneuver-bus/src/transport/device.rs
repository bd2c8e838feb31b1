//! Raw bus device trait

use maneuver_core::{Frame, FrameBatch, OperatingMode};

use super::TransportError;

/// A physical (or simulated) bus interface
///
/// Calls are synchronous and non-blocking: `poll` returns whatever frames
/// are pending, possibly none. Devices use interior mutability so that the
/// transport adapter and the safety controller can share one instance.
pub trait BusDevice: Send + Sync {
    /// Drain pending inbound frames from every bus segment
    fn poll(&self) -> Result<FrameBatch, TransportError>;

    /// Transmit a batch of frames
    fn send_many(&self, frames: &[Frame]) -> Result<(), TransportError>;

    /// Apply an operating/safety mode to the device
    fn set_safety_mode(&self, mode: OperatingMode) -> Result<(), TransportError>;

    /// Short description used in logs
    fn describe(&self) -> String;
}
