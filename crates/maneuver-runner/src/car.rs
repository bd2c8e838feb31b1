//! Car interface boundary
//!
//! Vehicle protocols live outside the harness. A [`Fingerprinter`] identifies
//! the vehicle on the bus and hands back a [`CarInterface`] that decodes
//! inbound frames into a [`CarState`] and encodes a [`CarControl`] into
//! outbound frames.

use async_trait::async_trait;
use maneuver_bus::{TransportAdapter, TransportError};
use maneuver_core::{Actuators, CarControl, CarParams, CarState, DecodeError, EncodeError, FrameBatch};
use thiserror::Error;

/// Vehicle identification failures; all occur before any active mode
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Vehicle not recognized: {0}")]
    Unrecognized(String),

    #[error("Longitudinal control not enabled for {car}")]
    LongitudinalControlDisabled { car: String },

    #[error("Transport error while fingerprinting: {0}")]
    Transport(#[from] TransportError),
}

/// Decoder/encoder for one vehicle platform
#[async_trait]
pub trait CarInterface: Send {
    /// Static parameters of the identified vehicle
    fn params(&self) -> &CarParams;

    /// One-time setup after fingerprinting, before the active mode is entered
    ///
    /// Runs in the passive mode; may use blocking receives.
    async fn init(&mut self, transport: &TransportAdapter) -> Result<(), TransportError>;

    /// Decode the frames received this tick, one batch per poll
    fn update(&mut self, batches: &[FrameBatch]) -> Result<CarState, DecodeError>;

    /// Encode a control intent; returns the actuator values actually applied
    /// and the frames to send
    fn apply(&mut self, control: &CarControl) -> Result<(Actuators, FrameBatch), EncodeError>;
}

/// Identifies the vehicle on the bus
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    /// Runs in the passive mode. Implementations must bound the number of
    /// blocking receives they issue.
    async fn fingerprint(
        &self,
        transport: &TransportAdapter,
    ) -> Result<Box<dyn CarInterface>, FingerprintError>;
}
