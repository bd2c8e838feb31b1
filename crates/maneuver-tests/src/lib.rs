//! Integration tests for the maneuver harness
//!
//! The tests under `tests/` drive complete sessions against the mock bus
//! device or the simulated vehicle. Time-dependent tests run on a paused
//! tokio clock, so a session of several simulated seconds finishes
//! instantly:
//!
//! ```bash
//! cargo test -p maneuver-tests
//! ```
//!
//! This library only holds the shared test doubles.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use maneuver_bus::{TransportAdapter, TransportError};
use maneuver_core::{
    Actuators, CarControl, CarParams, CarState, DecodeError, EncodeError, Frame, FrameBatch,
};
use maneuver_runner::{CarInterface, FingerprintError, Fingerprinter};

/// Address the counting car sends its single command frame to
pub const COMMAND_ADDRESS: u32 = 0x200;

/// Calls made into cars created by one [`CountingFingerprinter`]
#[derive(Debug, Default)]
pub struct CallCounts {
    pub updates: AtomicU32,
    pub applies: AtomicU32,
}

impl CallCounts {
    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn applies(&self) -> u32 {
        self.applies.load(Ordering::SeqCst)
    }
}

/// Car interface that decodes nothing and sends one frame per tick
///
/// The frame payload is `[enabled]`, so neutral ticks can be told apart
/// from scripted ones in the mock device's send log.
pub struct CountingCar {
    params: CarParams,
    counts: Arc<CallCounts>,
    fail_on_update: Option<u32>,
}

#[async_trait]
impl CarInterface for CountingCar {
    fn params(&self) -> &CarParams {
        &self.params
    }

    async fn init(&mut self, _transport: &TransportAdapter) -> Result<(), TransportError> {
        Ok(())
    }

    fn update(&mut self, _batches: &[FrameBatch]) -> Result<CarState, DecodeError> {
        let n = self.counts.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_update == Some(n) {
            return Err(DecodeError::Other(format!("injected failure on update {n}")));
        }
        Ok(CarState {
            can_valid: true,
            ..Default::default()
        })
    }

    fn apply(&mut self, control: &CarControl) -> Result<(Actuators, FrameBatch), EncodeError> {
        self.counts.applies.fetch_add(1, Ordering::SeqCst);
        let frame = Frame::new(COMMAND_ADDRESS, vec![u8::from(control.enabled)], 0);
        Ok((control.actuators.clone(), vec![frame]))
    }
}

/// Fingerprinter that always recognizes a [`CountingCar`]
pub struct CountingFingerprinter {
    pub params: CarParams,
    pub counts: Arc<CallCounts>,
    /// Zero-based index of the `update` call that fails, counted across
    /// stabilization and scripted ticks
    pub fail_on_update: Option<u32>,
}

impl CountingFingerprinter {
    pub fn new() -> Self {
        Self {
            params: CarParams {
                car_name: "Counting test car".to_string(),
                car_fingerprint: "COUNTING_CAR".to_string(),
                openpilot_longitudinal_control: true,
                safety_param: 0x11,
            },
            counts: Arc::new(CallCounts::default()),
            fail_on_update: None,
        }
    }

    pub fn failing_on_update(mut self, n: u32) -> Self {
        self.fail_on_update = Some(n);
        self
    }
}

impl Default for CountingFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fingerprinter for CountingFingerprinter {
    async fn fingerprint(
        &self,
        _transport: &TransportAdapter,
    ) -> Result<Box<dyn CarInterface>, FingerprintError> {
        Ok(Box::new(CountingCar {
            params: self.params.clone(),
            counts: self.counts.clone(),
            fail_on_update: self.fail_on_update,
        }))
    }
}

/// Payload bytes of every frame sent to [`COMMAND_ADDRESS`], in send order
pub fn command_payloads(batches: &[FrameBatch]) -> Vec<Vec<u8>> {
    batches
        .iter()
        .flatten()
        .filter(|f| f.address == COMMAND_ADDRESS)
        .map(|f| f.payload.to_vec())
        .collect()
}
