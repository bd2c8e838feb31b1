//! Mock bus device for testing

use std::collections::VecDeque;
use std::mem::Discriminant;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use maneuver_core::{Frame, FrameBatch, OperatingMode};
use parking_lot::{Mutex, RwLock};

use super::{BusDevice, TransportError};
use crate::config::MockConfig;

/// In-memory bus device
///
/// Inbound batches are scripted with [`push_inbound`](Self::push_inbound);
/// once they run out every poll returns the idle batch (empty by default).
/// Every outbound batch and every successful mode command is recorded.
pub struct MockBusDevice {
    inbound: Mutex<VecDeque<FrameBatch>>,
    idle: RwLock<FrameBatch>,
    sent: Mutex<Vec<FrameBatch>>,
    modes: Mutex<Vec<OperatingMode>>,
    polls: AtomicUsize,
    fail_sends: AtomicBool,
    fail_polls: AtomicBool,
    fail_mode: Mutex<Option<Discriminant<OperatingMode>>>,
}

impl MockBusDevice {
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            idle: RwLock::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            modes: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
            fail_polls: AtomicBool::new(false),
            fail_mode: Mutex::new(None),
        }
    }

    pub fn from_config(config: &MockConfig) -> Result<Self, TransportError> {
        let idle = config
            .idle_frames
            .iter()
            .map(|f| f.to_frame())
            .collect::<Result<FrameBatch, _>>()?;
        let device = Self::new();
        device.set_idle(idle);
        Ok(device)
    }

    /// Queue a batch to be returned by a future poll
    pub fn push_inbound(&self, batch: FrameBatch) {
        self.inbound.lock().push_back(batch);
    }

    /// Batch returned when no scripted input is left
    pub fn set_idle(&self, batch: FrameBatch) {
        *self.idle.write() = batch;
    }

    /// Every batch passed to `send_many`, in order
    pub fn sent_batches(&self) -> Vec<FrameBatch> {
        self.sent.lock().clone()
    }

    /// Every mode successfully applied, in order
    pub fn mode_history(&self) -> Vec<OperatingMode> {
        self.modes.lock().clone()
    }

    /// Mode most recently applied (`Disabled` if none was ever set)
    pub fn current_mode(&self) -> OperatingMode {
        self.modes.lock().last().copied().unwrap_or_default()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Make every subsequent send fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent poll fail
    pub fn fail_polls(&self, fail: bool) {
        self.fail_polls.store(fail, Ordering::SeqCst);
    }

    /// Make mode commands of the same kind as `mode` fail
    pub fn fail_mode_set(&self, mode: Option<OperatingMode>) {
        *self.fail_mode.lock() = mode.as_ref().map(std::mem::discriminant);
    }
}

impl Default for MockBusDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl BusDevice for MockBusDevice {
    fn poll(&self) -> Result<FrameBatch, TransportError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(TransportError::ReceiveFailed(
                "Mock device: injected receive failure".to_string(),
            ));
        }

        let scripted = self.inbound.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.idle.read().clone()))
    }

    fn send_many(&self, frames: &[Frame]) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(
                "Mock device: injected send failure".to_string(),
            ));
        }

        tracing::debug!(frames = frames.len(), "Mock device: sent batch");
        self.sent.lock().push(frames.to_vec());
        Ok(())
    }

    fn set_safety_mode(&self, mode: OperatingMode) -> Result<(), TransportError> {
        if *self.fail_mode.lock() == Some(std::mem::discriminant(&mode)) {
            return Err(TransportError::ModeChangeFailed {
                mode,
                reason: "Mock device: injected mode failure".to_string(),
            });
        }

        self.modes.lock().push(mode);
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
