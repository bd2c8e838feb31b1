//! Transport adapter used by the session and control loop

use std::sync::Arc;
use std::time::Duration;

use maneuver_core::FrameBatch;
use tracing::debug;

use super::{BusDevice, TransportError};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Frame-level access to a bus device, independent of vehicle semantics
///
/// The adapter keeps no buffered state between calls. Mode changes are not
/// exposed here; they belong to [`crate::SafetyModeController`].
#[derive(Clone)]
pub struct TransportAdapter {
    device: Arc<dyn BusDevice>,
    poll_interval: Duration,
}

impl TransportAdapter {
    pub fn new(device: Arc<dyn BusDevice>) -> Self {
        Self {
            device,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Delay between empty polls while blocking
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Receive the frames pending on the bus
    ///
    /// With `block_until_nonempty == false` this polls once and returns
    /// immediately, possibly with an empty batch. With `true` it re-polls
    /// until at least one frame arrives. There is no timeout: callers bound
    /// the number of blocking calls.
    pub async fn receive(&self, block_until_nonempty: bool) -> Result<FrameBatch, TransportError> {
        let mut batch = self.device.poll()?;
        while batch.is_empty() && block_until_nonempty {
            tokio::time::sleep(self.poll_interval).await;
            batch = self.device.poll()?;
        }
        Ok(batch)
    }

    /// Transmit a batch; device errors propagate and are not retried
    pub fn send(&self, batch: FrameBatch) -> Result<(), TransportError> {
        debug!(frames = batch.len(), "Sending frame batch");
        self.device.send_many(&batch)
    }

    pub fn device(&self) -> &Arc<dyn BusDevice> {
        &self.device
    }
}

impl std::fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("device", &self.device.describe())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
