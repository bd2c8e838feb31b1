//! Safety mode state machine and its scope guard

use std::sync::Arc;

use maneuver_core::OperatingMode;
use parking_lot::RwLock;
use tracing::{error, info};

use crate::transport::{BusDevice, TransportError};

/// Tracks and applies the device's operating mode
///
/// Transitions are synchronous and idempotent: entering the mode already in
/// force re-issues the mode command to the device. A failed transition
/// leaves the tracked mode unchanged and is not retried.
pub struct SafetyModeController {
    device: Arc<dyn BusDevice>,
    mode: RwLock<OperatingMode>,
}

impl SafetyModeController {
    /// The controller starts out tracking `Disabled`; no command is sent
    pub fn new(device: Arc<dyn BusDevice>) -> Self {
        Self {
            device,
            mode: RwLock::new(OperatingMode::Disabled),
        }
    }

    pub fn current_mode(&self) -> OperatingMode {
        *self.mode.read()
    }

    /// Open a scope that will return the device to `Disabled` when it ends
    pub fn scope(&self) -> SafetyScope<'_> {
        SafetyScope {
            controller: self,
            released: false,
        }
    }

    pub fn enter_passive(&self) -> Result<(), TransportError> {
        self.transition(OperatingMode::Passive)
    }

    pub fn enter_active(&self, safety_param: u16) -> Result<(), TransportError> {
        self.transition(OperatingMode::Active { safety_param })
    }

    pub fn enter_disabled(&self) -> Result<(), TransportError> {
        self.transition(OperatingMode::Disabled)
    }

    fn transition(&self, target: OperatingMode) -> Result<(), TransportError> {
        let previous = self.current_mode();
        self.device.set_safety_mode(target)?;
        *self.mode.write() = target;
        info!(from = %previous, to = %target, device = %self.device.describe(), "Safety mode set");
        Ok(())
    }
}

/// Scoped acquisition of non-disabled safety modes
///
/// Call [`release`](Self::release) on the normal path to observe a failing
/// disable; otherwise dropping the scope disables the device and logs any
/// failure. Either way `enter_disabled` runs exactly once per scope.
pub struct SafetyScope<'a> {
    controller: &'a SafetyModeController,
    released: bool,
}

impl SafetyScope<'_> {
    pub fn enter_passive(&self) -> Result<(), TransportError> {
        self.controller.enter_passive()
    }

    pub fn enter_active(&self, safety_param: u16) -> Result<(), TransportError> {
        self.controller.enter_active(safety_param)
    }

    pub fn current_mode(&self) -> OperatingMode {
        self.controller.current_mode()
    }

    /// Return the device to `Disabled` and close the scope
    pub fn release(mut self) -> Result<(), TransportError> {
        self.released = true;
        self.controller.enter_disabled()
    }
}

impl Drop for SafetyScope<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.controller.enter_disabled() {
            error!(error = %e, "Failed to disable bus device while leaving safety scope");
        }
    }
}
