//! Simulated bus device
//!
//! Each poll advances the vehicle by the time elapsed since the previous
//! poll and, once per frame period, broadcasts the state frames. Commands
//! are only honored in the active mode; frames sent in any other mode are
//! dropped and counted, the way a safety-gated interface would.

use maneuver_bus::{BusDevice, TransportError};
use maneuver_core::{Frame, FrameBatch, OperatingMode};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::plant::{Demand, Plant};
use crate::protocol::{self, AccCommandMsg, CruiseStateMsg, VehicleStateMsg};

struct SimState {
    plant: Plant,
    mode: OperatingMode,
    modes: Vec<OperatingMode>,
    command: Option<AccCommandMsg>,
    last_step: Option<Instant>,
    last_broadcast: Option<Instant>,
    counter: u8,
    accepted: u64,
    blocked: u64,
}

impl SimState {
    fn demand(&self) -> Demand {
        match (self.mode, self.command) {
            (OperatingMode::Active { .. }, Some(cmd)) if cmd.enabled => Demand::Commanded(cmd.accel),
            _ => Demand::Vehicle,
        }
    }

    fn state_frames(&mut self) -> FrameBatch {
        let counter = self.counter;
        self.counter = self.counter.wrapping_add(1);
        let plant = &self.plant;
        vec![
            protocol::encode_vehicle_state(
                &VehicleStateMsg {
                    speed: plant.speed(),
                    accel: plant.accel(),
                    standstill: plant.standstill(),
                    gas_pressed: false,
                    brake_pressed: plant.brake_pressed(),
                },
                counter,
            ),
            protocol::encode_cruise_state(
                &CruiseStateMsg {
                    enabled: plant.cruise_enabled(),
                    available: true,
                    standstill: plant.standstill(),
                    set_speed: plant.cruise_set_speed(),
                },
                counter,
            ),
        ]
    }
}

/// In-process vehicle behind the [`BusDevice`] interface
pub struct SimBusDevice {
    config: SimConfig,
    state: Mutex<SimState>,
}

impl SimBusDevice {
    pub fn new(config: SimConfig) -> Self {
        let plant = Plant::new(&config.vehicle);
        Self {
            config,
            state: Mutex::new(SimState {
                plant,
                mode: OperatingMode::Disabled,
                modes: Vec::new(),
                command: None,
                last_step: None,
                last_broadcast: None,
                counter: 0,
                accepted: 0,
                blocked: 0,
            }),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn mode(&self) -> OperatingMode {
        self.state.lock().mode
    }

    /// Every mode applied, in order
    pub fn mode_history(&self) -> Vec<OperatingMode> {
        self.state.lock().modes.clone()
    }

    /// Command frames honored in the active mode
    pub fn accepted_commands(&self) -> u64 {
        self.state.lock().accepted
    }

    /// Frames dropped because the mode did not allow sending
    pub fn blocked_count(&self) -> u64 {
        self.state.lock().blocked
    }

    pub fn last_command(&self) -> Option<AccCommandMsg> {
        self.state.lock().command
    }

    pub fn speed(&self) -> f32 {
        self.state.lock().plant.speed()
    }
}

impl BusDevice for SimBusDevice {
    fn poll(&self) -> Result<FrameBatch, TransportError> {
        let now = Instant::now();
        let mut state = self.state.lock();

        if let Some(last) = state.last_step {
            let demand = state.demand();
            state.plant.step((now - last).as_secs_f64(), demand);
        }
        state.last_step = Some(now);

        let due = state
            .last_broadcast
            .map_or(true, |last| now - last >= self.config.frame_period());
        if !due {
            return Ok(Vec::new());
        }
        state.last_broadcast = Some(now);
        Ok(state.state_frames())
    }

    fn send_many(&self, frames: &[Frame]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.mode.allows_actuation() {
            state.blocked += frames.len() as u64;
            if !frames.is_empty() {
                debug!(mode = %state.mode, frames = frames.len(), "Dropping frames sent outside the active mode");
            }
            return Ok(());
        }

        for frame in frames {
            if frame.address != protocol::ACC_COMMAND || frame.bus_index != protocol::BUS {
                continue;
            }
            match protocol::decode_acc_command(frame) {
                Ok(cmd) => {
                    if cmd.cancel {
                        state.plant.cancel_cruise();
                    }
                    if cmd.resume {
                        state.plant.resume_cruise();
                    }
                    state.command = Some(cmd);
                    state.accepted += 1;
                }
                Err(e) => {
                    warn!(error = %e, frame = %frame, "Rejecting malformed command frame");
                }
            }
        }
        Ok(())
    }

    fn set_safety_mode(&self, mode: OperatingMode) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !mode.allows_actuation() {
            state.command = None;
        }
        state.mode = mode;
        state.modes.push(mode);
        state.blocked = 0;
        info!(mode = %mode, "Simulated vehicle mode set");
        Ok(())
    }

    fn describe(&self) -> String {
        "sim".to_string()
    }
}
