//! Car interface and fingerprinter for the simulated vehicle

use std::collections::BTreeMap;

use async_trait::async_trait;
use maneuver_bus::{TransportAdapter, TransportError};
use maneuver_core::{
    latest_per_address, Actuators, CarControl, CarParams, CarState, CruiseState, DecodeError,
    EncodeError, FrameBatch,
};
use maneuver_runner::{CarInterface, FingerprintError, Fingerprinter};
use tracing::{debug, warn};

use crate::config::SimConfig;
use crate::protocol::{self, AccCommandMsg, CruiseStateMsg, VehicleStateMsg};

pub const CAR_NAME: &str = "Simulated sedan";
pub const CAR_FINGERPRINT: &str = "SIM_SEDAN";
/// Parameter the simulated interface expects for the active mode
pub const SAFETY_PARAM: u16 = 0x0049;

/// Decoder/encoder for the simulated vehicle's frame layout
pub struct SimCarInterface {
    params: CarParams,
    vehicle: Option<VehicleStateMsg>,
    cruise: Option<CruiseStateMsg>,
    counter: u8,
}

impl SimCarInterface {
    pub fn new(longitudinal_control: bool) -> Self {
        Self {
            params: CarParams {
                car_name: CAR_NAME.to_string(),
                car_fingerprint: CAR_FINGERPRINT.to_string(),
                openpilot_longitudinal_control: longitudinal_control,
                safety_param: SAFETY_PARAM,
            },
            vehicle: None,
            cruise: None,
            counter: 0,
        }
    }

    fn state(&self) -> CarState {
        let vehicle = self.vehicle.unwrap_or_default();
        let cruise = self.cruise.unwrap_or_default();
        CarState {
            v_ego: vehicle.speed,
            a_ego: vehicle.accel,
            standstill: vehicle.standstill,
            gas_pressed: vehicle.gas_pressed,
            brake_pressed: vehicle.brake_pressed,
            can_valid: self.vehicle.is_some() && self.cruise.is_some(),
            cruise_state: CruiseState {
                enabled: cruise.enabled,
                available: cruise.available,
                speed: cruise.set_speed,
                standstill: cruise.standstill,
            },
        }
    }
}

#[async_trait]
impl CarInterface for SimCarInterface {
    fn params(&self) -> &CarParams {
        &self.params
    }

    /// Prime the decoder with the vehicle's current broadcast
    async fn init(&mut self, transport: &TransportAdapter) -> Result<(), TransportError> {
        let batch = transport.receive(true).await?;
        if let Err(e) = self.update(&[batch]) {
            warn!(error = %e, "Ignoring undecodable frames during init");
        }
        debug!(can_valid = self.state().can_valid, "Simulated car initialized");
        Ok(())
    }

    /// Frames at unknown addresses are ignored; an empty batch keeps the
    /// last decoded values.
    fn update(&mut self, batches: &[FrameBatch]) -> Result<CarState, DecodeError> {
        for batch in batches {
            for frame in latest_per_address(batch) {
                if frame.bus_index != protocol::BUS {
                    continue;
                }
                match frame.address {
                    protocol::VEHICLE_STATE => {
                        self.vehicle = Some(protocol::decode_vehicle_state(frame)?)
                    }
                    protocol::CRUISE_STATE => self.cruise = Some(protocol::decode_cruise_state(frame)?),
                    _ => {}
                }
            }
        }
        Ok(self.state())
    }

    fn apply(&mut self, control: &CarControl) -> Result<(Actuators, FrameBatch), EncodeError> {
        let engaged = control.enabled && control.long_active;
        let requested = control.actuators.accel;
        if !requested.is_finite() {
            return Err(EncodeError::NotEncodable {
                field: "actuators.accel",
                value: f64::from(requested),
            });
        }
        let accel = if engaged {
            requested.clamp(protocol::ACCEL_MIN, protocol::ACCEL_MAX)
        } else {
            0.0
        };

        let msg = AccCommandMsg {
            enabled: engaged,
            cancel: control.cruise_control.cancel,
            resume: control.cruise_control.resume,
            accel,
            long_control_state: control.actuators.long_control_state,
        };
        let frame = protocol::encode_acc_command(&msg, self.counter)?;
        self.counter = self.counter.wrapping_add(1);

        let applied = Actuators {
            accel,
            ..control.actuators.clone()
        };
        Ok((applied, vec![frame]))
    }
}

/// Recognizes the simulated vehicle by the addresses and lengths it
/// broadcasts
pub struct SimFingerprinter {
    max_receives: usize,
    longitudinal_control: bool,
}

impl SimFingerprinter {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            max_receives: config.fingerprint_receives.max(1),
            longitudinal_control: config.longitudinal_control,
        }
    }

    fn matches(seen: &BTreeMap<u32, usize>) -> bool {
        [protocol::VEHICLE_STATE, protocol::CRUISE_STATE]
            .iter()
            .all(|address| seen.get(address) == Some(&protocol::FRAME_LEN))
    }
}

#[async_trait]
impl Fingerprinter for SimFingerprinter {
    async fn fingerprint(
        &self,
        transport: &TransportAdapter,
    ) -> Result<Box<dyn CarInterface>, FingerprintError> {
        let mut seen = BTreeMap::new();
        for _ in 0..self.max_receives {
            let batch = transport.receive(true).await?;
            for frame in &batch {
                seen.insert(frame.address, frame.payload.len());
            }
            if Self::matches(&seen) {
                debug!(addresses = seen.len(), "Simulated vehicle recognized");
                return Ok(Box::new(SimCarInterface::new(self.longitudinal_control)));
            }
        }

        let seen: Vec<String> = seen
            .iter()
            .map(|(address, len)| format!("0x{address:X}/{len}"))
            .collect();
        Err(FingerprintError::Unrecognized(format!(
            "no match after {} receives, saw [{}]",
            self.max_receives,
            seen.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use maneuver_bus::transport::mock::MockBusDevice;
    use maneuver_core::{Frame, LongControlState};

    fn vehicle_frame(speed: f32) -> Frame {
        protocol::encode_vehicle_state(
            &VehicleStateMsg {
                speed,
                ..Default::default()
            },
            0,
        )
    }

    fn cruise_frame() -> Frame {
        protocol::encode_cruise_state(
            &CruiseStateMsg {
                available: true,
                ..Default::default()
            },
            0,
        )
    }

    #[test]
    fn test_update_uses_latest_frame_and_keeps_state() {
        let mut car = SimCarInterface::new(true);
        let state = car
            .update(&[vec![vehicle_frame(1.0), vehicle_frame(2.0), cruise_frame()]])
            .unwrap();
        assert_eq!(state.v_ego, 2.0);
        assert!(state.can_valid);
        assert!(state.cruise_state.available);

        let state = car.update(&[Vec::new()]).unwrap();
        assert_eq!(state.v_ego, 2.0);
    }

    #[test]
    fn test_update_ignores_unknown_addresses() {
        let mut car = SimCarInterface::new(true);
        let state = car
            .update(&[vec![Frame::new(0x7E8, vec![1, 2, 3], 0), vehicle_frame(3.0)]])
            .unwrap();
        assert_eq!(state.v_ego, 3.0);
        assert!(!state.can_valid);
    }

    #[test]
    fn test_update_rejects_malformed_frame() {
        let mut car = SimCarInterface::new(true);
        let err = car
            .update(&[vec![Frame::new(protocol::VEHICLE_STATE, vec![0u8; 3], 0)]])
            .unwrap_err();
        assert!(matches!(err, DecodeError::Length { actual: 3, .. }));
    }

    #[test]
    fn test_apply_clamps_and_encodes() {
        let mut car = SimCarInterface::new(true);
        let control = CarControl::longitudinal(Actuators {
            accel: 5.0,
            long_control_state: LongControlState::Pid,
            ..Default::default()
        });
        let (applied, frames) = car.apply(&control).unwrap();
        assert_eq!(applied.accel, protocol::ACCEL_MAX);
        assert_eq!(frames.len(), 1);

        let msg = protocol::decode_acc_command(&frames[0]).unwrap();
        assert!(msg.enabled);
        assert_eq!(msg.accel, protocol::ACCEL_MAX);
        assert_eq!(msg.long_control_state, LongControlState::Pid);
    }

    #[test]
    fn test_neutral_intent_commands_nothing() {
        let mut car = SimCarInterface::new(true);
        let (applied, frames) = car.apply(&CarControl::default()).unwrap();
        assert_eq!(applied.accel, 0.0);
        let msg = protocol::decode_acc_command(&frames[0]).unwrap();
        assert!(!msg.enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fingerprint_matches_broadcast() {
        let device = Arc::new(MockBusDevice::new());
        device.push_inbound(vec![vehicle_frame(0.0)]);
        device.push_inbound(vec![cruise_frame()]);
        let transport = TransportAdapter::new(device.clone());

        let car = SimFingerprinter::new(&SimConfig::default())
            .fingerprint(&transport)
            .await
            .unwrap();
        assert_eq!(car.params().car_fingerprint, CAR_FINGERPRINT);
        assert_eq!(car.params().safety_param, SAFETY_PARAM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fingerprint_gives_up_after_bounded_receives() {
        let device = Arc::new(MockBusDevice::new());
        device.set_idle(vec![Frame::new(0x123, vec![0u8; 8], 0)]);
        let transport = TransportAdapter::new(device.clone());
        let config = SimConfig {
            fingerprint_receives: 5,
            ..Default::default()
        };

        let err = match SimFingerprinter::new(&config).fingerprint(&transport).await {
            Ok(_) => panic!("fingerprint should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, FingerprintError::Unrecognized(ref msg) if msg.contains("0x123/8")));
        assert_eq!(device.poll_count(), 5);
    }
}
