//! Frame layout spoken by the simulated vehicle
//!
//! Every message is 8 bytes on bus 0. Byte 6 carries a 4-bit rolling
//! counter and byte 7 a CRC-8 (SAE J1850) over bytes 0..7.
//!
//! | Address | Message       | Payload                                              |
//! |---------|---------------|------------------------------------------------------|
//! | 0x100   | vehicle state | speed u16 (0.01 m/s), accel i16 (0.001 m/s^2), flags |
//! | 0x101   | cruise state  | flags, set speed u16 (0.01 m/s)                      |
//! | 0x200   | ACC command   | flags, accel i16 (0.001 m/s^2), control state        |

use crc::{Crc, CRC_8_SAE_J1850};
use maneuver_core::{DecodeError, EncodeError, Frame, LongControlState};

/// CRC-8 calculator (SAE J1850)
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SAE_J1850);

pub const VEHICLE_STATE: u32 = 0x100;
pub const CRUISE_STATE: u32 = 0x101;
pub const ACC_COMMAND: u32 = 0x200;

pub const FRAME_LEN: usize = 8;
pub const BUS: u8 = 0;

const SPEED_SCALE: f32 = 100.0;
const ACCEL_SCALE: f32 = 1000.0;

/// Largest acceleration command the vehicle accepts (m/s^2)
pub const ACCEL_MAX: f32 = 2.0;
/// Strongest deceleration command the vehicle accepts (m/s^2)
pub const ACCEL_MIN: f32 = -3.5;

/// Contents of a vehicle state frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleStateMsg {
    pub speed: f32,
    pub accel: f32,
    pub standstill: bool,
    pub gas_pressed: bool,
    pub brake_pressed: bool,
}

/// Contents of a cruise state frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CruiseStateMsg {
    pub enabled: bool,
    pub available: bool,
    pub standstill: bool,
    pub set_speed: f32,
}

/// Contents of an ACC command frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccCommandMsg {
    pub enabled: bool,
    pub cancel: bool,
    pub resume: bool,
    pub accel: f32,
    pub long_control_state: LongControlState,
}

fn flags(bits: &[bool]) -> u8 {
    bits.iter()
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | (u8::from(b) << i))
}

fn bit(byte: u8, i: u8) -> bool {
    byte & (1 << i) != 0
}

fn finish(address: u32, mut payload: [u8; FRAME_LEN], counter: u8) -> Frame {
    payload[6] = counter & 0x0F;
    payload[7] = CRC8.checksum(&payload[..7]);
    Frame::new(address, payload.to_vec(), BUS)
}

/// Check length and checksum, returning the payload bytes
fn verify(frame: &Frame) -> Result<&[u8], DecodeError> {
    let data = frame.payload.as_ref();
    if data.len() != FRAME_LEN {
        return Err(DecodeError::Length {
            address: frame.address,
            bus: frame.bus_index,
            expected: FRAME_LEN,
            actual: data.len(),
        });
    }
    if CRC8.checksum(&data[..7]) != data[7] {
        return Err(DecodeError::Checksum {
            address: frame.address,
            bus: frame.bus_index,
        });
    }
    Ok(data)
}

fn speed_raw(speed: f32) -> [u8; 2] {
    ((speed.max(0.0) * SPEED_SCALE).round().min(f32::from(u16::MAX)) as u16).to_be_bytes()
}

fn accel_raw(accel: f32) -> [u8; 2] {
    let raw = (accel * ACCEL_SCALE)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
    raw.to_be_bytes()
}

fn speed_value(hi: u8, lo: u8) -> f32 {
    f32::from(u16::from_be_bytes([hi, lo])) / SPEED_SCALE
}

fn accel_value(hi: u8, lo: u8) -> f32 {
    f32::from(i16::from_be_bytes([hi, lo])) / ACCEL_SCALE
}

pub fn encode_vehicle_state(msg: &VehicleStateMsg, counter: u8) -> Frame {
    let [s0, s1] = speed_raw(msg.speed);
    let [a0, a1] = accel_raw(msg.accel);
    let f = flags(&[msg.standstill, msg.gas_pressed, msg.brake_pressed]);
    finish(VEHICLE_STATE, [s0, s1, a0, a1, f, 0, 0, 0], counter)
}

pub fn decode_vehicle_state(frame: &Frame) -> Result<VehicleStateMsg, DecodeError> {
    let d = verify(frame)?;
    Ok(VehicleStateMsg {
        speed: speed_value(d[0], d[1]),
        accel: accel_value(d[2], d[3]),
        standstill: bit(d[4], 0),
        gas_pressed: bit(d[4], 1),
        brake_pressed: bit(d[4], 2),
    })
}

pub fn encode_cruise_state(msg: &CruiseStateMsg, counter: u8) -> Frame {
    let f = flags(&[msg.enabled, msg.available, msg.standstill]);
    let [s0, s1] = speed_raw(msg.set_speed);
    finish(CRUISE_STATE, [f, s0, s1, 0, 0, 0, 0, 0], counter)
}

pub fn decode_cruise_state(frame: &Frame) -> Result<CruiseStateMsg, DecodeError> {
    let d = verify(frame)?;
    Ok(CruiseStateMsg {
        enabled: bit(d[0], 0),
        available: bit(d[0], 1),
        standstill: bit(d[0], 2),
        set_speed: speed_value(d[1], d[2]),
    })
}

pub fn encode_acc_command(msg: &AccCommandMsg, counter: u8) -> Result<Frame, EncodeError> {
    if !msg.accel.is_finite() {
        return Err(EncodeError::NotEncodable {
            field: "accel",
            value: f64::from(msg.accel),
        });
    }
    let f = flags(&[msg.enabled, msg.cancel, msg.resume]);
    let [a0, a1] = accel_raw(msg.accel);
    let state = match msg.long_control_state {
        LongControlState::Off => 0,
        LongControlState::Pid => 1,
        LongControlState::Stopping => 2,
        LongControlState::Starting => 3,
    };
    Ok(finish(ACC_COMMAND, [f, a0, a1, state, 0, 0, 0, 0], counter))
}

pub fn decode_acc_command(frame: &Frame) -> Result<AccCommandMsg, DecodeError> {
    let d = verify(frame)?;
    let long_control_state = match d[3] {
        0 => LongControlState::Off,
        1 => LongControlState::Pid,
        2 => LongControlState::Stopping,
        3 => LongControlState::Starting,
        other => {
            return Err(DecodeError::Other(format!(
                "unknown control state {other} in frame 0x{:X}",
                frame.address
            )))
        }
    };
    Ok(AccCommandMsg {
        enabled: bit(d[0], 0),
        cancel: bit(d[0], 1),
        resume: bit(d[0], 2),
        accel: accel_value(d[1], d[2]),
        long_control_state,
    })
}
