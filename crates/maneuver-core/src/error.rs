//! Errors raised by car interfaces while translating frames

use thiserror::Error;

/// Failure to turn inbound frames into a vehicle state
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// A frame at a known address had an unexpected length
    #[error("Malformed frame 0x{address:X} on bus {bus}: expected {expected} bytes, got {actual}")]
    Length {
        address: u32,
        bus: u8,
        expected: usize,
        actual: usize,
    },

    /// A frame failed its integrity check
    #[error("Checksum mismatch on frame 0x{address:X} (bus {bus})")]
    Checksum { address: u32, bus: u8 },

    /// A frame that the decoder does not recognize where one is required
    #[error("Unrecognized frame 0x{address:X} on bus {bus}")]
    Unrecognized { address: u32, bus: u8 },

    /// Any other decoder-specific failure
    #[error("Decode failed: {0}")]
    Other(String),
}

/// Failure to turn a control intent into outbound frames
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    /// An actuator target cannot be represented on the wire
    #[error("Value {value} for '{field}' is not encodable")]
    NotEncodable { field: &'static str, value: f64 },

    /// The vehicle does not support the requested command
    #[error("Unsupported command: {0}")]
    Unsupported(String),
}
