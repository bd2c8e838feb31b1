//! Raw bus frames

use std::fmt;

use bytes::Bytes;

/// One addressed message on a numbered bus segment
///
/// Frames are immutable once received; outbound frames are built fresh for
/// every send.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Arbitration ID (11- or 29-bit)
    pub address: u32,
    /// Data bytes
    pub payload: Bytes,
    /// Bus segment the frame was seen on / is destined for
    pub bus_index: u8,
}

impl Frame {
    pub fn new(address: u32, payload: impl Into<Bytes>, bus_index: u8) -> Self {
        Self {
            address,
            payload: payload.into(),
            bus_index,
        }
    }

    /// Whether the address needs a 29-bit identifier
    pub fn is_extended(&self) -> bool {
        self.address > 0x7FF
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus{} 0x{:X} [{}]",
            self.bus_index,
            self.address,
            hex::encode(&self.payload)
        )
    }
}

/// Everything received or sent in one tick or one poll
///
/// Order inside a batch carries no meaning for the harness.
pub type FrameBatch = Vec<Frame>;

/// Keep only the most recent frame per (bus, address) pair, preserving the
/// order in which addresses were first seen.
pub fn latest_per_address(batch: &[Frame]) -> Vec<&Frame> {
    let mut latest: Vec<&Frame> = Vec::new();
    for frame in batch {
        match latest
            .iter_mut()
            .find(|f| f.address == frame.address && f.bus_index == frame.bus_index)
        {
            Some(slot) => *slot = frame,
            None => latest.push(frame),
        }
    }
    latest
}
