//! Raw SocketCAN device with a software safety gate

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use maneuver_core::{Frame, FrameBatch, OperatingMode};
use parking_lot::RwLock;
use socketcan::Frame as _;
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Socket, StandardId};
use tracing::{debug, info, warn};

use crate::config::{parse_address, SocketCanConfig};
use crate::transport::{BusDevice, TransportError};

/// Raw CAN sockets, one per bus segment
///
/// SocketCAN has no notion of a safety mode, so the device enforces it on
/// transmit: nothing is sent while disabled, only the configured diagnostic
/// addresses while passive, everything while active. Blocked frames are
/// dropped silently and counted.
pub struct SocketCanDevice {
    sockets: Vec<(u8, CanSocket)>,
    passive_tx: HashSet<u32>,
    max_frames_per_poll: usize,
    mode: RwLock<OperatingMode>,
    blocked: AtomicUsize,
}

impl SocketCanDevice {
    pub fn open(config: &SocketCanConfig) -> Result<Self, TransportError> {
        if config.interfaces.is_empty() {
            return Err(TransportError::InvalidConfig(
                "At least one CAN interface is required".to_string(),
            ));
        }

        let mut sockets = Vec::with_capacity(config.interfaces.len());
        for bus in &config.interfaces {
            let socket = CanSocket::open(&bus.interface).map_err(|e| {
                TransportError::ConnectionFailed(format!(
                    "Failed to open raw CAN socket on {}: {}",
                    bus.interface, e
                ))
            })?;
            socket.set_nonblocking(true).map_err(|e| {
                TransportError::InvalidConfig(format!("Failed to set non-blocking: {}", e))
            })?;
            info!(interface = %bus.interface, bus = bus.bus_index, "Opened CAN interface");
            sockets.push((bus.bus_index, socket));
        }

        let passive_tx = config
            .passive_tx_addresses
            .iter()
            .map(|a| parse_address(a))
            .collect::<Result<HashSet<u32>, _>>()?;

        let device = Self {
            sockets,
            passive_tx,
            max_frames_per_poll: config.max_frames_per_poll,
            mode: RwLock::new(OperatingMode::Disabled),
            blocked: AtomicUsize::new(0),
        };
        device.drain();
        Ok(device)
    }

    /// Outbound frames dropped by the safety gate since the last mode change
    pub fn blocked_count(&self) -> usize {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Drop anything queued before the session started
    fn drain(&self) {
        for (bus, socket) in &self.sockets {
            let mut drained = 0usize;
            while drained < self.max_frames_per_poll && socket.read_frame().is_ok() {
                drained += 1;
            }
            if drained > 0 {
                debug!(bus, drained, "Drained stale frames from socket");
            }
        }
    }

    fn socket_for(&self, bus_index: u8) -> Option<&CanSocket> {
        self.sockets
            .iter()
            .find(|(bus, _)| *bus == bus_index)
            .map(|(_, socket)| socket)
    }
}

impl BusDevice for SocketCanDevice {
    fn poll(&self) -> Result<FrameBatch, TransportError> {
        let mut batch = Vec::new();
        for (bus, socket) in &self.sockets {
            for _ in 0..self.max_frames_per_poll {
                match socket.read_frame() {
                    Ok(CanFrame::Error(err)) => {
                        debug!(bus, ?err, "Ignoring CAN error frame");
                    }
                    Ok(frame) => batch.push(Frame {
                        address: frame.raw_id(),
                        payload: Bytes::copy_from_slice(frame.data()),
                        bus_index: *bus,
                    }),
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        return Err(TransportError::ReceiveFailed(format!(
                            "CAN read on bus {}: {}",
                            bus, e
                        )))
                    }
                }
            }
        }
        Ok(batch)
    }

    fn send_many(&self, frames: &[Frame]) -> Result<(), TransportError> {
        for frame in frames {
            if !gate(*self.mode.read(), &self.passive_tx, frame.address) {
                self.blocked.fetch_add(1, Ordering::SeqCst);
                debug!(%frame, mode = %*self.mode.read(), "Frame blocked by safety mode");
                continue;
            }

            let socket = self.socket_for(frame.bus_index).ok_or_else(|| {
                TransportError::SendFailed(format!("No interface for bus {}", frame.bus_index))
            })?;
            let can_frame = to_can_frame(frame)?;
            socket
                .write_frame(&can_frame)
                .map_err(|e| TransportError::SendFailed(format!("{}: {}", frame, e)))?;
        }
        Ok(())
    }

    fn set_safety_mode(&self, mode: OperatingMode) -> Result<(), TransportError> {
        let previous = std::mem::replace(&mut *self.mode.write(), mode);
        if previous != mode {
            let blocked = self.blocked.swap(0, Ordering::SeqCst);
            if blocked > 0 {
                warn!(%previous, blocked, "Frames were blocked by the safety gate");
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let buses: Vec<String> = self.sockets.iter().map(|(b, _)| b.to_string()).collect();
        format!("socketcan(buses {})", buses.join(","))
    }
}

/// Whether `mode` lets a frame to `address` onto the bus
fn gate(mode: OperatingMode, passive_tx: &HashSet<u32>, address: u32) -> bool {
    match mode {
        OperatingMode::Disabled => false,
        OperatingMode::Passive => passive_tx.contains(&address),
        OperatingMode::Active { .. } => true,
    }
}

fn to_can_frame(frame: &Frame) -> Result<CanFrame, TransportError> {
    let can_frame = if frame.is_extended() {
        ExtendedId::new(frame.address).and_then(|id| CanFrame::new(id, &frame.payload))
    } else {
        StandardId::new(frame.address as u16).and_then(|id| CanFrame::new(id, &frame.payload))
    };
    can_frame.ok_or_else(|| TransportError::SendFailed(format!("Not a valid CAN frame: {}", frame)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic_only() -> HashSet<u32> {
        [0x7DF, 0x18DB33F1].into_iter().collect()
    }

    #[test]
    fn test_disabled_blocks_everything() {
        let passive_tx = diagnostic_only();
        for address in [0x7DF, 0x18DB33F1, 0x343, 0x200] {
            assert!(!gate(OperatingMode::Disabled, &passive_tx, address));
        }
    }

    #[test]
    fn test_passive_allows_only_configured_addresses() {
        let passive_tx = diagnostic_only();
        assert!(gate(OperatingMode::Passive, &passive_tx, 0x7DF));
        assert!(gate(OperatingMode::Passive, &passive_tx, 0x18DB33F1));
        assert!(!gate(OperatingMode::Passive, &passive_tx, 0x343));
        assert!(!gate(OperatingMode::Passive, &HashSet::new(), 0x7DF));
    }

    #[test]
    fn test_active_allows_everything() {
        let active = OperatingMode::Active { safety_param: 0x49 };
        for address in [0x7DF, 0x343, 0x200, 0x1FFF_FFFF] {
            assert!(gate(active, &HashSet::new(), address));
        }
    }

    #[test]
    fn test_to_can_frame_rejects_oversized_payload() {
        let frame = Frame {
            address: 0x343,
            payload: Bytes::from_static(&[0; 9]),
            bus_index: 0,
        };
        assert!(matches!(
            to_can_frame(&frame),
            Err(TransportError::SendFailed(_))
        ));
    }
}
