//! Bus device configuration

use serde::{Deserialize, Serialize};

use crate::transport::TransportError;
use maneuver_core::Frame;

/// Which bus device to open
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceConfig {
    /// Raw SocketCAN (Linux only)
    SocketCan(SocketCanConfig),
    /// In-memory device for dry runs
    Mock(MockConfig),
}

/// SocketCAN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketCanConfig {
    /// One raw socket per bus segment
    pub interfaces: Vec<BusInterface>,
    /// Addresses that may be transmitted while in passive mode (hex or decimal)
    #[serde(default = "default_passive_tx_addresses")]
    pub passive_tx_addresses: Vec<String>,
    /// Upper bound on frames drained from one socket in a single poll
    #[serde(default = "default_max_frames_per_poll")]
    pub max_frames_per_poll: usize,
}

/// Mapping of a bus index to a CAN interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusInterface {
    /// CAN interface name (e.g., "can0")
    pub interface: String,
    /// Bus index reported on received frames and used to route sends
    #[serde(default)]
    pub bus_index: u8,
}

fn default_passive_tx_addresses() -> Vec<String> {
    // OBD-II functional/physical request IDs and the 29-bit functional ID
    vec![
        "0x7DF".to_string(),
        "0x7E0".to_string(),
        "0x18DB33F1".to_string(),
    ]
}

fn default_max_frames_per_poll() -> usize {
    256
}

/// Mock device configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {
    /// Frames returned by every poll once scripted input is exhausted
    #[serde(default)]
    pub idle_frames: Vec<FrameConfig>,
}

/// A frame written out in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Address (hex with 0x prefix, or decimal)
    pub address: String,
    /// Payload as a hex string
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub bus: u8,
}

impl FrameConfig {
    pub fn to_frame(&self) -> Result<Frame, TransportError> {
        let address = parse_address(&self.address)?;
        let payload = hex::decode(self.data.trim()).map_err(|e| {
            TransportError::InvalidConfig(format!("Invalid payload '{}': {}", self.data, e))
        })?;
        Ok(Frame::new(address, payload, self.bus))
    }
}

/// Parse a bus address from string (supports hex with 0x prefix)
pub fn parse_address(s: &str) -> Result<u32, TransportError> {
    let s = s.trim();
    let (digits, radix) = if s.starts_with("0x") || s.starts_with("0X") {
        (&s[2..], 16)
    } else {
        (s, 10)
    };

    u32::from_str_radix(digits, radix)
        .map_err(|e| TransportError::InvalidConfig(format!("Invalid address '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x7DF").unwrap(), 0x7DF);
        assert_eq!(parse_address("0X18DB33F1").unwrap(), 0x18DB33F1);
        assert_eq!(parse_address(" 512 ").unwrap(), 512);
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_socketcan_defaults() {
        let toml = r#"
type = "socketcan"

[[interfaces]]
interface = "can0"
"#;
        let config: DeviceConfig = toml::from_str(toml).unwrap();
        match config {
            DeviceConfig::SocketCan(cfg) => {
                assert_eq!(cfg.interfaces.len(), 1);
                assert_eq!(cfg.interfaces[0].bus_index, 0);
                assert_eq!(cfg.max_frames_per_poll, 256);
                assert!(cfg.passive_tx_addresses.contains(&"0x7DF".to_string()));
            }
            other => panic!("Expected socketcan config, got {:?}", other),
        }
    }

    #[test]
    fn test_mock_idle_frames() {
        let toml = r#"
type = "mock"

[[idle_frames]]
address = "0x100"
data = "00ff"
bus = 1
"#;
        let config: DeviceConfig = toml::from_str(toml).unwrap();
        let DeviceConfig::Mock(cfg) = config else {
            panic!("Expected mock config");
        };
        let frame = cfg.idle_frames[0].to_frame().unwrap();
        assert_eq!(frame.address, 0x100);
        assert_eq!(frame.payload.as_ref(), &[0x00, 0xFF]);
        assert_eq!(frame.bus_index, 1);
    }
}
