//! Safety operating modes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Behavioral posture of the bus device
///
/// Exactly one mode is in force at a time. The harness guarantees the
/// device is `Disabled` before a session starts and after it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OperatingMode {
    /// No output of any kind
    #[default]
    Disabled,
    /// Probe-only: diagnostic queries allowed, no actuation
    Passive,
    /// Vehicle-specific actuation allowed, parameterized by the vehicle's
    /// safety parameter
    Active { safety_param: u16 },
}

impl OperatingMode {
    /// Whether actuation frames may reach the vehicle in this mode
    pub fn allows_actuation(&self) -> bool {
        matches!(self, OperatingMode::Active { .. })
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Disabled => f.write_str("disabled"),
            OperatingMode::Passive => f.write_str("passive"),
            OperatingMode::Active { safety_param } => {
                write!(f, "active(0x{:04X})", safety_param)
            }
        }
    }
}
