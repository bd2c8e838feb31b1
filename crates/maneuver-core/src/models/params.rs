//! Vehicle configuration reported by a fingerprinted car interface

use serde::{Deserialize, Serialize};

/// Static parameters of the identified vehicle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarParams {
    /// Human-readable make/platform name
    pub car_name: String,
    /// Fingerprint identifier shown in reports
    pub car_fingerprint: String,
    /// Whether the harness may command longitudinal control on this vehicle
    pub openpilot_longitudinal_control: bool,
    /// Parameter passed to the bus device when entering the active mode
    pub safety_param: u16,
}
