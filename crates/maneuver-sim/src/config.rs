//! Simulator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::plant::PlantConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub vehicle: PlantConfig,
    /// Period of the vehicle's state broadcasts (ms)
    #[serde(default = "default_frame_period_ms")]
    pub frame_period_ms: u64,
    /// Whether the simulated platform supports harness longitudinal control
    #[serde(default = "default_longitudinal_control")]
    pub longitudinal_control: bool,
    /// Blocking receives the fingerprinter may issue before giving up
    #[serde(default = "default_fingerprint_receives")]
    pub fingerprint_receives: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            vehicle: PlantConfig::default(),
            frame_period_ms: default_frame_period_ms(),
            longitudinal_control: default_longitudinal_control(),
            fingerprint_receives: default_fingerprint_receives(),
        }
    }
}

impl SimConfig {
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms)
    }
}

fn default_frame_period_ms() -> u64 {
    10
}

fn default_longitudinal_control() -> bool {
    true
}

fn default_fingerprint_receives() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_table() {
        let config: SimConfig = toml::from_str("").unwrap();
        assert_eq!(config.frame_period(), Duration::from_millis(10));
        assert!(config.longitudinal_control);
        assert_eq!(config.vehicle.tau_s, 0.3);
    }

    #[test]
    fn test_cruising_vehicle() {
        let config: SimConfig = toml::from_str(
            r#"
[vehicle]
initial_speed = 8.94
cruise_set_speed = 8.94
"#,
        )
        .unwrap();
        assert_eq!(config.vehicle.cruise_set_speed, Some(8.94));
        assert_eq!(config.fingerprint_receives, 50);
    }
}
