//! Harness configuration
//!
//! Loaded from TOML; every field has a default so an empty file (or no file
//! at all) runs the built-in catalogue at the reference rate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use maneuver_bus::DeviceConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::maneuver::{default_maneuvers, Maneuver, SetupCondition, DEFAULT_DURATION_S};

/// Complete harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Bus device; when absent the caller picks one (e.g. a simulator)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<DeviceConfig>,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub report: ReportConfig,
    /// Maneuvers to run, in order; empty means the built-in catalogue
    #[serde(default)]
    pub maneuvers: Vec<ManeuverConfig>,
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        if !(timing.rate_hz.is_finite() && timing.rate_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timing.rate_hz must be positive, got {}",
                timing.rate_hz
            )));
        }
        match Duration::try_from_secs_f64(timing.tick_period_s()) {
            Ok(period) if (MIN_TICK_PERIOD..=MAX_TICK_PERIOD).contains(&period) => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "timing.rate_hz {} gives a tick period outside {:?}..={:?}",
                    timing.rate_hz, MIN_TICK_PERIOD, MAX_TICK_PERIOD
                )))
            }
        }
        if !(timing.stabilization_s.is_finite() && timing.stabilization_s >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timing.stabilization_s must be non-negative, got {}",
                timing.stabilization_s
            )));
        }
        if timing.max_samples == 0 {
            return Err(ConfigError::Invalid(
                "timing.max_samples must be at least 1".to_string(),
            ));
        }
        let report = &self.report;
        for (name, range) in [
            ("accel_range", report.accel_range),
            ("boolean_range", report.boolean_range),
        ] {
            if !(range.iter().all(|v| v.is_finite()) && range[0] < range[1]) {
                return Err(ConfigError::Invalid(format!(
                    "report.{} must be finite and increasing, got {:?}",
                    name, range
                )));
            }
        }
        for m in &self.maneuvers {
            if !(m.duration_s.is_finite() && m.duration_s > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "maneuver '{}': duration_s must be positive",
                    m.description
                )));
            }
            if m.profile.iter().flatten().any(|v| !v.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "maneuver '{}': profile values must be finite",
                    m.description
                )));
            }
        }
        Ok(())
    }

    /// Configured maneuvers, or the built-in catalogue when none are listed
    pub fn maneuvers(&self) -> Vec<Maneuver> {
        if self.maneuvers.is_empty() {
            default_maneuvers()
        } else {
            self.maneuvers.iter().map(Maneuver::from).collect()
        }
    }
}

/// Fastest supported control rate is 1 kHz
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Slowest supported control rate is one tick per minute
pub const MAX_TICK_PERIOD: Duration = Duration::from_secs(60);

/// Control loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Control rate (Hz)
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
    /// Length of the neutral stabilization phase before each maneuver (s)
    #[serde(default = "default_stabilization_s")]
    pub stabilization_s: f64,
    /// Hard cap on recorded samples per maneuver
    #[serde(default = "default_max_samples")]
    pub max_samples: u32,
    /// Delay between empty polls during blocking receives (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            stabilization_s: default_stabilization_s(),
            max_samples: default_max_samples(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl TimingConfig {
    /// Tick period, clamped to the supported range
    pub fn tick_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.tick_period_s())
            .unwrap_or(MAX_TICK_PERIOD)
            .clamp(MIN_TICK_PERIOD, MAX_TICK_PERIOD)
    }

    pub fn tick_period_s(&self) -> f64 {
        1.0 / self.rate_hz
    }

    pub fn stabilization_ticks(&self) -> u32 {
        (self.stabilization_s * self.rate_hz).round().max(0.0) as u32
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_rate_hz() -> f64 {
    100.0
}

fn default_stabilization_s() -> f64 {
    3.0
}

fn default_max_samples() -> u32 {
    100
}

fn default_poll_interval_ms() -> u64 {
    1
}

/// Report rendering and output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Document heading
    #[serde(default = "default_title")]
    pub title: String,
    /// Fixed y-range of the acceleration plot (m/s^2)
    #[serde(default = "default_accel_range")]
    pub accel_range: [f64; 2],
    /// Fixed y-range of boolean plots
    #[serde(default = "default_boolean_range")]
    pub boolean_range: [f64; 2],
    /// Boolean fields to plot; all tracked boolean fields when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_fields: Option<Vec<String>>,
    /// HTML report path
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Optional JSON export of the raw traces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_json: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            accel_range: default_accel_range(),
            boolean_range: default_boolean_range(),
            boolean_fields: None,
            output: default_output(),
            trace_json: None,
        }
    }
}

fn default_title() -> String {
    "Longitudinal maneuver report".to_string()
}

fn default_accel_range() -> [f64; 2] {
    [-2.2, 2.2]
}

fn default_boolean_range() -> [f64; 2] {
    [-0.1, 1.1]
}

fn default_output() -> PathBuf {
    PathBuf::from("report.html")
}

/// A maneuver declared in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManeuverConfig {
    pub description: String,
    pub setup: SetupCondition,
    #[serde(default = "default_duration_s")]
    pub duration_s: f64,
    /// `[t, accel]` breakpoints; an empty profile is the idle script
    #[serde(default)]
    pub profile: Vec<[f64; 2]>,
}

fn default_duration_s() -> f64 {
    DEFAULT_DURATION_S
}
