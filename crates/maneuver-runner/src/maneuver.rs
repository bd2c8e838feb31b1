//! Maneuver descriptors

use std::fmt;

use maneuver_core::{CarControl, CarState};
use serde::{Deserialize, Serialize};

use crate::config::ManeuverConfig;
use crate::script::Script;

/// Wall-clock length of a maneuver unless configured otherwise (s)
pub const DEFAULT_DURATION_S: f64 = 1.0;

/// Speed below which the vehicle counts as stopped (m/s)
const STOPPED_SPEED: f32 = 0.1;
/// Speed above which the vehicle can be at a steady cruise (m/s)
const MIN_CRUISE_SPEED: f32 = 1.0;
/// Largest acceleration magnitude still considered steady (m/s^2)
const STEADY_ACCEL: f32 = 0.2;

/// Initial vehicle state a maneuver expects before its script starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupCondition {
    /// Vehicle stationary
    Stopped,
    /// Vehicle holding a steady cruise speed
    SteadyStateSpeed,
}

impl SetupCondition {
    /// Whether `state` satisfies the condition
    ///
    /// Only used for an advisory warning after stabilization.
    pub fn is_observed(&self, state: &CarState) -> bool {
        match self {
            SetupCondition::Stopped => state.standstill || state.v_ego < STOPPED_SPEED,
            SetupCondition::SteadyStateSpeed => {
                state.v_ego > MIN_CRUISE_SPEED && state.a_ego.abs() < STEADY_ACCEL
            }
        }
    }
}

impl fmt::Display for SetupCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupCondition::Stopped => f.write_str("stopped"),
            SetupCondition::SteadyStateSpeed => f.write_str("steady state speed"),
        }
    }
}

/// Identity of a maneuver within a session: its position in the run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManeuverId(pub usize);

impl fmt::Display for ManeuverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declarative test case: setup condition plus a time-indexed script
///
/// The definition is immutable; every run records into a fresh trace.
#[derive(Debug, Clone)]
pub struct Maneuver {
    description: String,
    setup: SetupCondition,
    duration_s: f64,
    script: Script,
}

impl Maneuver {
    pub fn new(description: impl Into<String>, setup: SetupCondition) -> Self {
        Self {
            description: description.into(),
            setup,
            duration_s: DEFAULT_DURATION_S,
            script: Script::idle(),
        }
    }

    pub fn with_duration(mut self, duration_s: f64) -> Self {
        self.duration_s = duration_s;
        self
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.script = script;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn setup(&self) -> SetupCondition {
        self.setup
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Number of scripted ticks at `rate_hz`
    pub fn tick_count(&self, rate_hz: f64) -> u32 {
        (self.duration_s * rate_hz).round().max(0.0) as u32
    }

    pub fn intent_at(&self, tick: u32, tick_period_s: f64) -> CarControl {
        self.script.intent(tick, tick_period_s)
    }
}

impl From<&ManeuverConfig> for Maneuver {
    fn from(config: &ManeuverConfig) -> Self {
        let script = if config.profile.is_empty() {
            Script::idle()
        } else {
            Script::accel_profile(config.profile.iter().map(|[t, a]| (*t, *a as f32)))
        };
        Maneuver::new(config.description.clone(), config.setup)
            .with_duration(config.duration_s)
            .with_script(script)
    }
}

/// Built-in maneuver catalogue
pub fn default_maneuvers() -> Vec<Maneuver> {
    vec![
        Maneuver::new("start from stop", SetupCondition::Stopped).with_script(
            Script::accel_profile([(0.0, 0.0), (0.2, 0.0), (0.4, 1.5), (1.0, 1.5)]),
        ),
        Maneuver::new(
            "creep: alternate between +1m/s^2 and -1m/s^2",
            SetupCondition::Stopped,
        )
        .with_script(Script::accel_profile([
            (0.0, 1.0),
            (0.25, 1.0),
            (0.25, -1.0),
            (0.5, -1.0),
            (0.5, 1.0),
            (0.75, 1.0),
            (0.75, -1.0),
            (1.0, -1.0),
        ])),
        Maneuver::new(
            "brake step response: -1m/s^2 from 20mph",
            SetupCondition::SteadyStateSpeed,
        )
        .with_script(Script::accel_profile([
            (0.0, 0.0),
            (0.2, 0.0),
            (0.2, -1.0),
            (1.0, -1.0),
        ])),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use maneuver_core::CruiseState;

    #[test]
    fn test_reference_tick_count() {
        let m = Maneuver::new("idle", SetupCondition::Stopped);
        assert_eq!(m.tick_count(100.0), 100);
        assert_eq!(m.clone().with_duration(2.5).tick_count(100.0), 250);
        assert_eq!(m.with_duration(0.0).tick_count(100.0), 0);
    }

    #[test]
    fn test_setup_conditions() {
        let stopped = CarState {
            standstill: true,
            ..Default::default()
        };
        let cruising = CarState {
            v_ego: 8.9,
            a_ego: 0.05,
            cruise_state: CruiseState {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(SetupCondition::Stopped.is_observed(&stopped));
        assert!(!SetupCondition::Stopped.is_observed(&cruising));
        assert!(SetupCondition::SteadyStateSpeed.is_observed(&cruising));
        assert!(!SetupCondition::SteadyStateSpeed.is_observed(&stopped));
    }

    #[test]
    fn test_default_catalogue() {
        let maneuvers = default_maneuvers();
        assert_eq!(maneuvers.len(), 3);
        assert_eq!(maneuvers[0].description(), "start from stop");
        assert_eq!(maneuvers[0].setup(), SetupCondition::Stopped);
        assert_eq!(maneuvers[2].setup(), SetupCondition::SteadyStateSpeed);
        assert!(maneuvers
            .iter()
            .all(|m| m.duration_s() == DEFAULT_DURATION_S));
    }

    #[test]
    fn test_from_config_profile() {
        let config = ManeuverConfig {
            description: "gentle brake".to_string(),
            setup: SetupCondition::SteadyStateSpeed,
            duration_s: 0.5,
            profile: vec![[0.0, -0.5], [0.5, -0.5]],
        };
        let m = Maneuver::from(&config);
        assert_eq!(m.tick_count(100.0), 50);
        assert_eq!(m.intent_at(10, 0.01).actuators.accel, -0.5);
    }
}
