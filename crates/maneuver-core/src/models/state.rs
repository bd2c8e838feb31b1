//! Vehicle state decoded from inbound frames

use serde::{Deserialize, Serialize};

use super::{FieldDescriptor, Traced};

/// Cruise system status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CruiseState {
    pub enabled: bool,
    pub available: bool,
    /// Set speed (m/s)
    pub speed: f32,
    pub standstill: bool,
}

/// Structured decode of the latest frames
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CarState {
    /// Vehicle speed (m/s)
    pub v_ego: f32,
    /// Longitudinal acceleration (m/s^2)
    pub a_ego: f32,
    pub standstill: bool,
    pub gas_pressed: bool,
    pub brake_pressed: bool,
    /// Whether every expected message was received and valid
    pub can_valid: bool,
    pub cruise_state: CruiseState,
}

impl Traced for CarState {
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor {
            path: "carState.vEgo",
            read: |s| s.v_ego.into(),
        },
        FieldDescriptor {
            path: "carState.aEgo",
            read: |s| s.a_ego.into(),
        },
        FieldDescriptor {
            path: "carState.standstill",
            read: |s| s.standstill.into(),
        },
        FieldDescriptor {
            path: "carState.gasPressed",
            read: |s| s.gas_pressed.into(),
        },
        FieldDescriptor {
            path: "carState.brakePressed",
            read: |s| s.brake_pressed.into(),
        },
        FieldDescriptor {
            path: "carState.canValid",
            read: |s| s.can_valid.into(),
        },
        FieldDescriptor {
            path: "carState.cruiseState.enabled",
            read: |s| s.cruise_state.enabled.into(),
        },
        FieldDescriptor {
            path: "carState.cruiseState.available",
            read: |s| s.cruise_state.available.into(),
        },
        FieldDescriptor {
            path: "carState.cruiseState.speed",
            read: |s| s.cruise_state.speed.into(),
        },
        FieldDescriptor {
            path: "carState.cruiseState.standstill",
            read: |s| s.cruise_state.standstill.into(),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleValue;

    #[test]
    fn test_paths_are_unique() {
        let mut paths: Vec<&str> = CarState::FIELDS.iter().map(|f| f.path).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), CarState::FIELDS.len());
    }

    #[test]
    fn test_flatten_reads_nested_cruise_state() {
        let state = CarState {
            cruise_state: CruiseState {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let fields = state.flatten();
        assert!(fields.contains(&("carState.cruiseState.enabled", SampleValue::Bool(true))));
        assert!(fields.contains(&("carState.canValid", SampleValue::Bool(false))));
    }
}
