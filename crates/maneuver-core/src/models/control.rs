//! Control intent sent to the vehicle each tick

use serde::{Deserialize, Serialize};

use super::{FieldDescriptor, SampleValue, Traced};

/// Longitudinal controller state reported alongside actuator targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongControlState {
    #[default]
    Off,
    Pid,
    Stopping,
    Starting,
}

impl LongControlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LongControlState::Off => "off",
            LongControlState::Pid => "pid",
            LongControlState::Stopping => "stopping",
            LongControlState::Starting => "starting",
        }
    }
}

/// Actuator targets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Actuators {
    pub gas: f32,
    pub brake: f32,
    /// Target speed (m/s)
    pub speed: f32,
    /// Target acceleration (m/s^2)
    pub accel: f32,
    pub long_control_state: LongControlState,
}

/// Cruise-control button requests
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CruiseControl {
    pub cancel: bool,
    pub resume: bool,
    #[serde(rename = "override")]
    pub override_: bool,
}

/// The structured command produced by a maneuver for one tick
///
/// `CarControl::default()` is the neutral, disabled intent used while
/// stabilizing the vehicle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CarControl {
    pub enabled: bool,
    pub lat_active: bool,
    pub long_active: bool,
    pub actuators: Actuators,
    pub cruise_control: CruiseControl,
}

impl CarControl {
    /// Enabled longitudinal-only control with the given actuator targets
    pub fn longitudinal(actuators: Actuators) -> Self {
        Self {
            enabled: true,
            lat_active: false,
            long_active: true,
            actuators,
            cruise_control: CruiseControl::default(),
        }
    }
}

impl Traced for CarControl {
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor {
            path: "carControl.enabled",
            read: |c| c.enabled.into(),
        },
        FieldDescriptor {
            path: "carControl.latActive",
            read: |c| c.lat_active.into(),
        },
        FieldDescriptor {
            path: "carControl.longActive",
            read: |c| c.long_active.into(),
        },
        FieldDescriptor {
            path: "carControl.actuators.gas",
            read: |c| c.actuators.gas.into(),
        },
        FieldDescriptor {
            path: "carControl.actuators.brake",
            read: |c| c.actuators.brake.into(),
        },
        FieldDescriptor {
            path: "carControl.actuators.speed",
            read: |c| c.actuators.speed.into(),
        },
        FieldDescriptor {
            path: "carControl.actuators.accel",
            read: |c| c.actuators.accel.into(),
        },
        FieldDescriptor {
            path: "carControl.actuators.longControlState",
            read: |c| SampleValue::Text(c.actuators.long_control_state.as_str().to_string()),
        },
        FieldDescriptor {
            path: "carControl.cruiseControl.cancel",
            read: |c| c.cruise_control.cancel.into(),
        },
        FieldDescriptor {
            path: "carControl.cruiseControl.resume",
            read: |c| c.cruise_control.resume.into(),
        },
        FieldDescriptor {
            path: "carControl.cruiseControl.override",
            read: |c| c.cruise_control.override_.into(),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_neutral() {
        let cc = CarControl::default();
        assert!(!cc.enabled);
        assert!(!cc.long_active);
        assert_eq!(cc.actuators.accel, 0.0);
        assert_eq!(cc.actuators.long_control_state, LongControlState::Off);
    }

    #[test]
    fn test_flatten_paths() {
        let cc = CarControl::longitudinal(Actuators {
            accel: 1.25,
            long_control_state: LongControlState::Pid,
            ..Default::default()
        });
        let fields = cc.flatten();
        assert_eq!(fields.len(), CarControl::FIELDS.len());
        assert!(fields.contains(&("carControl.enabled", SampleValue::Bool(true))));
        assert!(fields.contains(&("carControl.actuators.accel", SampleValue::Float(1.25))));
        assert!(fields.contains(&(
            "carControl.actuators.longControlState",
            SampleValue::Text("pid".to_string())
        )));
    }
}
