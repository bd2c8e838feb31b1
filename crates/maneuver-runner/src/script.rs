//! Maneuver scripts: tick index to control intent

use std::fmt;
use std::sync::Arc;

use maneuver_core::{Actuators, CarControl, LongControlState};
use serde::{Deserialize, Serialize};

/// A point of a piecewise-linear acceleration profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Time since the first scripted tick (s)
    pub t: f64,
    /// Commanded acceleration (m/s^2)
    pub accel: f32,
}

/// Function from tick index to control intent
///
/// Scripts are pure in the tick index, so a maneuver can be re-run and
/// produce the same intents.
#[derive(Clone)]
pub enum Script {
    /// Enabled longitudinal control with every actuator at zero
    Idle,
    /// Piecewise-linear acceleration command; repeated times form steps
    AccelProfile(Vec<Breakpoint>),
    /// Arbitrary pure function of the tick index
    Custom(Arc<dyn Fn(u32) -> CarControl + Send + Sync>),
}

impl Script {
    pub fn idle() -> Self {
        Script::Idle
    }

    /// Profile from `(t, accel)` pairs; pairs are ordered by time
    pub fn accel_profile(points: impl IntoIterator<Item = (f64, f32)>) -> Self {
        let mut points: Vec<Breakpoint> = points
            .into_iter()
            .map(|(t, accel)| Breakpoint { t, accel })
            .collect();
        points.sort_by(|a, b| a.t.total_cmp(&b.t));
        Script::AccelProfile(points)
    }

    pub fn from_fn(f: impl Fn(u32) -> CarControl + Send + Sync + 'static) -> Self {
        Script::Custom(Arc::new(f))
    }

    /// Intent for `tick`, where ticks are `tick_period_s` apart
    pub fn intent(&self, tick: u32, tick_period_s: f64) -> CarControl {
        match self {
            Script::Idle => CarControl::longitudinal(Actuators::default()),
            Script::AccelProfile(points) => {
                let accel = interpolate(points, f64::from(tick) * tick_period_s);
                CarControl::longitudinal(Actuators {
                    accel,
                    long_control_state: LongControlState::Pid,
                    ..Default::default()
                })
            }
            Script::Custom(f) => f(tick),
        }
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Script::Idle => f.write_str("Idle"),
            Script::AccelProfile(points) => f.debug_tuple("AccelProfile").field(points).finish(),
            Script::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn interpolate(points: &[Breakpoint], t: f64) -> f32 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };
    if t <= first.t {
        return first.accel;
    }
    if t >= last.t {
        return last.accel;
    }

    // The last segment starting at or before `t` wins, which turns repeated
    // times into steps.
    let mut value = first.accel;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t < a.t {
            break;
        }
        value = if b.t > a.t && t < b.t {
            let frac = (t - a.t) / (b.t - a.t);
            a.accel + (b.accel - a.accel) * frac as f32
        } else {
            b.accel
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.01;

    #[test]
    fn test_idle_matches_default_intent() {
        let cc = Script::idle().intent(42, DT);
        assert!(cc.enabled);
        assert!(cc.long_active);
        assert!(!cc.lat_active);
        assert_eq!(cc.actuators, Actuators::default());
    }

    #[test]
    fn test_profile_interpolates_and_clamps() {
        let script = Script::accel_profile([(0.0, 0.0), (1.0, 2.0)]);
        assert_eq!(script.intent(0, DT).actuators.accel, 0.0);
        assert!((script.intent(50, DT).actuators.accel - 1.0).abs() < 1e-4);
        assert_eq!(script.intent(150, DT).actuators.accel, 2.0);
        assert_eq!(
            script.intent(50, DT).actuators.long_control_state,
            LongControlState::Pid
        );
    }

    #[test]
    fn test_profile_repeated_time_is_a_step() {
        let script = Script::accel_profile([(0.0, 0.0), (0.5, 0.0), (0.5, -1.0), (1.0, -1.0)]);
        assert_eq!(script.intent(49, DT).actuators.accel, 0.0);
        assert_eq!(script.intent(50, DT).actuators.accel, -1.0);
        assert_eq!(script.intent(75, DT).actuators.accel, -1.0);
    }

    #[test]
    fn test_profile_points_are_sorted() {
        let script = Script::accel_profile([(1.0, 2.0), (0.0, 0.0)]);
        match &script {
            Script::AccelProfile(points) => assert_eq!(points[0].t, 0.0),
            other => panic!("unexpected script {:?}", other),
        }
    }

    #[test]
    fn test_scripts_are_deterministic() {
        let scripts = vec![
            Script::idle(),
            Script::accel_profile([(0.0, 0.5), (0.3, -0.5), (0.6, 1.0)]),
            Script::from_fn(|tick| {
                CarControl::longitudinal(Actuators {
                    accel: if tick % 2 == 0 { 1.0 } else { -1.0 },
                    ..Default::default()
                })
            }),
        ];
        for script in &scripts {
            for tick in [0, 1, 17, 99] {
                assert_eq!(script.intent(tick, DT), script.intent(tick, DT));
            }
        }
    }
}
