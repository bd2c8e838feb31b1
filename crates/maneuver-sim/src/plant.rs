//! Longitudinal vehicle dynamics
//!
//! A first-order lag from the acceleration target to the actual
//! acceleration, integrated into a non-negative speed. The target comes from
//! the harness when it is engaged and otherwise from the built-in cruise
//! system or a simple driver model that brakes to a stop.

use serde::{Deserialize, Serialize};

/// Largest integration step; longer intervals are split (s)
const MAX_STEP_S: f64 = 0.01;
/// Remainders shorter than this are dropped (s)
const MIN_STEP_S: f64 = 1e-6;
/// Proportional gain of the cruise speed controller (1/s)
const CRUISE_GAIN: f32 = 0.5;
/// Acceleration limit of the cruise system (m/s^2)
const CRUISE_ACCEL_LIMIT: f32 = 1.0;
/// Deceleration the driver model uses to come to a stop (m/s^2)
const DRIVER_BRAKE: f32 = -1.5;
/// Speed below which the vehicle is at a standstill (m/s)
const STANDSTILL_SPEED: f32 = 0.01;

/// Initial conditions and dynamics of the simulated vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    /// Speed at start (m/s)
    #[serde(default)]
    pub initial_speed: f32,
    /// Cruise set speed; cruise starts engaged when present (m/s)
    #[serde(default)]
    pub cruise_set_speed: Option<f32>,
    /// Time constant of the acceleration response (s)
    #[serde(default = "default_tau_s")]
    pub tau_s: f32,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            initial_speed: 0.0,
            cruise_set_speed: None,
            tau_s: default_tau_s(),
        }
    }
}

fn default_tau_s() -> f32 {
    0.3
}

/// Where the acceleration target comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Demand {
    /// Harness command (m/s^2)
    Commanded(f32),
    /// Cruise system or driver
    Vehicle,
}

#[derive(Debug, Clone)]
pub struct Plant {
    tau_s: f32,
    speed: f32,
    accel: f32,
    cruise_enabled: bool,
    cruise_set_speed: f32,
    brake_pressed: bool,
}

impl Plant {
    pub fn new(config: &PlantConfig) -> Self {
        Self {
            tau_s: config.tau_s.max(0.01),
            speed: config.initial_speed.max(0.0),
            accel: 0.0,
            cruise_enabled: config.cruise_set_speed.is_some(),
            cruise_set_speed: config.cruise_set_speed.unwrap_or(0.0),
            brake_pressed: false,
        }
    }

    /// Advance the dynamics by `dt_s` seconds
    pub fn step(&mut self, dt_s: f64, demand: Demand) {
        let mut remaining = dt_s;
        while remaining > MIN_STEP_S {
            let dt = remaining.min(MAX_STEP_S) as f32;
            remaining -= f64::from(dt);
            let target = self.target(demand);
            self.brake_pressed = demand == Demand::Vehicle && !self.cruise_enabled && self.speed > 0.0;
            self.accel += (target - self.accel) * (dt / self.tau_s).min(1.0);
            self.speed = (self.speed + self.accel * dt).max(0.0);
            if self.speed == 0.0 && self.accel < 0.0 {
                self.accel = 0.0;
            }
        }
    }

    fn target(&self, demand: Demand) -> f32 {
        match demand {
            Demand::Commanded(accel) => accel,
            Demand::Vehicle if self.cruise_enabled => (CRUISE_GAIN
                * (self.cruise_set_speed - self.speed))
                .clamp(-CRUISE_ACCEL_LIMIT, CRUISE_ACCEL_LIMIT),
            Demand::Vehicle if self.speed > 0.0 => DRIVER_BRAKE,
            Demand::Vehicle => 0.0,
        }
    }

    /// Disengage the cruise system
    pub fn cancel_cruise(&mut self) {
        self.cruise_enabled = false;
    }

    /// Re-engage the cruise system at the current speed
    pub fn resume_cruise(&mut self) {
        self.cruise_enabled = true;
        self.cruise_set_speed = self.speed;
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn accel(&self) -> f32 {
        self.accel
    }

    pub fn standstill(&self) -> bool {
        self.speed < STANDSTILL_SPEED
    }

    pub fn brake_pressed(&self) -> bool {
        self.brake_pressed
    }

    pub fn cruise_enabled(&self) -> bool {
        self.cruise_enabled
    }

    pub fn cruise_set_speed(&self) -> f32 {
        self.cruise_set_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_order_response() {
        let mut plant = Plant::new(&PlantConfig::default());
        plant.step(0.3, Demand::Commanded(1.0));
        // One time constant reaches roughly 63% of the target
        assert!((plant.accel() - 0.63).abs() < 0.05, "accel {}", plant.accel());
        plant.step(3.0, Demand::Commanded(1.0));
        assert!((plant.accel() - 1.0).abs() < 0.01);
        assert!(plant.speed() > 2.0);
    }

    #[test]
    fn test_speed_never_negative() {
        let mut plant = Plant::new(&PlantConfig {
            initial_speed: 0.5,
            ..Default::default()
        });
        plant.step(5.0, Demand::Commanded(-3.0));
        assert_eq!(plant.speed(), 0.0);
        assert_eq!(plant.accel(), 0.0);
        assert!(plant.standstill());
    }

    #[test]
    fn test_cruise_holds_set_speed() {
        let mut plant = Plant::new(&PlantConfig {
            initial_speed: 8.94,
            cruise_set_speed: Some(8.94),
            ..Default::default()
        });
        plant.step(3.0, Demand::Vehicle);
        assert!((plant.speed() - 8.94).abs() < 0.01);
        assert!(plant.accel().abs() < 0.01);
        assert!(!plant.brake_pressed());
    }

    #[test]
    fn test_driver_brakes_to_stop_without_cruise() {
        let mut plant = Plant::new(&PlantConfig {
            initial_speed: 2.0,
            ..Default::default()
        });
        plant.step(0.1, Demand::Vehicle);
        assert!(plant.brake_pressed());
        plant.step(5.0, Demand::Vehicle);
        assert!(plant.standstill());
    }
}
