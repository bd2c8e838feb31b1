//! Safety mode control
//!
//! The bus device's operating mode is owned by a [`SafetyModeController`].
//! Non-disabled modes are only entered through a [`SafetyScope`], which puts
//! the device back into `Disabled` exactly once when the scope ends, whether
//! it ends normally, through an error, a panic, or a dropped future.

mod controller;

pub use controller::{SafetyModeController, SafetyScope};
