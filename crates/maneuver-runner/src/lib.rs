//! maneuver-runner - Maneuver execution engine
//!
//! Runs scripted longitudinal maneuvers against a vehicle on a bus and
//! records what happened:
//!
//! ```text
//!             ┌──────────── Session (safety scope) ────────────┐
//!             │                                                │
//! Fingerprinter ─▶ CarInterface ◀─▶ ControlLoop ◀─ Maneuver/Script
//!             │         ▲               │                      │
//!             │         │               ▼                      │
//!             │   TransportAdapter    Trace ─▶ TraceBook ──────┼─▶ ReportBuilder
//!             └────────────────────────────────────────────────┘
//! ```
//!
//! The session enters the passive mode, fingerprints and initializes the
//! vehicle, enters the active mode and runs every maneuver at a fixed rate.
//! The device is disabled again on every exit path. Traces land in a
//! caller-owned [`TraceBook`] so that partial results can be reported even
//! when the session fails.

pub mod car;
pub mod config;
pub mod control_loop;
pub mod error;
pub mod maneuver;
pub mod report;
pub mod script;
pub mod session;
pub mod trace;

pub use car::{CarInterface, FingerprintError, Fingerprinter};
pub use config::{HarnessConfig, ManeuverConfig, ReportConfig, TimingConfig};
pub use control_loop::{ControlLoop, RunSummary};
pub use error::{ConfigError, ManeuverError, Phase, ReportError, SessionError, TraceSchemaError};
pub use maneuver::{default_maneuvers, Maneuver, ManeuverId, SetupCondition};
pub use report::{export_json, ReportBuilder};
pub use script::{Breakpoint, Script};
pub use session::Session;
pub use trace::{ManeuverRun, RunStatus, Trace, TraceBook};
