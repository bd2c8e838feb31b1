//! Runner errors

use std::fmt;
use std::path::PathBuf;

use maneuver_bus::TransportError;
use maneuver_core::{DecodeError, EncodeError};
use thiserror::Error;

use crate::car::FingerprintError;

/// Field-set drift or ordering violation while logging a trace
///
/// Indicates a logic error in a record's field list, not an environment
/// fault.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TraceSchemaError {
    #[error("Trace field set changed at tick {tick}: missing {missing:?}, unexpected {unexpected:?}")]
    FieldMismatch {
        tick: u32,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Duplicate trace field '{path}' at tick {tick}")]
    DuplicateField { tick: u32, path: String },

    #[error("Tick {tick} logged after tick {last}")]
    OutOfOrder { tick: u32, last: u32 },
}

/// Which part of a maneuver run a tick belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stabilization,
    Scripted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Stabilization => f.write_str("stabilization"),
            Phase::Scripted => f.write_str("scripted"),
        }
    }
}

/// Fatal failure of a single maneuver run
#[derive(Debug, Error)]
pub enum ManeuverError {
    #[error("Transport error during {phase} tick {tick}: {source}")]
    Transport {
        phase: Phase,
        tick: u32,
        #[source]
        source: TransportError,
    },

    #[error("Decode error during {phase} tick {tick}: {source}")]
    Decode {
        phase: Phase,
        tick: u32,
        #[source]
        source: DecodeError,
    },

    #[error("Encode error during {phase} tick {tick}: {source}")]
    Encode {
        phase: Phase,
        tick: u32,
        #[source]
        source: EncodeError,
    },

    #[error("Trace schema error: {0}")]
    TraceSchema(#[from] TraceSchemaError),

    #[error("Stop requested before {phase} tick {tick}")]
    Cancelled { phase: Phase, tick: u32 },
}

impl ManeuverError {
    /// Tick at which the run stopped, if it stopped on a tick
    pub fn tick(&self) -> Option<u32> {
        match self {
            ManeuverError::Transport { tick, .. }
            | ManeuverError::Decode { tick, .. }
            | ManeuverError::Encode { tick, .. }
            | ManeuverError::Cancelled { tick, .. } => Some(*tick),
            ManeuverError::TraceSchema(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ManeuverError::Cancelled { .. })
    }
}

/// Top-level session failure
///
/// By the time one of these is returned the bus device is back in the
/// disabled mode.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Maneuver '{description}' failed: {source}")]
    Maneuver {
        description: String,
        #[source]
        source: ManeuverError,
    },
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Report and trace export errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize traces: {0}")]
    Json(#[from] serde_json::Error),
}
