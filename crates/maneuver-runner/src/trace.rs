//! Per-maneuver traces and the session trace book

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use maneuver_core::{CarControl, CarState, SampleKind, SampleValue, Traced};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TraceSchemaError;
use crate::maneuver::{ManeuverId, SetupCondition};

/// One trace column: a dotted field path and its samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub path: String,
    pub values: Vec<SampleValue>,
}

/// Append-only record of one maneuver run
///
/// The field set is fixed by the first record; every column has exactly
/// one value per entry in `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    tick_period_s: f64,
    t: Vec<u32>,
    columns: Vec<Column>,
}

impl Trace {
    pub fn new(tick_period_s: f64) -> Self {
        Self {
            tick_period_s,
            t: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Record the intent sent and the state observed on `tick`
    pub fn log(
        &mut self,
        tick: u32,
        control: &CarControl,
        state: &CarState,
    ) -> Result<(), TraceSchemaError> {
        let mut fields = control.flatten();
        fields.extend(state.flatten());
        self.record(tick, fields)
    }

    /// Append one sample per field
    ///
    /// Fails without appending anything when the tick does not follow the
    /// last one or the field set differs from the first record.
    pub fn record(
        &mut self,
        tick: u32,
        fields: Vec<(&str, SampleValue)>,
    ) -> Result<(), TraceSchemaError> {
        if let Some(&last) = self.t.last() {
            if tick <= last {
                return Err(TraceSchemaError::OutOfOrder { tick, last });
            }
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for (path, _) in &fields {
            if !seen.insert(*path) {
                return Err(TraceSchemaError::DuplicateField {
                    tick,
                    path: path.to_string(),
                });
            }
        }

        if self.t.is_empty() {
            self.columns = fields
                .into_iter()
                .map(|(path, value)| Column {
                    path: path.to_string(),
                    values: vec![value],
                })
                .collect();
            self.t.push(tick);
            return Ok(());
        }

        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !seen.contains(c.path.as_str()))
            .map(|c| c.path.clone())
            .collect();
        let unexpected: Vec<String> = fields
            .iter()
            .filter(|(path, _)| !self.columns.iter().any(|c| c.path == *path))
            .map(|(path, _)| path.to_string())
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(TraceSchemaError::FieldMismatch {
                tick,
                missing,
                unexpected,
            });
        }

        for (path, value) in fields {
            if let Some(column) = self.columns.iter_mut().find(|c| c.path == path) {
                column.values.push(value);
            }
        }
        self.t.push(tick);
        Ok(())
    }

    pub fn tick_period_s(&self) -> f64 {
        self.tick_period_s
    }

    /// Tick indices, in the order they were recorded
    pub fn t(&self) -> &[u32] {
        &self.t
    }

    /// Sample times in seconds since the first scripted tick
    pub fn times_s(&self) -> Vec<f64> {
        self.t
            .iter()
            .map(|&tick| f64::from(tick) * self.tick_period_s)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Tracked field paths in schema order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.path.as_str())
    }

    pub fn series(&self, path: &str) -> Option<&[SampleValue]> {
        self.columns
            .iter()
            .find(|c| c.path == path)
            .map(|c| c.values.as_slice())
    }

    /// Numeric view of a column; text samples become NaN
    pub fn floats(&self, path: &str) -> Option<Vec<f64>> {
        self.series(path).map(|values| {
            values
                .iter()
                .map(|v| v.as_f64().unwrap_or(f64::NAN))
                .collect()
        })
    }

    /// Paths whose samples are booleans
    pub fn boolean_fields(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.values.first().map(SampleValue::kind) == Some(SampleKind::Bool))
            .map(|c| c.path.as_str())
            .collect()
    }
}

/// How a maneuver run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// All scheduled ticks ran; `capped` when the sample cap cut the run short
    Completed { capped: bool, overruns: u32 },
    /// Stopped by an error or a stop request; the trace holds what was logged
    Aborted { tick: Option<u32>, reason: String },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed { .. })
    }
}

/// One maneuver run and its trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManeuverRun {
    pub id: ManeuverId,
    pub description: String,
    pub setup: SetupCondition,
    pub status: RunStatus,
    pub trace: Trace,
}

/// Every trace recorded during one session
///
/// Owned by the caller of the session so that partial results survive a
/// session error and can still be reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceBook {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Fingerprinted vehicle, once known
    pub vehicle: Option<String>,
    runs: Vec<ManeuverRun>,
}

impl Default for TraceBook {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceBook {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            vehicle: None,
            runs: Vec::new(),
        }
    }

    /// Id the next recorded run will get
    pub fn next_id(&self) -> ManeuverId {
        ManeuverId(self.runs.len())
    }

    pub fn push(&mut self, run: ManeuverRun) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[ManeuverRun] {
        &self.runs
    }

    pub fn get(&self, id: ManeuverId) -> Option<&ManeuverRun> {
        self.runs.iter().find(|run| run.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
