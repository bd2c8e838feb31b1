//! Static field descriptors for flattening records into traces

use std::fmt;

use serde::{Deserialize, Serialize};

/// One sampled value in a trace column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Bool(bool),
    Float(f64),
    Text(String),
}

/// Type of a trace column, taken from its first sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Bool,
    Float,
    Text,
}

impl SampleValue {
    pub fn kind(&self) -> SampleKind {
        match self {
            SampleValue::Bool(_) => SampleKind::Bool,
            SampleValue::Float(_) => SampleKind::Float,
            SampleValue::Text(_) => SampleKind::Text,
        }
    }

    /// Numeric view used for plotting; booleans map to 0.0 / 1.0
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            SampleValue::Float(v) => Some(*v),
            SampleValue::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SampleValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for SampleValue {
    fn from(value: bool) -> Self {
        SampleValue::Bool(value)
    }
}

impl From<f32> for SampleValue {
    fn from(value: f32) -> Self {
        SampleValue::Float(f64::from(value))
    }
}

impl From<f64> for SampleValue {
    fn from(value: f64) -> Self {
        SampleValue::Float(value)
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Bool(b) => write!(f, "{}", b),
            SampleValue::Float(v) => write!(f, "{}", v),
            SampleValue::Text(s) => f.write_str(s),
        }
    }
}

/// A named, dotted path into a record plus its accessor
pub struct FieldDescriptor<T> {
    /// Dotted path, e.g. `carState.aEgo`
    pub path: &'static str,
    pub read: fn(&T) -> SampleValue,
}

/// Records whose named fields are tracked in traces
///
/// The field list is static so that the set of trace columns is known before
/// the first tick and never re-derived per sample.
pub trait Traced: Sized + 'static {
    const FIELDS: &'static [FieldDescriptor<Self>];

    /// Read every tracked field of this record
    fn flatten(&self) -> Vec<(&'static str, SampleValue)> {
        Self::FIELDS
            .iter()
            .map(|field| (field.path, (field.read)(self)))
            .collect()
    }
}
