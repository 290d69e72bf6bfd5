//! Typed metadata values.
//!
//! Jobs and operations carry an open-ended `key → value` map that
//! constraints and dispatch rules read. Values are a closed set of variants
//! so readers pattern-match instead of guessing at types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Timestamp;

/// Metadata map attached to jobs and operations.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    /// Free text (e.g. a job type or a label).
    Text(String),
    /// Plain number (e.g. a priority bucket or an hour count).
    Number(f64),
    /// A duration in seconds.
    Seconds(i64),
    /// An absolute timestamp in seconds.
    Time(Timestamp),
    /// A list of identifiers.
    Ids(Vec<String>),
}

impl MetaValue {
    /// String view of text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of `Number`, `Seconds` and `Time` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            MetaValue::Seconds(s) | MetaValue::Time(s) => Some(*s as f64),
            _ => None,
        }
    }

    /// Timestamp view of `Time` values (and whole `Number`s).
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            MetaValue::Time(t) => Some(*t),
            MetaValue::Number(n) => Some(n.round() as Timestamp),
            _ => None,
        }
    }

    /// Identifier-list view.
    pub fn as_ids(&self) -> Option<&[String]> {
        match self {
            MetaValue::Ids(ids) => Some(ids),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        MetaValue::Number(n)
    }
}

impl From<i32> for MetaValue {
    fn from(n: i32) -> Self {
        MetaValue::Number(n as f64)
    }
}

/// Metadata keys recognized by the built-in constraints and rules.
pub mod keys {
    /// Job key used by the changeover rule's default configuration.
    pub const JOB_TYPE: &str = "job_type";
    /// Job deadline (`Time`) read by the due-date rule.
    pub const DUE_DATE: &str = "due_date";
    /// Operation priority bucket (`Number`, 1 = most important).
    pub const PRIORITY: &str = "priority";
    /// Soak lag in seconds (`Number`/`Seconds`).
    pub const SOAK_SECONDS: &str = "soak_seconds";
    /// Soak lag in minutes (`Number`).
    pub const SOAK_MINUTES: &str = "soak_minutes";
    /// Soak lag in hours (`Number`).
    pub const SOAK_HOURS: &str = "soak_hours";
    /// Minimum wait after predecessors, seconds.
    pub const MIN_DELAY_SECONDS: &str = "min_delay_seconds";
    /// Maximum wait after predecessors, seconds.
    pub const MAX_DELAY_SECONDS: &str = "max_delay_seconds";
}

/// Reads a seconds value stored either as `Seconds` or as a `Number`.
pub(crate) fn seconds_of(meta: &Metadata, key: &str, scale: f64) -> Option<i64> {
    meta.get(key)
        .and_then(MetaValue::as_f64)
        .map(|v| (v * scale).round() as i64)
}
