//! Job model.
//!
//! A job is an ordered group of operations sharing metadata. It owns its
//! operations exclusively; resources only refer to them by ID.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1

use serde::{Deserialize, Serialize};

use super::metadata::{keys, MetaValue, Metadata};
use super::{Operation, Timestamp};

/// A job to be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// Operations in job order.
    pub operations: Vec<Operation>,
    /// Job-level metadata (e.g. `job_type`, `due_date`).
    pub metadata: Metadata,
}

impl Job {
    /// Creates an empty job.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operations: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Adds an operation. Its `job_id` is overwritten with this job's ID.
    pub fn with_operation(mut self, mut op: Operation) -> Self {
        op.job_id = self.id.clone();
        self.operations.push(op);
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the `due_date` metadata.
    pub fn with_due_date(mut self, due: Timestamp) -> Self {
        self.metadata
            .insert(keys::DUE_DATE.to_string(), MetaValue::Time(due));
        self
    }

    /// Deadline from `due_date` metadata.
    pub fn due_date(&self) -> Option<Timestamp> {
        self.metadata
            .get(keys::DUE_DATE)
            .and_then(MetaValue::as_timestamp)
    }

    /// Looks up an owned operation.
    pub fn operation(&self, op_id: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.id == op_id)
    }

    /// Whether every operation is scheduled.
    pub fn is_complete(&self) -> bool {
        self.operations.iter().all(Operation::is_scheduled)
    }

    /// Earliest committed start.
    pub fn start_time(&self) -> Option<Timestamp> {
        self.operations.iter().filter_map(|o| o.start).min()
    }

    /// Latest committed end.
    pub fn end_time(&self) -> Option<Timestamp> {
        self.operations.iter().filter_map(|o| o.end).max()
    }

    /// Span from first start to last end of committed operations (seconds).
    pub fn makespan(&self) -> Option<i64> {
        Some(self.end_time()? - self.start_time()?)
    }

    /// Sum of base operation durations (seconds).
    pub fn total_duration(&self) -> i64 {
        self.operations.iter().map(|o| o.duration_secs).sum()
    }

    /// Committed operations.
    pub fn scheduled_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|o| o.is_scheduled())
    }

    /// Operations without a committed slot.
    pub fn unscheduled_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|o| !o.is_scheduled())
    }
}
