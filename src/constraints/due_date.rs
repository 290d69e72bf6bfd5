//! Job deadlines.

use std::collections::HashMap;

use super::Constraint;
use crate::models::{Operation, Resource, Timestamp};
use crate::schedule::Schedule;

/// No operation may end after its job's deadline.
///
/// The deadline comes from the explicit override map first, then from the
/// job's `due_date` metadata. Jobs without either are unconstrained.
#[derive(Debug, Clone)]
pub struct DueDateConstraint {
    due_dates: HashMap<String, Timestamp>,
    strict: bool,
}

impl Default for DueDateConstraint {
    fn default() -> Self {
        Self::new()
    }
}

impl DueDateConstraint {
    /// Strict rule reading job metadata only.
    pub fn new() -> Self {
        Self {
            due_dates: HashMap::new(),
            strict: true,
        }
    }

    /// Overrides the deadline of one job.
    pub fn with_due_date(mut self, job_id: impl Into<String>, due: Timestamp) -> Self {
        self.due_dates.insert(job_id.into(), due);
        self
    }

    /// Non-strict rules never veto.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Effective deadline for a job.
    pub fn due_date_of(&self, schedule: &Schedule, job_id: &str) -> Option<Timestamp> {
        self.due_dates
            .get(job_id)
            .copied()
            .or_else(|| schedule.job(job_id).and_then(|j| j.due_date()))
    }
}

impl Constraint for DueDateConstraint {
    fn name(&self) -> &'static str {
        "due_date"
    }

    fn is_feasible(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        _start: Timestamp,
        end: Timestamp,
    ) -> bool {
        if !self.strict {
            return true;
        }
        self.due_date_of(schedule, &op.job_id)
            .map_or(true, |due| end <= due)
    }

    /// Due date minus the base duration; adjustments only lengthen it.
    fn latest_start(&self, schedule: &Schedule, op: &Operation) -> Option<Timestamp> {
        if !self.strict {
            return None;
        }
        self.due_date_of(schedule, &op.job_id)
            .map(|due| due - op.duration_secs)
    }
}
