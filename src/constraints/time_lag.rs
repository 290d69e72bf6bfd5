//! Minimum and maximum waits after predecessors.

use super::{latest_predecessor_end, Constraint};
use crate::models::metadata::{keys, seconds_of};
use crate::models::{Operation, Resource, Timestamp};
use crate::schedule::Schedule;

/// Metadata-driven lag after the latest committed predecessor end.
///
/// Reads `min_delay_seconds` (start pushed at least that far past the
/// predecessor) and `max_delay_seconds` (start must not be later than
/// that). Operations without these keys or without committed
/// predecessors are unconstrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeLagConstraint;

impl TimeLagConstraint {
    /// Creates the rule.
    pub fn new() -> Self {
        Self
    }
}

impl Constraint for TimeLagConstraint {
    fn name(&self) -> &'static str {
        "time_lag"
    }

    fn is_feasible(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        start: Timestamp,
        _end: Timestamp,
    ) -> bool {
        let Some(max_delay) = seconds_of(&op.metadata, keys::MAX_DELAY_SECONDS, 1.0) else {
            return true;
        };
        latest_predecessor_end(schedule, op).map_or(true, |pred_end| start <= pred_end + max_delay)
    }

    fn latest_start(&self, schedule: &Schedule, op: &Operation) -> Option<Timestamp> {
        let max_delay = seconds_of(&op.metadata, keys::MAX_DELAY_SECONDS, 1.0)?;
        latest_predecessor_end(schedule, op).map(|e| e + max_delay)
    }

    fn adjust_earliest_start(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        earliest: Timestamp,
    ) -> Timestamp {
        let Some(min_delay) = seconds_of(&op.metadata, keys::MIN_DELAY_SECONDS, 1.0) else {
            return earliest;
        };
        latest_predecessor_end(schedule, op).map_or(earliest, |pred_end| {
            earliest.max(pred_end + min_delay)
        })
    }
}
