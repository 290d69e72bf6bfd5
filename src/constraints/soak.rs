//! Soak lag between operations of the same job.

use super::Constraint;
use crate::models::metadata::{keys, seconds_of};
use crate::models::{Operation, Resource, Timestamp};
use crate::schedule::Schedule;

/// An operation declaring a soak lag starts at least that long after the
/// latest same-job operation that finished at or before its start.
///
/// The lag is read from `soak_seconds`, `soak_minutes` or `soak_hours`,
/// checked in that order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoakConstraint;

impl SoakConstraint {
    /// Creates the rule.
    pub fn new() -> Self {
        Self
    }

    /// Declared soak lag in seconds, if positive.
    pub fn soak_secs(op: &Operation) -> Option<i64> {
        seconds_of(&op.metadata, keys::SOAK_SECONDS, 1.0)
            .or_else(|| seconds_of(&op.metadata, keys::SOAK_MINUTES, 60.0))
            .or_else(|| seconds_of(&op.metadata, keys::SOAK_HOURS, 3600.0))
            .filter(|&s| s > 0)
    }

    fn latest_prior_end(schedule: &Schedule, op: &Operation, t: Timestamp) -> Option<Timestamp> {
        schedule
            .operations_of_job(&op.job_id)
            .filter(|o| o.id != op.id)
            .filter_map(|o| o.end)
            .filter(|&e| e <= t)
            .max()
    }

    /// Whether a same-job operation ending at `end` would cut the lag of a
    /// committed soaking operation short.
    ///
    /// Any end in `(x.start - lag, x.start]` becomes the latest prior end
    /// of `x` once committed, since the current one already honours the lag.
    fn breaks_committed_soak(schedule: &Schedule, op: &Operation, end: Timestamp) -> bool {
        schedule
            .operations_of_job(&op.job_id)
            .filter(|x| x.id != op.id)
            .any(|x| {
                let (Some(x_start), Some(lag)) = (x.start, Self::soak_secs(x)) else {
                    return false;
                };
                x_start >= end && x_start < end + lag
            })
    }
}

impl Constraint for SoakConstraint {
    fn name(&self) -> &'static str {
        "soak"
    }

    fn is_feasible(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        start: Timestamp,
        end: Timestamp,
    ) -> bool {
        if Self::breaks_committed_soak(schedule, op, end) {
            return false;
        }
        let Some(soak) = Self::soak_secs(op) else {
            return true;
        };
        Self::latest_prior_end(schedule, op, start).map_or(true, |prior| start >= prior + soak)
    }

    fn adjust_earliest_start(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        earliest: Timestamp,
    ) -> Timestamp {
        let Some(soak) = Self::soak_secs(op) else {
            return earliest;
        };
        Self::latest_prior_end(schedule, op, earliest)
            .map_or(earliest, |prior| earliest.max(prior + soak))
    }
}
