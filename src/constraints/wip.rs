//! Work-in-process cap.
//!
//! Counts distinct jobs with committed work at the same instant across
//! every resource, using a sweep over interval boundaries.
//!
//! Intervals are half-open: at a shared instant an ending interval is
//! released before a starting one is counted. A job stays active while
//! any of its intervals is open.

use std::collections::HashMap;

use super::Constraint;
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{Operation, Resource, Timestamp};
use crate::schedule::Schedule;

/// At most `max_wip` jobs may be in process at once.
#[derive(Debug, Clone, Copy)]
pub struct WipLimitConstraint {
    max_wip: usize,
}

impl WipLimitConstraint {
    /// Creates a WIP cap.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidWipLimit`] if `max_wip` is zero.
    pub fn new(max_wip: usize) -> ScheduleResult<Self> {
        if max_wip == 0 {
            return Err(ScheduleError::InvalidWipLimit(max_wip));
        }
        Ok(Self { max_wip })
    }

    /// The cap.
    pub fn max_wip(&self) -> usize {
        self.max_wip
    }

    /// Peak number of concurrent jobs with `[start, end)` for `job_id` added.
    pub fn peak_with(
        schedule: &Schedule,
        job_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> usize {
        // (time, delta, job); -1 sorts before +1 at equal times.
        let mut events: Vec<(Timestamp, i8, &str)> = Vec::new();
        for resource in schedule.resources() {
            for b in resource.bookings() {
                let Some(op) = schedule.operation(b.operation_id) else {
                    continue;
                };
                events.push((b.window.start, 1, op.job_id.as_str()));
                events.push((b.window.end, -1, op.job_id.as_str()));
            }
        }
        events.push((start, 1, job_id));
        events.push((end, -1, job_id));
        events.sort_unstable();

        let mut open: HashMap<&str, usize> = HashMap::new();
        let mut peak = 0;
        for (_, delta, job) in events {
            if delta > 0 {
                *open.entry(job).or_default() += 1;
            } else if let Some(n) = open.get_mut(job) {
                *n -= 1;
                if *n == 0 {
                    open.remove(job);
                }
            }
            peak = peak.max(open.len());
        }
        peak
    }
}

impl Constraint for WipLimitConstraint {
    fn name(&self) -> &'static str {
        "wip_limit"
    }

    fn is_feasible(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        start: Timestamp,
        end: Timestamp,
    ) -> bool {
        if start >= end {
            return false;
        }
        Self::peak_with(schedule, &op.job_id, start, end) <= self.max_wip
    }
}
