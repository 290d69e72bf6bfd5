//! Sequence-dependent changeover gaps.
//!
//! When two consecutive bookings on a resource carry different keys, a
//! fixed gap must separate them. The key is read from job metadata,
//! operation metadata, or the resource of a given type assigned to the
//! operation (e.g. "which vehicle is on this site").

use serde::{Deserialize, Serialize};

use super::{Constraint, ResourceTypeFilter};
use crate::models::metadata::keys;
use crate::models::{MetaValue, Operation, Resource, Timestamp};
use crate::schedule::Schedule;

/// Where the changeover key comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeoverKey {
    /// Job metadata field.
    JobMeta(String),
    /// Operation metadata field.
    OperationMeta(String),
    /// First assigned resource of this resource type.
    AssignedResource(String),
}

impl Default for ChangeoverKey {
    fn default() -> Self {
        ChangeoverKey::JobMeta(keys::JOB_TYPE.to_string())
    }
}

/// Enforces a gap between bookings whose keys differ.
///
/// Operations with no key never trigger a changeover.
#[derive(Debug, Clone)]
pub struct ChangeoverConstraint {
    gap_secs: i64,
    key: ChangeoverKey,
    filter: ResourceTypeFilter,
}

impl ChangeoverConstraint {
    /// Creates a changeover rule keyed on job `job_type`.
    pub fn new(gap_secs: i64) -> Self {
        Self {
            gap_secs,
            key: ChangeoverKey::default(),
            filter: ResourceTypeFilter::any(),
        }
    }

    /// Creates a changeover rule from a gap in minutes.
    pub fn from_minutes(minutes: f64) -> Self {
        Self::new((minutes * 60.0).round() as i64)
    }

    /// Sets the key source.
    pub fn with_key(mut self, key: ChangeoverKey) -> Self {
        self.key = key;
        self
    }

    /// Restricts the rule to some resource types.
    pub fn with_filter(mut self, filter: ResourceTypeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Gap in seconds.
    pub fn gap_secs(&self) -> i64 {
        self.gap_secs
    }

    fn key_of(&self, schedule: &Schedule, op: &Operation) -> Option<String> {
        match &self.key {
            ChangeoverKey::JobMeta(field) => schedule
                .job(&op.job_id)
                .and_then(|j| j.metadata.get(field))
                .and_then(key_text),
            ChangeoverKey::OperationMeta(field) => op.metadata.get(field).and_then(key_text),
            ChangeoverKey::AssignedResource(rtype) => op.assignment.first(rtype).map(str::to_string),
        }
    }

    fn requires_gap(&self, schedule: &Schedule, a: &Operation, b: &Operation) -> bool {
        match (self.key_of(schedule, a), self.key_of(schedule, b)) {
            (Some(ka), Some(kb)) => ka != kb,
            _ => false,
        }
    }

    fn inactive_on(&self, resource: &Resource) -> bool {
        self.gap_secs <= 0 || resource.operation_count() == 0 || !self.filter.applies_to(resource)
    }
}

fn key_text(v: &MetaValue) -> Option<String> {
    match v {
        MetaValue::Text(s) if !s.is_empty() => Some(s.clone()),
        MetaValue::Text(_) => None,
        MetaValue::Number(n) => Some(n.to_string()),
        MetaValue::Seconds(n) | MetaValue::Time(n) => Some(n.to_string()),
        MetaValue::Ids(ids) if !ids.is_empty() => Some(ids.join(",")),
        MetaValue::Ids(_) => None,
    }
}

impl Constraint for ChangeoverConstraint {
    fn name(&self) -> &'static str {
        "changeover"
    }

    fn is_feasible(
        &self,
        schedule: &Schedule,
        op: &Operation,
        resource: &Resource,
        start: Timestamp,
        end: Timestamp,
    ) -> bool {
        if self.inactive_on(resource) {
            return true;
        }
        if let Some(prev) = resource.previous_before(start) {
            if let Some(prev_op) = schedule.operation(prev.operation_id) {
                if self.requires_gap(schedule, prev_op, op)
                    && start < prev.window.end + self.gap_secs
                {
                    return false;
                }
            }
        }
        if let Some(next) = resource.next_at_or_after(start) {
            if let Some(next_op) = schedule.operation(next.operation_id) {
                if self.requires_gap(schedule, op, next_op)
                    && end + self.gap_secs > next.window.start
                {
                    return false;
                }
            }
        }
        true
    }

    fn adjust_earliest_start(
        &self,
        schedule: &Schedule,
        op: &Operation,
        resource: &Resource,
        earliest: Timestamp,
    ) -> Timestamp {
        if self.inactive_on(resource) {
            return earliest;
        }
        resource
            .previous_before(earliest)
            .and_then(|prev| {
                let prev_op = schedule.operation(prev.operation_id)?;
                self.requires_gap(schedule, prev_op, op)
                    .then_some(prev.window.end + self.gap_secs)
            })
            .map_or(earliest, |bound| earliest.max(bound))
    }
}
