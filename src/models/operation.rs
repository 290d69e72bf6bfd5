//! Operation model.
//!
//! An operation is the smallest schedulable unit of work. It belongs to a
//! job, holds one or more resources for its duration, and may have to wait
//! for predecessor operations.
//!
//! # Resource Requirements
//!
//! Each [`ResourceRequirement`] names a resource type and the ordered set of
//! resource IDs that may satisfy it. An operation with two requirements
//! (e.g. a "site" and a "vehicle") must hold one resource of each at the
//! same time. Two requirements of the same type bind two distinct resources.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metadata::{keys, MetaValue, Metadata};
use super::{TimeWindow, Timestamp};

/// Priority bucket assumed when an operation has no `priority` metadata.
pub const DEFAULT_PRIORITY: f64 = 5.0;

/// An operation to be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier.
    pub id: String,
    /// Owning job identifier.
    pub job_id: String,
    /// Base processing time in seconds.
    pub duration_secs: i64,
    /// Resources held simultaneously while the operation runs.
    pub requirements: Vec<ResourceRequirement>,
    /// IDs of operations that must finish before this one starts.
    pub predecessors: Vec<String>,
    /// Domain-specific metadata read by constraints and rules.
    pub metadata: Metadata,
    /// Committed start time.
    pub start: Option<Timestamp>,
    /// Committed end time.
    pub end: Option<Timestamp>,
    /// Committed resources, by resource type.
    pub assignment: Assignment,
}

impl Operation {
    /// Creates a new, unscheduled operation.
    pub fn new(id: impl Into<String>, job_id: impl Into<String>, duration_secs: i64) -> Self {
        Self {
            id: id.into(),
            job_id: job_id.into(),
            duration_secs: duration_secs.max(0),
            requirements: Vec::new(),
            predecessors: Vec::new(),
            metadata: Metadata::new(),
            start: None,
            end: None,
            assignment: Assignment::new(),
        }
    }

    /// Adds a resource requirement.
    pub fn with_requirement(mut self, req: ResourceRequirement) -> Self {
        self.requirements.push(req);
        self
    }

    /// Adds a requirement for one resource of `resource_type` out of `candidates`.
    pub fn with_resource<I, S>(self, resource_type: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_requirement(ResourceRequirement::new(resource_type).with_candidates(candidates))
    }

    /// Adds a predecessor operation ID.
    pub fn with_predecessor(mut self, predecessor_id: impl Into<String>) -> Self {
        self.predecessors.push(predecessor_id.into());
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether both start and end are committed.
    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Committed interval, if scheduled.
    pub fn interval(&self) -> Option<TimeWindow> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(TimeWindow::new(s, e)),
            _ => None,
        }
    }

    /// Priority bucket from metadata (lower = more important).
    pub fn priority(&self) -> f64 {
        self.metadata
            .get(keys::PRIORITY)
            .and_then(MetaValue::as_f64)
            .unwrap_or(DEFAULT_PRIORITY)
    }

    /// Base duration in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration_secs as f64 / 3600.0
    }

    /// Whether any requirement asks for this resource type.
    pub fn requires_type(&self, resource_type: &str) -> bool {
        self.requirements
            .iter()
            .any(|r| r.resource_type == resource_type)
    }

    /// Returns all candidate resource IDs across all requirements.
    pub fn candidate_resources(&self) -> Vec<&str> {
        self.requirements
            .iter()
            .flat_map(|r| r.candidates.iter().map(|s| s.as_str()))
            .collect()
    }

    /// A copy of this operation carrying `assignment`, used to probe
    /// constraints before anything is committed.
    pub(crate) fn probe(&self, assignment: &Assignment) -> Self {
        let mut op = self.clone();
        op.assignment = assignment.clone();
        op
    }

    pub(crate) fn commit(&mut self, start: Timestamp, end: Timestamp, assignment: Assignment) {
        self.start = Some(start);
        self.end = Some(end);
        self.assignment = assignment;
    }

    pub(crate) fn clear_schedule(&mut self) {
        self.start = None;
        self.end = None;
        self.assignment = Assignment::new();
    }
}

/// A resource requirement for an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequirement {
    /// Required resource type (e.g., "site", "vehicle").
    pub resource_type: String,
    /// Resource IDs that can fulfil this requirement, in preference order.
    pub candidates: Vec<String>,
}

impl ResourceRequirement {
    /// Creates a requirement with no candidates yet.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            candidates: Vec::new(),
        }
    }

    /// Sets the candidate resource IDs (duplicates are dropped).
    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates.clear();
        for c in candidates {
            let c = c.into();
            if !self.candidates.contains(&c) {
                self.candidates.push(c);
            }
        }
        self
    }

    /// Whether `resource_id` may satisfy this requirement.
    pub fn allows(&self, resource_id: &str) -> bool {
        self.candidates.iter().any(|c| c == resource_id)
    }
}

/// Concrete resources bound to an operation, keyed by resource type.
///
/// Within a type, IDs appear in the order of the requirements of that type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    by_type: BTreeMap<String, Vec<String>>,
}

impl Assignment {
    /// Creates an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: binds one more resource of `resource_type`.
    pub fn with(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.push(resource_type, resource_id);
        self
    }

    /// Binds one more resource of `resource_type`.
    pub fn push(&mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) {
        self.by_type
            .entry(resource_type.into())
            .or_default()
            .push(resource_id.into());
    }

    /// Builds an assignment from one resource ID per requirement, in order.
    pub fn from_requirements(requirements: &[ResourceRequirement], ids: &[&str]) -> Self {
        let mut a = Self::new();
        for (req, id) in requirements.iter().zip(ids) {
            a.push(req.resource_type.clone(), *id);
        }
        a
    }

    /// Resources bound for a type.
    pub fn get(&self, resource_type: &str) -> &[String] {
        self.by_type
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First resource bound for a type.
    pub fn first(&self, resource_type: &str) -> Option<&str> {
        self.get(resource_type).first().map(String::as_str)
    }

    /// All bound resource IDs.
    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.by_type.values().flatten().map(String::as_str)
    }

    /// `(resource_type, resource_id)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_type
            .iter()
            .flat_map(|(t, ids)| ids.iter().map(move |id| (t.as_str(), id.as_str())))
    }

    /// Whether the resource is bound.
    pub fn contains(&self, resource_id: &str) -> bool {
        self.resource_ids().any(|id| id == resource_id)
    }

    /// Number of bound resources.
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_builder() {
        let op = Operation::new("T001", "VEHICLE_001", 7200)
            .with_resource("site", ["Site_1", "Site_2"])
            .with_resource("vehicle", ["VEHICLE_001"])
            .with_predecessor("T000")
            .with_metadata(keys::PRIORITY, 1)
            .with_metadata("test_type", "A");

        assert_eq!(op.id, "T001");
        assert_eq!(op.job_id, "VEHICLE_001");
        assert_eq!(op.requirements.len(), 2);
        assert_eq!(op.predecessors, vec!["T000"]);
        assert!((op.priority() - 1.0).abs() < 1e-10);
        assert!((op.duration_hours() - 2.0).abs() < 1e-10);
        assert!(op.requires_type("vehicle"));
        assert!(!op.requires_type("tank"));
        assert!(!op.is_scheduled());
    }

    #[test]
    fn test_negative_duration_clamped() {
        assert_eq!(Operation::new("O", "J", -5).duration_secs, 0);
    }

    #[test]
    fn test_default_priority() {
        let op = Operation::new("O1", "J1", 60);
        assert!((op.priority() - DEFAULT_PRIORITY).abs() < 1e-10);
    }

    #[test]
    fn test_commit_and_clear() {
        let mut op = Operation::new("O1", "J1", 60).with_resource("line", ["L1"]);
        op.commit(0, 60, Assignment::new().with("line", "L1"));
        assert!(op.is_scheduled());
        assert_eq!(op.interval(), Some(TimeWindow::new(0, 60)));
        assert_eq!(op.assignment.first("line"), Some("L1"));

        op.clear_schedule();
        assert!(!op.is_scheduled());
        assert!(op.assignment.is_empty());
    }

    #[test]
    fn test_requirement_dedup() {
        let req = ResourceRequirement::new("site").with_candidates(["S1", "S2", "S1"]);
        assert_eq!(req.candidates, vec!["S1", "S2"]);
        assert!(req.allows("S2"));
        assert!(!req.allows("S3"));
    }

    #[test]
    fn test_candidate_resources() {
        let op = Operation::new("O1", "J1", 0)
            .with_resource("Machine", ["M1", "M2"])
            .with_resource("Operator", ["W1"]);

        let candidates = op.candidate_resources();
        assert_eq!(candidates.len(), 3);
        assert!(candidates.contains(&"M1"));
        assert!(candidates.contains(&"W1"));
    }

    #[test]
    fn test_assignment_from_requirements() {
        let op = Operation::new("O1", "J1", 0)
            .with_resource("site", ["S1", "S2"])
            .with_resource("site", ["S3"])
            .with_resource("vehicle", ["V1"]);
        let a = Assignment::from_requirements(&op.requirements, &["S2", "S3", "V1"]);

        assert_eq!(a.get("site"), ["S2".to_string(), "S3".to_string()]);
        assert_eq!(a.first("vehicle"), Some("V1"));
        assert_eq!(a.len(), 3);
        assert!(a.contains("S3"));
        assert!(!a.contains("S1"));
        assert_eq!(a.entries().count(), 3);
    }
}
