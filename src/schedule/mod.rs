//! The schedule aggregate.
//!
//! [`Schedule`] owns every job (and through them every operation), every
//! resource, the active constraints and the optional duration policy.
//! Cross references are plain IDs resolved through the schedule's
//! indexes; resources only record which operation IDs occupy them.
//!
//! All mutation of scheduling state goes through the commit methods in
//! this module, which keep operation state and resource occupancy in sync.
//!
//! # Example
//!
//! ```
//! use u_jobshop::models::{Job, Operation, Resource};
//! use u_jobshop::schedule::Schedule;
//!
//! let mut schedule = Schedule::new();
//! schedule.add_resource(Resource::new("S1", "site").with_window(0, 8 * 3600));
//! schedule.add_job(
//!     Job::new("V1").with_operation(Operation::new("T1", "V1", 3600).with_resource("site", ["S1"])),
//! );
//!
//! let start = schedule.find_earliest_slot("T1", "S1", 0).unwrap();
//! assert_eq!(start, Some(0));
//! assert!(schedule.schedule_operation("T1", "S1", 0).unwrap().is_placed());
//! assert!(schedule.job("V1").unwrap().is_complete());
//! ```

mod commit;
mod duration;
mod search;

pub use duration::{DurationAdjustment, FnAdjustment, IdThresholdRule, ResourceRuleAdjustment};
pub use search::{ChainStep, SearchLimits, SlotCandidate};

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::constraints::Constraint;
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{Assignment, Job, Operation, Resource, Timestamp};

/// Root aggregate of a scheduling problem and its committed state.
#[derive(Debug, Default)]
pub struct Schedule {
    jobs: Vec<Job>,
    job_index: HashMap<String, usize>,
    op_index: HashMap<String, (usize, usize)>,
    resources: BTreeMap<String, Resource>,
    constraints: Vec<Box<dyn Constraint>>,
    duration_policy: Option<Box<dyn DurationAdjustment>>,
    limits: SearchLimits,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slot-search limits.
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Slot-search limits.
    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Replaces the slot-search limits.
    pub fn set_limits(&mut self, limits: SearchLimits) {
        self.limits = limits;
    }

    // ======================== Construction ========================

    /// Registers a resource, replacing any resource with the same ID.
    ///
    /// Operations committed to the replaced resource are unscheduled first.
    pub fn add_resource(&mut self, resource: Resource) {
        if let Some(old) = self.resources.get(&resource.id) {
            let bound: Vec<String> = old.operation_ids().map(str::to_string).collect();
            for id in &bound {
                self.release(id);
            }
            if !bound.is_empty() {
                debug!(resource = %resource.id, unscheduled = bound.len(), "resource replaced");
            }
        }
        self.resources.insert(resource.id.clone(), resource);
    }

    /// Registers a job and its operations.
    ///
    /// A job with an existing ID replaces the old one; the old job's
    /// committed operations are released from their resources first.
    pub fn add_job(&mut self, job: Job) {
        if let Some(&idx) = self.job_index.get(&job.id) {
            let old_ids: Vec<String> = self.jobs[idx].operations.iter().map(|o| o.id.clone()).collect();
            for id in &old_ids {
                self.release(id);
            }
            self.jobs[idx] = job;
        } else {
            self.job_index.insert(job.id.clone(), self.jobs.len());
            self.jobs.push(job);
        }
        self.reindex_operations();
    }

    fn reindex_operations(&mut self) {
        self.op_index.clear();
        for (ji, job) in self.jobs.iter().enumerate() {
            for (oi, op) in job.operations.iter().enumerate() {
                self.op_index.insert(op.id.clone(), (ji, oi));
            }
        }
    }

    /// Appends a constraint. Constraints are consulted in registration order.
    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    /// Builder form of [`add_constraint`](Self::add_constraint).
    pub fn with_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Removes every constraint with the given name. Returns how many were removed.
    pub fn remove_constraint(&mut self, name: &str) -> usize {
        let before = self.constraints.len();
        self.constraints.retain(|c| c.name() != name);
        before - self.constraints.len()
    }

    /// Active constraints in registration order.
    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }

    /// Whether any active constraint demands no-wait chains.
    pub fn has_blocking_constraint(&self) -> bool {
        self.constraints.iter().any(|c| c.requires_no_wait())
    }

    /// Installs a duration policy.
    pub fn set_duration_policy(&mut self, policy: impl DurationAdjustment + 'static) {
        self.duration_policy = Some(Box::new(policy));
    }

    /// Removes the duration policy.
    pub fn clear_duration_policy(&mut self) {
        self.duration_policy = None;
    }

    // ======================== Lookup ========================

    /// Job by ID.
    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.job_index.get(job_id).map(|&i| &self.jobs[i])
    }

    /// All jobs in registration order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Operation by ID.
    pub fn operation(&self, op_id: &str) -> Option<&Operation> {
        self.op_index
            .get(op_id)
            .map(|&(ji, oi)| &self.jobs[ji].operations[oi])
    }

    pub(crate) fn operation_mut(&mut self, op_id: &str) -> Option<&mut Operation> {
        let &(ji, oi) = self.op_index.get(op_id)?;
        Some(&mut self.jobs[ji].operations[oi])
    }

    /// All operations, job by job.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.jobs.iter().flat_map(|j| j.operations.iter())
    }

    /// Operations owned by a job (empty for an unknown job).
    pub fn operations_of_job<'a>(&'a self, job_id: &str) -> impl Iterator<Item = &'a Operation> + 'a {
        self.job(job_id).into_iter().flat_map(|j| j.operations.iter())
    }

    /// Resource by ID.
    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources.get(resource_id)
    }

    /// All resources ordered by ID.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub(crate) fn require_operation(&self, op_id: &str) -> ScheduleResult<&Operation> {
        self.operation(op_id)
            .ok_or_else(|| ScheduleError::UnknownOperation(op_id.to_string()))
    }

    pub(crate) fn require_resource(&self, resource_id: &str) -> ScheduleResult<&Resource> {
        self.resource(resource_id)
            .ok_or_else(|| ScheduleError::UnknownResource(resource_id.to_string()))
    }

    /// Number of registered operations.
    pub fn operation_count(&self) -> usize {
        self.op_index.len()
    }

    // ======================== Queries ========================

    /// Base duration plus the duration policy's surcharge for `assignment`.
    pub fn effective_duration(&self, op: &Operation, assignment: &Assignment) -> i64 {
        let extra = self
            .duration_policy
            .as_ref()
            .map_or(0, |p| p.additional_secs(self, op, assignment).max(0));
        op.duration_secs + extra
    }

    /// Committed operations.
    pub fn scheduled_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations().filter(|o| o.is_scheduled())
    }

    /// Operations without a committed slot.
    pub fn unscheduled_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations().filter(|o| !o.is_scheduled())
    }

    /// Unscheduled operations whose predecessors are all scheduled.
    pub fn ready_operations(&self) -> Vec<&Operation> {
        self.unscheduled_operations()
            .filter(|op| self.predecessors_done(op))
            .collect()
    }

    pub(crate) fn predecessors_done(&self, op: &Operation) -> bool {
        op.predecessors
            .iter()
            .all(|p| self.operation(p).is_some_and(Operation::is_scheduled))
    }

    /// Operations listing `op_id` as a predecessor.
    pub fn successors_of<'a>(&'a self, op_id: &'a str) -> impl Iterator<Item = &'a Operation> + 'a {
        self.operations()
            .filter(move |o| o.predecessors.iter().any(|p| p == op_id))
    }

    /// Latest end minus earliest start across committed operations (seconds).
    pub fn total_operational_time(&self) -> i64 {
        let mut span: Option<(Timestamp, Timestamp)> = None;
        for op in self.scheduled_operations() {
            if let (Some(s), Some(e)) = (op.start, op.end) {
                span = Some(match span {
                    Some((lo, hi)) => (lo.min(s), hi.max(e)),
                    None => (s, e),
                });
            }
        }
        span.map_or(0, |(lo, hi)| hi - lo)
    }

    /// Resources that could host `op_id` starting at `start`.
    ///
    /// Each candidate is probed on its own: type match, free interval, and
    /// every constraint's veto. For operations with several requirements
    /// this lists per-resource options, not complete assignments.
    pub fn find_available_resources(&self, op_id: &str, start: Timestamp) -> ScheduleResult<Vec<String>> {
        let op = self.require_operation(op_id)?;
        let mut out: Vec<String> = Vec::new();
        for req in &op.requirements {
            for rid in &req.candidates {
                if out.contains(rid) {
                    continue;
                }
                let Some(resource) = self.resource(rid) else {
                    continue;
                };
                if resource.resource_type != req.resource_type {
                    continue;
                }
                let assignment = Assignment::new().with(req.resource_type.clone(), rid.clone());
                let end = start + self.effective_duration(op, &assignment);
                let probe = op.probe(&assignment);
                if resource.is_available(start, end)
                    && self
                        .constraints
                        .iter()
                        .all(|c| c.is_feasible(self, &probe, resource, start, end))
                {
                    out.push(rid.clone());
                }
            }
        }
        Ok(out)
    }
}
