//! Transactional commit and rollback.
//!
//! A commit either binds the operation to all of its resources or leaves
//! every piece of state exactly as it was. Checks run in this order:
//!
//! 1. Existence, resource type and eligibility (hard errors).
//! 2. The operation is not already scheduled (hard error).
//! 3. Every assigned resource is free over `[start, end)`.
//! 4. Every constraint accepts the placement on every assigned resource.
//! 5. Every predecessor is scheduled and ends by `start`.
//!
//! Only then is the operation inserted into each resource's occupancy. An
//! insert that fails anyway rolls back the inserts already made.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::Schedule;
use crate::error::{Placement, Rejection, ScheduleError, ScheduleResult};
use crate::models::{Assignment, Operation, Timestamp};

impl Schedule {
    /// Commits a single-requirement operation to `resource_id` at `start`.
    ///
    /// # Errors
    /// Unknown IDs, a resource of the wrong type, a resource outside the
    /// eligible set, an operation with more than one requirement, or an
    /// operation that is already scheduled.
    pub fn schedule_operation(
        &mut self,
        op_id: &str,
        resource_id: &str,
        start: Timestamp,
    ) -> ScheduleResult<Placement> {
        let op = self.require_operation(op_id)?;
        let assignment = match op.requirements.as_slice() {
            [req] => Assignment::new().with(req.resource_type.clone(), resource_id),
            reqs => {
                return Err(ScheduleError::InvalidAssignment {
                    operation_id: op_id.to_string(),
                    reason: format!(
                        "operation has {} requirements, use schedule_operation_multi",
                        reqs.len()
                    ),
                })
            }
        };
        self.schedule_operation_multi(op_id, &assignment, start)
    }

    /// Commits an operation to one resource per requirement at `start`.
    ///
    /// All-or-nothing: on rejection no resource and no operation state is
    /// touched.
    pub fn schedule_operation_multi(
        &mut self,
        op_id: &str,
        assignment: &Assignment,
        start: Timestamp,
    ) -> ScheduleResult<Placement> {
        let op = self.require_operation(op_id)?;
        let resource_ids = self.resolve_assignment(op, assignment)?;
        if op.is_scheduled() {
            return Err(ScheduleError::AlreadyScheduled(op_id.to_string()));
        }
        let end = start + self.effective_duration(op, assignment);

        if let Some(rejection) = self.check_placement(op, assignment, &resource_ids, start, end)? {
            debug!(operation = op_id, start, end, ?rejection, "placement rejected");
            return Ok(Placement::Rejected(rejection));
        }
        self.commit_checked(op_id, assignment, &resource_ids, start, end)
    }

    /// Runs every commit check without committing.
    pub fn evaluate_placement(
        &self,
        op_id: &str,
        assignment: &Assignment,
        start: Timestamp,
    ) -> ScheduleResult<Placement> {
        let op = self.require_operation(op_id)?;
        let resource_ids = self.resolve_assignment(op, assignment)?;
        if op.is_scheduled() {
            return Err(ScheduleError::AlreadyScheduled(op_id.to_string()));
        }
        let end = start + self.effective_duration(op, assignment);
        Ok(self
            .check_placement(op, assignment, &resource_ids, start, end)?
            .map_or(Placement::Placed, Placement::Rejected))
    }

    /// Releases an operation from its resources and clears its state.
    ///
    /// No-op for an unscheduled operation.
    ///
    /// # Errors
    /// [`ScheduleError::UnknownOperation`] for an unknown ID.
    pub fn unschedule_operation(&mut self, op_id: &str) -> ScheduleResult<()> {
        self.require_operation(op_id)?;
        if self.release(op_id) {
            debug!(operation = op_id, "operation unscheduled");
        }
        Ok(())
    }

    /// Clears every committed slot.
    pub fn clear_all_schedules(&mut self) {
        for resource in self.resources.values_mut() {
            resource.clear();
        }
        for job in &mut self.jobs {
            for op in &mut job.operations {
                op.clear_schedule();
            }
        }
    }

    /// Re-commits a snapshot of a previously scheduled operation without
    /// consulting constraints. Occupancy is still checked.
    pub(crate) fn reinstate(&mut self, snapshot: &Operation) -> ScheduleResult<bool> {
        let (Some(start), Some(end)) = (snapshot.start, snapshot.end) else {
            return Err(ScheduleError::MissingSchedulingState(snapshot.id.clone()));
        };
        let ids: Vec<String> = snapshot.assignment.resource_ids().map(str::to_string).collect();
        let placed = self.commit_checked(&snapshot.id, &snapshot.assignment, &ids, start, end)?;
        Ok(placed.is_placed())
    }

    /// Removes the operation from its resources. Returns whether it was scheduled.
    pub(crate) fn release(&mut self, op_id: &str) -> bool {
        let Some(op) = self.operation_mut(op_id) else {
            return false;
        };
        if !op.is_scheduled() {
            return false;
        }
        let resource_ids: Vec<String> = op.assignment.resource_ids().map(str::to_string).collect();
        op.clear_schedule();
        for rid in resource_ids {
            if let Some(resource) = self.resources.get_mut(&rid) {
                resource.remove_operation(op_id);
            }
        }
        true
    }

    /// Maps each requirement to its bound resource, in requirement order.
    pub(crate) fn resolve_assignment(
        &self,
        op: &Operation,
        assignment: &Assignment,
    ) -> ScheduleResult<Vec<String>> {
        let invalid = |reason: String| ScheduleError::InvalidAssignment {
            operation_id: op.id.clone(),
            reason,
        };
        if op.requirements.is_empty() {
            return Err(invalid("operation has no resource requirements".into()));
        }

        let mut taken: HashMap<&str, usize> = HashMap::new();
        let mut ids: Vec<String> = Vec::with_capacity(op.requirements.len());
        for req in &op.requirements {
            let k = taken.entry(req.resource_type.as_str()).or_default();
            let rid = assignment
                .get(&req.resource_type)
                .get(*k)
                .ok_or_else(|| invalid(format!("no resource bound for '{}'", req.resource_type)))?;
            *k += 1;

            let resource = self.require_resource(rid)?;
            if resource.resource_type != req.resource_type {
                return Err(ScheduleError::ResourceTypeMismatch {
                    operation_id: op.id.clone(),
                    resource_id: rid.clone(),
                    expected: req.resource_type.clone(),
                    actual: resource.resource_type.clone(),
                });
            }
            if !req.allows(rid) {
                return Err(ScheduleError::IneligibleResource {
                    operation_id: op.id.clone(),
                    resource_id: rid.clone(),
                });
            }
            if ids.contains(rid) {
                return Err(invalid(format!("resource '{rid}' bound twice")));
            }
            ids.push(rid.clone());
        }
        if assignment.len() != ids.len() {
            return Err(invalid("assignment binds resources the operation does not require".into()));
        }
        Ok(ids)
    }

    /// First failing check for a placement, if any.
    fn check_placement(
        &self,
        op: &Operation,
        assignment: &Assignment,
        resource_ids: &[String],
        start: Timestamp,
        end: Timestamp,
    ) -> ScheduleResult<Option<Rejection>> {
        let mut resources = Vec::with_capacity(resource_ids.len());
        for rid in resource_ids {
            let resource = self.require_resource(rid)?;
            if !resource.is_available(start, end) {
                return Ok(Some(Rejection::ResourceBusy {
                    resource_id: rid.clone(),
                }));
            }
            resources.push(resource);
        }

        let probe = op.probe(assignment);
        for resource in &resources {
            if let Some(c) = self
                .constraints
                .iter()
                .find(|c| !c.is_feasible(self, &probe, resource, start, end))
            {
                return Ok(Some(Rejection::ConstraintVeto {
                    constraint: c.name().to_string(),
                    resource_id: resource.id.clone(),
                }));
            }
        }

        for pred_id in &op.predecessors {
            let pred = self.require_operation(pred_id)?;
            match pred.end {
                Some(e) if e <= start => {}
                _ => {
                    return Ok(Some(Rejection::PrecedenceUnsatisfied {
                        predecessor_id: pred_id.clone(),
                    }))
                }
            }
        }
        Ok(None)
    }

    fn commit_checked(
        &mut self,
        op_id: &str,
        assignment: &Assignment,
        resource_ids: &[String],
        start: Timestamp,
        end: Timestamp,
    ) -> ScheduleResult<Placement> {
        let mut committed = self.require_operation(op_id)?.clone();
        committed.commit(start, end, assignment.clone());

        let mut added: Vec<&str> = Vec::with_capacity(resource_ids.len());
        for rid in resource_ids {
            let outcome = match self.resources.get_mut(rid) {
                Some(resource) => resource.add_operation(&committed),
                None => Err(ScheduleError::UnknownResource(rid.clone())),
            };
            match outcome {
                Ok(true) => added.push(rid.as_str()),
                Ok(false) => {
                    self.rollback(op_id, &added);
                    warn!(operation = op_id, resource = %rid, "occupancy insert failed, rolled back");
                    return Ok(Placement::Rejected(Rejection::CommitFailed {
                        resource_id: rid.clone(),
                    }));
                }
                Err(e) => {
                    self.rollback(op_id, &added);
                    warn!(operation = op_id, resource = %rid, error = %e, "occupancy insert errored, rolled back");
                    return Err(e);
                }
            }
        }

        if let Some(op) = self.operation_mut(op_id) {
            *op = committed;
        }
        debug!(operation = op_id, start, end, resources = ?resource_ids, "operation committed");
        Ok(Placement::Placed)
    }

    fn rollback(&mut self, op_id: &str, added: &[&str]) {
        for rid in added {
            if let Some(resource) = self.resources.get_mut(*rid) {
                resource.remove_operation(op_id);
            }
        }
    }
}
