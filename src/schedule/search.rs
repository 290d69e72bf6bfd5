//! Earliest-feasible-slot search.
//!
//! # Single resource
//! A fixpoint loop over a candidate start `t`, never moving backward:
//!
//! 1. Apply every constraint's earliest-start push; restart if `t` moved.
//! 2. Move into the first availability window that can hold the
//!    operation; restart if `t` moved.
//! 3. Jump past the booking covering `t`, or past the next booking if the
//!    operation would run into it; restart.
//! 4. Run the full feasibility check. On a veto, advance to the next
//!    booking boundary anywhere in the schedule, or by
//!    [`SearchLimits::fallback_step_secs`], whichever is sooner.
//!
//! Every search is capped by [`SearchLimits::max_iterations`] and the
//! optional horizon. Hitting either returns `None`.
//!
//! # Multiple resources
//! Each bound resource runs its own search from the current `t`; the
//! maximum becomes the new `t` until every resource accepts it.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::Schedule;
use crate::constraints::latest_predecessor_end;
use crate::error::{Placement, ScheduleError, ScheduleResult};
use crate::models::{Assignment, Operation, Resource, Timestamp};

/// Bounds on slot searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Iterations per fixpoint loop before giving up.
    pub max_iterations: usize,
    /// Largest advance after a full-feasibility veto (seconds).
    pub fallback_step_secs: i64,
    /// Resource combinations tried per any-resource search.
    pub max_combinations: usize,
    /// No slot may end after this instant.
    pub horizon: Option<Timestamp>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            fallback_step_secs: 60,
            max_combinations: 4_096,
            horizon: None,
        }
    }
}

impl SearchLimits {
    /// Sets the horizon.
    pub fn with_horizon(mut self, horizon: Timestamp) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Sets the fallback step.
    pub fn with_fallback_step(mut self, secs: i64) -> Self {
        self.fallback_step_secs = secs.max(1);
        self
    }

    /// Sets the combination cap.
    pub fn with_max_combinations(mut self, n: usize) -> Self {
        self.max_combinations = n.max(1);
        self
    }

    fn beyond_horizon(&self, end: Timestamp) -> bool {
        self.horizon.is_some_and(|h| end > h)
    }
}

/// A feasible placement found by an any-resource search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    /// Start time.
    pub start: Timestamp,
    /// End time including duration adjustments.
    pub end: Timestamp,
    /// Resources to bind.
    pub assignment: Assignment,
}

/// One committed step of a no-wait chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    /// Operation ID.
    pub operation_id: String,
    /// Start time.
    pub start: Timestamp,
    /// End time.
    pub end: Timestamp,
    /// Bound resources.
    pub assignment: Assignment,
}

impl Schedule {
    /// Earliest start on one resource for `op` lasting `duration`.
    ///
    /// `op` is passed to constraints as is; probe copies carrying an
    /// assignment are accepted.
    pub fn earliest_slot_on(
        &self,
        op: &Operation,
        resource: &Resource,
        duration: i64,
        earliest: Timestamp,
    ) -> Option<Timestamp> {
        let deadline = self
            .constraints
            .iter()
            .filter_map(|c| c.latest_start(self, op))
            .min();
        let mut t = earliest;
        for _ in 0..self.limits.max_iterations {
            if self.limits.beyond_horizon(t + duration) || deadline.is_some_and(|d| t > d) {
                trace!(operation = %op.id, resource = %resource.id, t, "slot search passed horizon");
                return None;
            }

            let pushed = self
                .constraints
                .iter()
                .map(|c| c.adjust_earliest_start(self, op, resource, t))
                .fold(t, Timestamp::max);
            if pushed > t {
                t = pushed;
                continue;
            }

            let clamped = resource.clamp_to_windows(t, duration)?;
            if clamped > t {
                t = clamped;
                continue;
            }

            if let Some(prev) = resource.previous_before(t) {
                if prev.window.end > t {
                    t = prev.window.end;
                    continue;
                }
            }
            if let Some(next) = resource.next_at_or_after(t) {
                if next.window.start < t + duration {
                    t = next.window.end.max(t + 1);
                    continue;
                }
            }

            let end = t + duration;
            if resource.is_available(t, end)
                && self
                    .constraints
                    .iter()
                    .all(|c| c.is_feasible(self, op, resource, t, end))
            {
                return Some(t);
            }
            t = self.minimal_advance(t);
        }
        warn!(
            operation = %op.id,
            resource = %resource.id,
            max_iterations = self.limits.max_iterations,
            "slot search hit iteration cap"
        );
        None
    }

    /// Earliest start of `op_id` on a single resource.
    ///
    /// Never earlier than the latest committed predecessor end.
    ///
    /// # Errors
    /// Unknown IDs, or a resource that cannot serve the operation's single
    /// requirement.
    pub fn find_earliest_slot(
        &self,
        op_id: &str,
        resource_id: &str,
        earliest: Timestamp,
    ) -> ScheduleResult<Option<Timestamp>> {
        let op = self.require_operation(op_id)?;
        let assignment = match op.requirements.as_slice() {
            [req] => Assignment::new().with(req.resource_type.clone(), resource_id),
            reqs => {
                return Err(ScheduleError::InvalidAssignment {
                    operation_id: op_id.to_string(),
                    reason: format!(
                        "operation has {} requirements, use find_earliest_slot_for_assignment",
                        reqs.len()
                    ),
                })
            }
        };
        self.find_earliest_slot_for_assignment(op_id, &assignment, earliest)
    }

    /// Earliest common start of `op_id` on every resource of `assignment`.
    ///
    /// # Errors
    /// Unknown IDs, or an assignment that does not fit the requirements.
    pub fn find_earliest_slot_for_assignment(
        &self,
        op_id: &str,
        assignment: &Assignment,
        earliest: Timestamp,
    ) -> ScheduleResult<Option<Timestamp>> {
        let op = self.require_operation(op_id)?;
        let ids = self.resolve_assignment(op, assignment)?;
        let resources = ids
            .iter()
            .map(|id| self.require_resource(id))
            .collect::<ScheduleResult<Vec<_>>>()?;
        let earliest = self.respect_predecessors(op, earliest);
        Ok(self.slot_for(op, assignment, &resources, earliest))
    }

    /// Earliest placement of `op_id` over every eligible resource
    /// combination.
    ///
    /// Combinations are tried in candidate order; the first reaching the
    /// minimum start wins. Stops early once a combination starts exactly
    /// at `earliest`. At most [`SearchLimits::max_combinations`] are tried.
    pub fn find_earliest_slot_any_resource(
        &self,
        op_id: &str,
        earliest: Timestamp,
    ) -> ScheduleResult<Option<SlotCandidate>> {
        let op = self.require_operation(op_id)?;
        let earliest = self.respect_predecessors(op, earliest);

        let options: Vec<Vec<&Resource>> = op
            .requirements
            .iter()
            .map(|req| {
                req.candidates
                    .iter()
                    .filter_map(|id| self.resource(id))
                    .filter(|r| r.resource_type == req.resource_type)
                    .collect()
            })
            .collect();
        if options.is_empty() || options.iter().any(Vec::is_empty) {
            return Ok(None);
        }

        let mut best: Option<SlotCandidate> = None;
        let mut cursor = vec![0usize; options.len()];
        let mut tried = 0usize;
        loop {
            let combo: Vec<&Resource> = cursor.iter().zip(&options).map(|(&i, o)| o[i]).collect();
            let distinct = combo
                .iter()
                .enumerate()
                .all(|(i, r)| combo[..i].iter().all(|q| q.id != r.id));

            if distinct {
                tried += 1;
                let ids: Vec<&str> = combo.iter().map(|r| r.id.as_str()).collect();
                let assignment = Assignment::from_requirements(&op.requirements, &ids);
                if let Some(start) = self.slot_for(op, &assignment, &combo, earliest) {
                    if best.as_ref().map_or(true, |b| start < b.start) {
                        let end = start + self.effective_duration(op, &assignment);
                        best = Some(SlotCandidate {
                            start,
                            end,
                            assignment,
                        });
                    }
                    if start == earliest {
                        break;
                    }
                }
                if tried >= self.limits.max_combinations {
                    debug!(operation = op_id, tried, "combination cap reached");
                    break;
                }
            }

            if !advance_cursor(&mut cursor, &options) {
                break;
            }
        }
        Ok(best)
    }

    /// Earliest start of a no-wait chain: each operation starts exactly
    /// when the previous one ends.
    ///
    /// Read-only: the chain is laid out without committing anything. A
    /// rule that looks at other chain members once they are committed can
    /// still refuse the layout, in which case
    /// [`schedule_no_wait_chain`](Self::schedule_no_wait_chain) moves on to
    /// a later start.
    ///
    /// # Errors
    /// Unknown or already scheduled operations.
    pub fn find_earliest_no_wait_start(
        &self,
        op_ids: &[&str],
        earliest: Timestamp,
    ) -> ScheduleResult<Option<Timestamp>> {
        if !self.chain_unscheduled(op_ids)? {
            return Ok(Some(earliest));
        }
        let mut t = earliest;
        for _ in 0..self.limits.max_iterations {
            match self.plan_chain(op_ids, t)? {
                ChainPlan::Unreachable => return Ok(None),
                ChainPlan::Shift(d) => t += d.max(1),
                ChainPlan::Ready(plan) => return Ok(plan.first().map(|c| c.start)),
            }
        }
        warn!(
            chain = ?op_ids,
            max_iterations = self.limits.max_iterations,
            "no-wait chain search hit iteration cap"
        );
        Ok(None)
    }

    /// Commits a no-wait chain at its earliest start.
    ///
    /// Returns the committed steps, or `None` (nothing committed) when no
    /// start within the search limits works.
    ///
    /// # Errors
    /// Unknown or already scheduled operations.
    pub fn schedule_no_wait_chain(
        &mut self,
        op_ids: &[&str],
        earliest: Timestamp,
    ) -> ScheduleResult<Option<Vec<ChainStep>>> {
        if !self.chain_unscheduled(op_ids)? {
            return Ok(Some(Vec::new()));
        }

        let mut t = earliest;
        for _ in 0..self.limits.max_iterations {
            let shift = match self.plan_chain(op_ids, t)? {
                ChainPlan::Unreachable => return Ok(None),
                ChainPlan::Shift(d) => d,
                ChainPlan::Ready(plan) => match self.commit_chain(plan)? {
                    Some(steps) => return Ok(Some(steps)),
                    None => self.limits.fallback_step_secs,
                },
            };
            t += shift.max(1);
            trace!(chain_start = t, "no-wait chain shifted");
        }
        warn!(
            chain = ?op_ids,
            max_iterations = self.limits.max_iterations,
            "no-wait chain search hit iteration cap"
        );
        Ok(None)
    }

    /// Errors on unknown or scheduled members. Returns whether the chain
    /// is non-empty.
    fn chain_unscheduled(&self, op_ids: &[&str]) -> ScheduleResult<bool> {
        for id in op_ids {
            if self.require_operation(id)?.is_scheduled() {
                return Err(ScheduleError::AlreadyScheduled(id.to_string()));
            }
        }
        Ok(!op_ids.is_empty())
    }

    /// Lays the chain out from `t` without committing. Chain members are
    /// searched while their in-chain predecessors are still uncommitted.
    fn plan_chain(&self, op_ids: &[&str], t: Timestamp) -> ScheduleResult<ChainPlan> {
        let mut offset = t;
        let mut plan = Vec::with_capacity(op_ids.len());
        for id in op_ids {
            let Some(c) = self.find_earliest_slot_any_resource(id, offset)? else {
                return Ok(ChainPlan::Unreachable);
            };
            if c.start != offset {
                return Ok(ChainPlan::Shift(c.start - offset));
            }
            offset = c.end;
            plan.push(ChainStep {
                operation_id: id.to_string(),
                start: c.start,
                end: c.end,
                assignment: c.assignment,
            });
        }
        Ok(ChainPlan::Ready(plan))
    }

    /// Commits a planned chain in order; on any rejection releases what
    /// was committed and returns `None`.
    fn commit_chain(&mut self, plan: Vec<ChainStep>) -> ScheduleResult<Option<Vec<ChainStep>>> {
        let mut done: Vec<ChainStep> = Vec::with_capacity(plan.len());
        for step in plan {
            match self.schedule_operation_multi(&step.operation_id, &step.assignment, step.start)? {
                Placement::Placed => done.push(step),
                Placement::Rejected(rejection) => {
                    debug!(operation = %step.operation_id, ?rejection, "planned chain step rejected");
                    self.undo_chain(&done);
                    return Ok(None);
                }
            }
        }
        Ok(Some(done))
    }

    fn undo_chain(&mut self, steps: &[ChainStep]) {
        for step in steps.iter().rev() {
            self.release(&step.operation_id);
        }
    }

    /// Common start on every resource, iterated until no resource moves it.
    fn slot_for(
        &self,
        op: &Operation,
        assignment: &Assignment,
        resources: &[&Resource],
        earliest: Timestamp,
    ) -> Option<Timestamp> {
        let probe = op.probe(assignment);
        let duration = self.effective_duration(op, assignment);
        let mut t = earliest;
        for _ in 0..self.limits.max_iterations {
            let mut next = t;
            for resource in resources {
                next = next.max(self.earliest_slot_on(&probe, resource, duration, next)?);
            }
            if next == t {
                return Some(t);
            }
            t = next;
        }
        warn!(operation = %op.id, "multi-resource slot search hit iteration cap");
        None
    }

    fn respect_predecessors(&self, op: &Operation, earliest: Timestamp) -> Timestamp {
        latest_predecessor_end(self, op).map_or(earliest, |e| earliest.max(e))
    }

    /// Next booking boundary after `t` anywhere, capped by the fallback step.
    fn minimal_advance(&self, t: Timestamp) -> Timestamp {
        let step = t + self.limits.fallback_step_secs.max(1);
        self.resources
            .values()
            .flat_map(|r| r.bookings())
            .flat_map(|b| [b.window.start, b.window.end])
            .filter(|&x| x > t)
            .min()
            .map_or(step, |x| x.min(step))
    }
}

enum ChainPlan {
    /// Some member has no slot at all.
    Unreachable,
    /// Restart the chain this many seconds later.
    Shift(i64),
    /// Every member starts exactly where the previous one ends.
    Ready(Vec<ChainStep>),
}

/// Odometer step over per-requirement option lists.
fn advance_cursor(cursor: &mut [usize], options: &[Vec<&Resource>]) -> bool {
    for i in (0..cursor.len()).rev() {
        cursor[i] += 1;
        if cursor[i] < options[i].len() {
            return true;
        }
        cursor[i] = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{
        BlockingConstraint, ChangeoverConstraint, Constraint, ResourceTypeFilter,
        ShiftConstraint, ShiftMode,
    };
    use crate::models::{metadata::keys, DailyWindow, Job};

    const M: i64 = 60;
    const H: i64 = 3600;

    fn two_sites() -> Schedule {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site").with_window(8 * H, 17 * H));
        s.add_resource(Resource::new("S2", "site").with_window(8 * H, 17 * H));
        s.add_job(
            Job::new("J1")
                .with_operation(Operation::new("A", "J1", 2 * H).with_resource("site", ["S1"]))
                .with_operation(Operation::new("B", "J1", H).with_resource("site", ["S1", "S2"])),
        );
        s.add_job(
            Job::new("J2").with_operation(Operation::new("C", "J2", 3 * H).with_resource("site", ["S1", "S2"])),
        );
        s
    }

    #[test]
    fn test_slot_after_booking_and_window() {
        let mut s = two_sites();
        assert_eq!(s.find_earliest_slot("A", "S1", 0).unwrap(), Some(8 * H));
        s.schedule_operation("A", "S1", 8 * H).unwrap();
        assert_eq!(s.find_earliest_slot("C", "S1", 0).unwrap(), Some(10 * H));
        assert_eq!(s.find_earliest_slot("C", "S1", 15 * H).unwrap(), None);
    }

    #[test]
    fn test_slot_between_bookings() {
        let mut s = two_sites();
        s.schedule_operation("A", "S1", 10 * H).unwrap();
        // 1h fits before A, 3h does not
        assert_eq!(s.find_earliest_slot("B", "S1", 8 * H).unwrap(), Some(8 * H));
        assert_eq!(s.find_earliest_slot("C", "S1", 8 * H).unwrap(), Some(12 * H));
    }

    #[test]
    fn test_slot_respects_changeover() {
        let mut s = two_sites();
        s.add_constraint(Box::new(ChangeoverConstraint::new(30 * M)));
        s.add_job(
            Job::new("J3")
                .with_metadata(keys::JOB_TYPE, "X")
                .with_operation(Operation::new("D", "J3", H).with_resource("site", ["S1"])),
        );
        s.add_job(
            Job::new("J4")
                .with_metadata(keys::JOB_TYPE, "Y")
                .with_operation(Operation::new("E", "J4", H).with_resource("site", ["S1"])),
        );
        s.schedule_operation("D", "S1", 8 * H).unwrap();
        assert_eq!(s.find_earliest_slot("E", "S1", 8 * H).unwrap(), Some(9 * H + 30 * M));
    }

    #[test]
    fn test_any_resource_prefers_earliest() {
        let mut s = two_sites();
        s.schedule_operation("A", "S1", 8 * H).unwrap();
        let c = s.find_earliest_slot_any_resource("C", 8 * H).unwrap().unwrap();
        assert_eq!(c.start, 8 * H);
        assert_eq!(c.end, 11 * H);
        assert_eq!(c.assignment.first("site"), Some("S2"));
    }

    #[test]
    fn test_any_resource_respects_predecessors() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("R1", "machine"));
        s.add_resource(Resource::new("R2", "machine"));
        s.add_job(
            Job::new("J")
                .with_operation(Operation::new("P", "J", 100).with_resource("machine", ["R1"]))
                .with_operation(
                    Operation::new("Q", "J", 100)
                        .with_resource("machine", ["R1", "R2"])
                        .with_predecessor("P"),
                ),
        );
        s.schedule_operation("P", "R1", 0).unwrap();
        let c = s.find_earliest_slot_any_resource("Q", 0).unwrap().unwrap();
        assert_eq!(c.start, 100);
        assert_eq!(c.assignment.first("machine"), Some("R1"));
    }

    #[test]
    fn test_multi_resource_slot_converges() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        s.add_resource(Resource::new("V1", "vehicle"));
        s.add_job(
            Job::new("J1")
                .with_operation(Operation::new("A", "J1", H).with_resource("site", ["S1"]))
                .with_operation(Operation::new("B", "J1", H).with_resource("vehicle", ["V1"])),
        );
        s.add_job(
            Job::new("J2").with_operation(
                Operation::new("C", "J2", H)
                    .with_resource("site", ["S1"])
                    .with_resource("vehicle", ["V1"]),
            ),
        );
        s.schedule_operation("A", "S1", 0).unwrap();
        s.schedule_operation("B", "V1", H).unwrap();

        let a = Assignment::new().with("site", "S1").with("vehicle", "V1");
        assert_eq!(s.find_earliest_slot_for_assignment("C", &a, 0).unwrap(), Some(2 * H));
        let c = s.find_earliest_slot_any_resource("C", 0).unwrap().unwrap();
        assert_eq!(c.start, 2 * H);
    }

    #[test]
    fn test_same_type_requirements_bind_distinct_resources() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("W1", "worker"));
        s.add_resource(Resource::new("W2", "worker"));
        s.add_job(Job::new("J").with_operation(
            Operation::new("Lift", "J", 60)
                .with_resource("worker", ["W1", "W2"])
                .with_resource("worker", ["W1", "W2"]),
        ));
        let c = s.find_earliest_slot_any_resource("Lift", 0).unwrap().unwrap();
        assert_eq!(c.assignment.get("worker"), ["W1".to_string(), "W2".to_string()]);
        assert!(s.schedule_operation_multi("Lift", &c.assignment, c.start).unwrap().is_placed());
    }

    #[test]
    fn test_blocking_chain_back_to_back() {
        let mut s = Schedule::new().with_constraint(BlockingConstraint::new());
        s.add_resource(Resource::new("R1", "machine"));
        s.add_resource(Resource::new("R2", "machine"));
        s.add_job(
            Job::new("J")
                .with_operation(Operation::new("O1", "J", 15 * M).with_resource("machine", ["R1"]))
                .with_operation(
                    Operation::new("O2", "J", 15 * M)
                        .with_resource("machine", ["R2"])
                        .with_predecessor("O1"),
                )
                .with_operation(
                    Operation::new("O3", "J", 5 * M)
                        .with_resource("machine", ["R2"])
                        .with_predecessor("O2"),
                ),
        );
        let chain = ["O1", "O2", "O3"];

        assert_eq!(s.find_earliest_no_wait_start(&chain, 8 * H).unwrap(), Some(8 * H));
        assert_eq!(s.scheduled_operations().count(), 0);

        let steps = s.schedule_no_wait_chain(&chain, 8 * H).unwrap().unwrap();
        let starts: Vec<_> = steps.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![8 * H, 8 * H + 15 * M, 8 * H + 30 * M]);
        assert!(s.job("J").unwrap().is_complete());
    }

    #[test]
    fn test_blocking_chain_shifts_past_conflict() {
        let mut s = Schedule::new().with_constraint(BlockingConstraint::new());
        s.add_resource(Resource::new("R1", "machine"));
        s.add_resource(Resource::new("R2", "machine"));
        s.add_job(
            Job::new("J")
                .with_operation(Operation::new("O1", "J", 15 * M).with_resource("machine", ["R1"]))
                .with_operation(
                    Operation::new("O2", "J", 15 * M)
                        .with_resource("machine", ["R2"])
                        .with_predecessor("O1"),
                ),
        );
        s.add_job(
            Job::new("K").with_operation(Operation::new("X", "K", 20 * M).with_resource("machine", ["R2"])),
        );
        // R2 busy 08:15-08:35, so O2 cannot follow O1 directly at 08:00
        s.schedule_operation("X", "R2", 8 * H + 15 * M).unwrap();

        let view: &Schedule = &s;
        assert_eq!(
            view.find_earliest_no_wait_start(&["O1", "O2"], 8 * H).unwrap(),
            Some(8 * H + 20 * M)
        );
        assert_eq!(view.scheduled_operations().count(), 1);

        let steps = s.schedule_no_wait_chain(&["O1", "O2"], 8 * H).unwrap().unwrap();
        assert_eq!(steps[0].start, 8 * H + 20 * M);
        assert_eq!(steps[1].start, 8 * H + 35 * M);
    }

    #[test]
    fn test_shift_pushes_search() {
        let shift = ShiftConstraint::new(
            vec![DailyWindow::from_hm((8, 0), (12, 0)).unwrap()],
            ShiftMode::Strict,
        )
        .unwrap()
        .with_filter(ResourceTypeFilter::only(["site"]));
        let mut s = two_sites().with_constraint(shift);
        s.set_limits(SearchLimits::default());
        // 3h from 10:00 does not fit the 08:00-12:00 shift; the next shift is tomorrow
        s.add_resource(Resource::new("S9", "site"));
        s.add_job(Job::new("J9").with_operation(Operation::new("Z", "J9", 3 * H).with_resource("site", ["S9"])));
        assert_eq!(s.find_earliest_slot("Z", "S9", 10 * H).unwrap(), Some(24 * H + 8 * H));
    }

    #[derive(Debug)]
    struct NeverFeasible;

    impl Constraint for NeverFeasible {
        fn name(&self) -> &'static str {
            "never"
        }

        fn is_feasible(&self, _: &Schedule, _: &Operation, _: &Resource, _: Timestamp, _: Timestamp) -> bool {
            false
        }
    }

    #[test]
    fn test_iteration_cap_and_horizon() {
        let mut s = two_sites()
            .with_constraint(NeverFeasible)
            .with_limits(SearchLimits::default().with_max_iterations(50));
        assert_eq!(s.find_earliest_slot("B", "S2", 0).unwrap(), None);

        s.remove_constraint("never");
        s.set_limits(SearchLimits::default().with_horizon(9 * H));
        assert_eq!(s.find_earliest_slot("B", "S2", 0).unwrap(), Some(8 * H));
        assert_eq!(s.find_earliest_slot("A", "S1", 0).unwrap(), None);
    }

    #[test]
    fn test_search_errors() {
        let s = two_sites();
        assert!(s.find_earliest_slot("nope", "S1", 0).is_err());
        assert!(matches!(
            s.find_earliest_slot("A", "S2", 0),
            Err(ScheduleError::IneligibleResource { .. })
        ));
    }
}
