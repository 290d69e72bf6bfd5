//! Problem and schedule validation.
//!
//! [`validate_input`] checks the structure of a problem before anything
//! is scheduled:
//! - Duplicate IDs (jobs, operations, resources)
//! - Jobs without operations
//! - Requirements naming unknown resources or resources of another type
//! - Unknown predecessors
//! - Circular precedence dependencies (DAG validation)
//!
//! [`validate_schedule`] audits committed state:
//! - Double booking of a resource
//! - Precedence violations
//! - Resource type mismatches
//! - Work outside availability windows
//! - Jobs finishing after their due date
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{fits_any, Job, Resource, TimeWindow};
use crate::schedule::Schedule;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A requirement references a resource that doesn't exist.
    InvalidResourceReference,
    /// A requirement lists a resource of a different type.
    ResourceTypeMismatch,
    /// Precedence graph contains a cycle.
    CyclicDependency,
    /// A job has no operations.
    EmptyJob,
    /// An operation references a predecessor that doesn't exist.
    InvalidPredecessor,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input data for a scheduling problem.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(jobs: &[Job], resources: &[Resource]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut resource_types: HashMap<&str, &str> = HashMap::new();
    for r in resources {
        if resource_types.insert(r.id.as_str(), r.resource_type.as_str()).is_some() {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate resource ID: {}", r.id),
            ));
        }
    }

    let mut job_ids = HashSet::new();
    let mut op_ids = HashSet::new();
    for job in jobs {
        if !job_ids.insert(job.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate job ID: {}", job.id),
            ));
        }
        if job.operations.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyJob,
                format!("Job '{}' has no operations", job.id),
            ));
        }
        for op in &job.operations {
            if !op_ids.insert(op.id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateId,
                    format!("Duplicate operation ID: {}", op.id),
                ));
            }
        }
    }

    for op in jobs.iter().flat_map(|j| &j.operations) {
        for req in &op.requirements {
            for cand in &req.candidates {
                match resource_types.get(cand.as_str()) {
                    None => errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidResourceReference,
                        format!("Operation '{}' references unknown resource '{}'", op.id, cand),
                    )),
                    Some(&actual) if actual != req.resource_type => errors.push(ValidationError::new(
                        ValidationErrorKind::ResourceTypeMismatch,
                        format!(
                            "Operation '{}' lists '{}' of type '{}' for a '{}' requirement",
                            op.id, cand, actual, req.resource_type
                        ),
                    )),
                    Some(_) => {}
                }
            }
        }
        for pred in &op.predecessors {
            if !op_ids.contains(pred.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!("Operation '{}' references unknown predecessor '{}'", op.id, pred),
                ));
            }
        }
    }

    if let Some(cycle_err) = detect_cycles(jobs) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the precedence graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists. Nodes are visited
/// in sorted order so the reported node is deterministic.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(jobs: &[Job]) -> Option<ValidationError> {
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut all_ids: Vec<&str> = Vec::new();

    for op in jobs.iter().flat_map(|j| &j.operations) {
        all_ids.push(&op.id);
        for pred in &op.predecessors {
            adj.entry(pred.as_str()).or_default().push(op.id.as_str());
        }
    }
    all_ids.sort_unstable();

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();
    for &node in &all_ids {
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular dependency detected involving operation '{node}'"),
            ));
        }
    }
    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // back edge
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}

/// A problem found in committed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (job, resource, or operation).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of committed-state violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Two operations overlap on one resource.
    DoubleBooking,
    /// An operation starts before a predecessor ends, or a predecessor is
    /// unscheduled.
    PrecedenceViolation,
    /// An operation is bound to a resource of the wrong type.
    ResourceTypeMismatch,
    /// An operation runs outside its resource's availability windows.
    ResourceUnavailable,
    /// A job finishes after its due date.
    DeadlineMiss,
}

impl Violation {
    fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
        severity: i32,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
            severity,
        }
    }
}

/// Audits the committed state of `schedule`.
///
/// Works from the operations' own start/end/assignment, so it also
/// catches state that bypassed the commit methods.
pub fn validate_schedule(schedule: &Schedule) -> Vec<Violation> {
    let mut out = Vec::new();
    let mut per_resource: BTreeMap<&str, Vec<(TimeWindow, &str)>> = BTreeMap::new();

    for op in schedule.scheduled_operations() {
        let Some(window) = op.interval() else {
            continue;
        };

        for (rtype, rid) in op.assignment.entries() {
            per_resource.entry(rid).or_default().push((window, op.id.as_str()));
            match schedule.resource(rid) {
                None => out.push(Violation::new(
                    ViolationType::ResourceTypeMismatch,
                    &op.id,
                    format!("operation '{}' is bound to unknown resource '{rid}'", op.id),
                    90,
                )),
                Some(r) => {
                    if r.resource_type != rtype || !op.requires_type(rtype) {
                        out.push(Violation::new(
                            ViolationType::ResourceTypeMismatch,
                            &op.id,
                            format!(
                                "operation '{}' holds '{rid}' ({}) as '{rtype}'",
                                op.id, r.resource_type
                            ),
                            90,
                        ));
                    }
                    if !fits_any(&r.availability, window.start, window.end) {
                        out.push(Violation::new(
                            ViolationType::ResourceUnavailable,
                            &op.id,
                            format!(
                                "operation '{}' [{}, {}) is outside the windows of '{rid}'",
                                op.id, window.start, window.end
                            ),
                            70,
                        ));
                    }
                }
            }
        }

        for pred in &op.predecessors {
            let pred_end = schedule.operation(pred).and_then(|p| p.end);
            match pred_end {
                Some(end) if end <= window.start => {}
                Some(end) => out.push(Violation::new(
                    ViolationType::PrecedenceViolation,
                    &op.id,
                    format!(
                        "operation '{}' starts at {} before predecessor '{pred}' ends at {end}",
                        op.id, window.start
                    ),
                    90,
                )),
                None => out.push(Violation::new(
                    ViolationType::PrecedenceViolation,
                    &op.id,
                    format!("operation '{}' is scheduled but predecessor '{pred}' is not", op.id),
                    90,
                )),
            }
        }
    }

    for (rid, mut bookings) in per_resource {
        bookings.sort_by_key(|(w, id)| (w.start, *id));
        // Booking with the latest end seen so far; any later start before it overlaps.
        let mut reach: Option<(TimeWindow, &str)> = None;
        for (b, b_id) in bookings {
            if let Some((a, a_id)) = reach {
                if a.overlaps(&b) {
                    out.push(Violation::new(
                        ViolationType::DoubleBooking,
                        rid,
                        format!("'{a_id}' and '{b_id}' overlap on '{rid}'"),
                        100,
                    ));
                }
            }
            if reach.map_or(true, |(a, _)| b.end > a.end) {
                reach = Some((b, b_id));
            }
        }
    }

    for job in schedule.jobs() {
        if let (Some(end), Some(due)) = (job.end_time(), job.due_date()) {
            if end > due {
                out.push(Violation::new(
                    ViolationType::DeadlineMiss,
                    &job.id,
                    format!("job '{}' ends at {end}, due at {due}", job.id),
                    50,
                ));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::constraints::{SoakConstraint, WipLimitConstraint};
    use crate::dispatching::GreedyDispatcher;
    use crate::models::{Assignment, Operation};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const H: i64 = 3600;

    fn sample_resources() -> Vec<Resource> {
        vec![
            Resource::new("S1", "site"),
            Resource::new("S2", "site"),
            Resource::new("V1", "vehicle"),
        ]
    }

    fn sample_jobs() -> Vec<Job> {
        vec![
            Job::new("J1")
                .with_operation(Operation::new("O1", "J1", 1000).with_resource("site", ["S1"]))
                .with_operation(
                    Operation::new("O2", "J1", 2000)
                        .with_resource("site", ["S2"])
                        .with_predecessor("O1"),
                ),
            Job::new("J2").with_operation(Operation::new("O3", "J2", 1500).with_resource("vehicle", ["V1"])),
        ]
    }

    fn has(errors: &[ValidationError], kind: ValidationErrorKind) -> bool {
        errors.iter().any(|e| e.kind == kind)
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_jobs(), &sample_resources()).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let jobs = vec![
            Job::new("J1").with_operation(Operation::new("O1", "J1", 100)),
            Job::new("J1").with_operation(Operation::new("O1", "J1", 100)),
        ];
        let resources = vec![Resource::new("S1", "site"), Resource::new("S1", "site")];

        let errors = validate_input(&jobs, &resources).unwrap_err();
        assert_eq!(
            errors.iter().filter(|e| e.kind == ValidationErrorKind::DuplicateId).count(),
            3
        );
        assert!(errors.iter().any(|e| e.message.contains("resource")));
    }

    #[test]
    fn test_empty_job() {
        let errors = validate_input(&[Job::new("empty")], &sample_resources()).unwrap_err();
        assert!(has(&errors, ValidationErrorKind::EmptyJob));
    }

    #[test]
    fn test_bad_resource_references() {
        let jobs = vec![Job::new("J1")
            .with_operation(Operation::new("O1", "J1", 100).with_resource("site", ["NONEXISTENT"]))
            .with_operation(Operation::new("O2", "J1", 100).with_resource("site", ["V1"]))];
        let errors = validate_input(&jobs, &sample_resources()).unwrap_err();
        assert!(has(&errors, ValidationErrorKind::InvalidResourceReference));
        assert!(has(&errors, ValidationErrorKind::ResourceTypeMismatch));
    }

    #[test]
    fn test_invalid_predecessor() {
        let jobs = vec![Job::new("J1").with_operation(Operation::new("O1", "J1", 100).with_predecessor("NONEXISTENT"))];
        let errors = validate_input(&jobs, &[]).unwrap_err();
        assert!(has(&errors, ValidationErrorKind::InvalidPredecessor));
    }

    #[test]
    fn test_cyclic_dependency() {
        // O1 → O2 → O3 → O1
        let jobs = vec![Job::new("J1")
            .with_operation(Operation::new("O1", "J1", 100).with_predecessor("O3"))
            .with_operation(Operation::new("O2", "J1", 100).with_predecessor("O1"))
            .with_operation(Operation::new("O3", "J1", 100).with_predecessor("O2"))];
        let errors = validate_input(&jobs, &[]).unwrap_err();
        assert!(has(&errors, ValidationErrorKind::CyclicDependency));
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let jobs = vec![Job::new("J1")
            .with_operation(Operation::new("O1", "J1", 100))
            .with_operation(Operation::new("O2", "J1", 100).with_predecessor("O1"))
            .with_operation(Operation::new("O3", "J1", 100).with_predecessor("O2"))];
        assert!(validate_input(&jobs, &[]).is_ok());
    }

    #[test]
    fn test_clean_schedule_has_no_violations() {
        let mut s = Schedule::new();
        for r in sample_resources() {
            s.add_resource(r);
        }
        for j in sample_jobs() {
            s.add_job(j.with_due_date(10_000));
        }
        s.schedule_operation("O1", "S1", 0).unwrap();
        s.schedule_operation("O2", "S2", 1000).unwrap();
        s.schedule_operation("O3", "V1", 0).unwrap();
        assert!(validate_schedule(&s).is_empty());
    }

    #[test]
    fn test_detects_overlap_hidden_behind_short_booking() {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("S1", "site"));
        let mut job = Job::new("J1");
        for (id, start, end) in [("LONG", 0, 100), ("SHORT", 10, 20), ("LATE", 30, 40)] {
            job = job.with_operation(Operation::new(id, "J1", end - start).with_resource("site", ["S1"]));
        }
        s.add_job(job);
        // Written straight into operation state, past the commit checks.
        for (id, start, end) in [("LONG", 0, 100), ("SHORT", 10, 20), ("LATE", 30, 40)] {
            let op = s.operation_mut(id).unwrap();
            op.commit(start, end, Assignment::new().with("site", "S1"));
        }

        let mut pairs: Vec<String> = validate_schedule(&s)
            .into_iter()
            .filter(|v| v.violation_type == ViolationType::DoubleBooking)
            .map(|v| v.message)
            .collect();
        pairs.sort();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().any(|m| m.contains("'LONG' and 'SHORT'")));
        assert!(pairs.iter().any(|m| m.contains("'LONG' and 'LATE'")));
    }

    #[test]
    fn test_detects_deadline_miss() {
        let mut s = Schedule::new();
        for r in sample_resources() {
            s.add_resource(r);
        }
        s.add_job(sample_jobs().remove(1).with_due_date(1000));
        s.schedule_operation("O3", "V1", 0).unwrap();

        let violations = validate_schedule(&s);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::DeadlineMiss);
        assert_eq!(violations[0].entity_id, "J2");
    }

    // ======================== Randomized invariants ========================

    fn random_problem(rng: &mut StdRng) -> Schedule {
        let mut s = Schedule::new()
            .with_constraint(WipLimitConstraint::new(3).unwrap())
            .with_constraint(SoakConstraint::new());
        for i in 0..3 {
            s.add_resource(
                Resource::new(format!("S{i}"), "site")
                    .with_window(0, 10 * H)
                    .with_window(12 * H, 22 * H),
            );
        }
        for i in 0..2 {
            s.add_resource(Resource::new(format!("V{i}"), "vehicle"));
        }

        for j in 0..6 {
            let job_id = format!("J{j}");
            let mut job = Job::new(job_id.clone());
            let len = rng.random_range(1..=4);
            for k in 0..len {
                let (rtype, pool) = if rng.random_bool(0.7) {
                    ("site", &["S0", "S1", "S2"][..])
                } else {
                    ("vehicle", &["V0", "V1"][..])
                };
                let first = rng.random_range(0..pool.len());
                let count = rng.random_range(1..=pool.len());
                let candidates: Vec<&str> = (0..count).map(|i| pool[(first + i) % pool.len()]).collect();

                let mut op = Operation::new(format!("{job_id}_{k}"), &job_id, rng.random_range(1..=6) * 15 * 60)
                    .with_resource(rtype, candidates)
                    .with_metadata("priority", rng.random_range(1..=5i32));
                if k > 0 {
                    op = op.with_predecessor(format!("{job_id}_{}", k - 1));
                    if rng.random_bool(0.3) {
                        op = op.with_metadata("soak_minutes", rng.random_range(1..=4i32) * 30);
                    }
                }
                job = job.with_operation(op);
            }
            s.add_job(job);
        }
        s
    }

    fn assert_invariants(s: &Schedule) {
        let violations: Vec<_> = validate_schedule(s)
            .into_iter()
            .filter(|v| v.violation_type != ViolationType::DeadlineMiss)
            .collect();
        assert!(violations.is_empty(), "{violations:?}");

        let intervals: Vec<(i64, i64, &str)> = s
            .scheduled_operations()
            .filter_map(|o| Some((o.start?, o.end?, o.job_id.as_str())))
            .collect();
        for &(t, _, _) in &intervals {
            let active: HashSet<&str> = intervals
                .iter()
                .filter(|(a, b, _)| *a <= t && t < *b)
                .map(|(_, _, j)| *j)
                .collect();
            assert!(active.len() <= 3, "WIP {} at {t}", active.len());
        }

        for op in s.scheduled_operations() {
            let (Some(lag), Some(start)) = (SoakConstraint::soak_secs(op), op.start) else {
                continue;
            };
            let prior = s
                .operations_of_job(&op.job_id)
                .filter(|o| o.id != op.id)
                .filter_map(|o| o.end)
                .filter(|&e| e <= start)
                .max();
            if let Some(prior) = prior {
                assert!(start >= prior + lag, "soak broken for {}", op.id);
            }
        }
    }

    #[test]
    fn test_random_commits_keep_invariants() {
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut s = random_problem(&mut rng);

            for _ in 0..200 {
                let ready: Vec<Operation> = s.ready_operations().into_iter().cloned().collect();
                if ready.is_empty() {
                    break;
                }
                let op = &ready[rng.random_range(0..ready.len())];
                let req = &op.requirements[0];
                let rid = &req.candidates[rng.random_range(0..req.candidates.len())];
                let assignment = Assignment::new().with(req.resource_type.clone(), rid.clone());
                let start = rng.random_range(0..22 * 4) * 15 * 60;
                s.schedule_operation_multi(&op.id, &assignment, start).unwrap();
            }
            assert_invariants(&s);
        }
    }

    #[test]
    fn test_random_dispatch_keeps_invariants() {
        for seed in 100..110u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut s = random_problem(&mut rng);
            let report = GreedyDispatcher::new(DispatchConfig::for_day(0, 22 * H))
                .run(&mut s)
                .unwrap();
            assert_invariants(&s);
            assert_eq!(
                report.unscheduled.len(),
                s.unscheduled_operations().count()
            );
        }
    }
}
