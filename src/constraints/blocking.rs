//! No-wait chains.

use super::{latest_predecessor_end, Constraint};
use crate::models::{Operation, Resource, Timestamp};
use crate::schedule::Schedule;

/// Operations must start exactly when their last predecessor ends.
///
/// Operations without committed predecessors are unconstrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingConstraint {
    /// Allowed distance between start and predecessor end (seconds).
    pub epsilon_secs: i64,
}

impl BlockingConstraint {
    /// Creates an exact no-wait rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tolerance.
    pub fn with_epsilon(mut self, epsilon_secs: i64) -> Self {
        self.epsilon_secs = epsilon_secs.max(0);
        self
    }
}

impl Constraint for BlockingConstraint {
    fn name(&self) -> &'static str {
        "blocking"
    }

    fn is_feasible(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        start: Timestamp,
        _end: Timestamp,
    ) -> bool {
        match latest_predecessor_end(schedule, op) {
            Some(pred_end) => (start - pred_end).abs() <= self.epsilon_secs,
            None => true,
        }
    }

    fn adjust_earliest_start(
        &self,
        schedule: &Schedule,
        op: &Operation,
        _resource: &Resource,
        earliest: Timestamp,
    ) -> Timestamp {
        latest_predecessor_end(schedule, op).map_or(earliest, |e| earliest.max(e))
    }

    fn latest_start(&self, schedule: &Schedule, op: &Operation) -> Option<Timestamp> {
        latest_predecessor_end(schedule, op).map(|e| e + self.epsilon_secs)
    }

    fn requires_no_wait(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Job;

    fn schedule() -> Schedule {
        let mut s = Schedule::new();
        s.add_resource(Resource::new("R1", "machine"));
        s.add_job(
            Job::new("J1")
                .with_operation(Operation::new("A", "J1", 900).with_resource("machine", ["R1"]))
                .with_operation(
                    Operation::new("B", "J1", 900)
                        .with_resource("machine", ["R1"])
                        .with_predecessor("A"),
                ),
        );
        s
    }

    #[test]
    fn test_blocking_requires_exact_start() {
        let mut s = schedule();
        assert!(s.schedule_operation("A", "R1", 0).unwrap().is_placed());

        let c = BlockingConstraint::new();
        let b = s.operation("B").unwrap().clone();
        let r = s.resource("R1").unwrap();
        assert!(c.is_feasible(&s, &b, r, 900, 1800));
        assert!(!c.is_feasible(&s, &b, r, 960, 1860));
        assert_eq!(c.adjust_earliest_start(&s, &b, r, 0), 900);
        assert_eq!(c.adjust_earliest_start(&s, &b, r, 1000), 1000);
    }

    #[test]
    fn test_blocking_epsilon() {
        let mut s = schedule();
        s.schedule_operation("A", "R1", 0).unwrap();
        let c = BlockingConstraint::new().with_epsilon(60);
        let b = s.operation("B").unwrap().clone();
        let r = s.resource("R1").unwrap();
        assert!(c.is_feasible(&s, &b, r, 960, 1860));
        assert!(!c.is_feasible(&s, &b, r, 961, 1861));
    }

    #[test]
    fn test_blocking_ignores_unscheduled_predecessors() {
        let s = schedule();
        let c = BlockingConstraint::new();
        let b = s.operation("B").unwrap().clone();
        let r = s.resource("R1").unwrap();
        assert!(c.is_feasible(&s, &b, r, 5000, 5900));
        assert_eq!(c.adjust_earliest_start(&s, &b, r, 7), 7);
        assert!(c.requires_no_wait());
    }
}
