//! Built-in candidate rules.
//!
//! # Categories
//!
//! - **Priority**: PRIORITY, RANK
//! - **Time**: EST, SLACK, DENSITY
//! - **Structure**: SCARCITY, UNLOCK
//!
//! # Score Convention
//! All rules return lower scores for candidates that should go first.
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use super::{Candidate, CandidateRule, DispatchContext, RuleScore};

const HOUR: f64 = 3600.0;

// ======================== Priority rules ========================

/// Priority bucket from operation metadata (1 = most important).
#[derive(Debug, Clone, Copy)]
pub struct PriorityBucket;

impl CandidateRule for PriorityBucket {
    fn name(&self) -> &'static str {
        "PRIORITY"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &DispatchContext) -> RuleScore {
        candidate.priority
    }

    fn description(&self) -> &'static str {
        "Priority Bucket"
    }
}

/// Global priority rank from the dispatch context.
///
/// Unranked operations go last.
#[derive(Debug, Clone, Copy)]
pub struct PriorityRank;

impl CandidateRule for PriorityRank {
    fn name(&self) -> &'static str {
        "RANK"
    }

    fn evaluate(&self, candidate: &Candidate, context: &DispatchContext) -> RuleScore {
        context
            .rank_of(&candidate.operation_id)
            .map_or(f64::MAX, |r| r as f64)
    }

    fn description(&self) -> &'static str {
        "Priority Rank"
    }
}

// ======================== Time rules ========================

/// Earliest Start Time of the found slot.
#[derive(Debug, Clone, Copy)]
pub struct EarliestStart;

impl CandidateRule for EarliestStart {
    fn name(&self) -> &'static str {
        "EST"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &DispatchContext) -> RuleScore {
        candidate.slot.start as f64
    }

    fn description(&self) -> &'static str {
        "Earliest Start Time"
    }
}

/// Hours left in the dispatch day after the slot ends.
///
/// Less slack = more urgent.
#[derive(Debug, Clone, Copy)]
pub struct Slack;

impl CandidateRule for Slack {
    fn name(&self) -> &'static str {
        "SLACK"
    }

    fn evaluate(&self, candidate: &Candidate, context: &DispatchContext) -> RuleScore {
        (context.day_end - candidate.slot.end).max(0) as f64 / HOUR
    }

    fn description(&self) -> &'static str {
        "Remaining Day Slack"
    }
}

/// Throughput density: importance per effective hour.
///
/// `weight = 1 / priority`, score = `-(weight / hours)`.
#[derive(Debug, Clone, Copy)]
pub struct Density;

impl CandidateRule for Density {
    fn name(&self) -> &'static str {
        "DENSITY"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &DispatchContext) -> RuleScore {
        let hours = (candidate.effective_duration_secs() as f64 / HOUR).max(0.01);
        let weight = 1.0 / candidate.priority.max(1.0);
        -(weight / hours)
    }

    fn description(&self) -> &'static str {
        "Throughput Density"
    }
}

// ======================== Structure rules ========================

/// Resource scarcity: fewer eligible resources go first.
#[derive(Debug, Clone, Copy)]
pub struct ResourceScarcity;

impl CandidateRule for ResourceScarcity {
    fn name(&self) -> &'static str {
        "SCARCITY"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &DispatchContext) -> RuleScore {
        candidate.resource_options.max(1) as f64
    }

    fn description(&self) -> &'static str {
        "Resource Scarcity"
    }
}

/// Operations that unlock more downstream work go first.
#[derive(Debug, Clone, Copy)]
pub struct UnlockedDescendants;

impl CandidateRule for UnlockedDescendants {
    fn name(&self) -> &'static str {
        "UNLOCK"
    }

    fn evaluate(&self, candidate: &Candidate, context: &DispatchContext) -> RuleScore {
        -(context.descendants_of(&candidate.operation_id) as f64)
    }

    fn description(&self) -> &'static str {
        "Unlocked Descendants"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Operation};
    use crate::schedule::SlotCandidate;

    fn make_candidate(id: &str, start: i64, end: i64, priority: i32, options: usize) -> Candidate {
        let ids: Vec<String> = (0..options).map(|i| format!("S{i}")).collect();
        let op = Operation::new(id, "J1", end - start)
            .with_resource("site", ids)
            .with_metadata("priority", priority);
        Candidate::new(
            &op,
            SlotCandidate {
                start,
                end,
                assignment: Assignment::new().with("site", "S0"),
            },
        )
    }

    #[test]
    fn test_priority_bucket() {
        let ctx = DispatchContext::for_day(0, 86_400);
        let c = make_candidate("A", 0, 3600, 2, 1);
        assert_eq!(PriorityBucket.evaluate(&c, &ctx), 2.0);
    }

    #[test]
    fn test_priority_rank() {
        let ctx = DispatchContext::for_day(0, 86_400).with_priority_rank("A", 4);
        assert_eq!(PriorityRank.evaluate(&make_candidate("A", 0, 60, 5, 1), &ctx), 4.0);
        assert_eq!(PriorityRank.evaluate(&make_candidate("B", 0, 60, 5, 1), &ctx), f64::MAX);
    }

    #[test]
    fn test_earliest_start() {
        let ctx = DispatchContext::for_day(0, 86_400);
        assert_eq!(EarliestStart.evaluate(&make_candidate("A", 7200, 9000, 5, 1), &ctx), 7200.0);
    }

    #[test]
    fn test_slack() {
        let ctx = DispatchContext::for_day(0, 10 * 3600);
        let c = make_candidate("A", 0, 4 * 3600, 5, 1);
        assert!((Slack.evaluate(&c, &ctx) - 6.0).abs() < 1e-10);
        let late = make_candidate("B", 0, 11 * 3600, 5, 1);
        assert_eq!(Slack.evaluate(&late, &ctx), 0.0);
    }

    #[test]
    fn test_density_prefers_short_important() {
        let ctx = DispatchContext::for_day(0, 86_400);
        let short_urgent = make_candidate("A", 0, 1800, 1, 1);
        let long_routine = make_candidate("B", 0, 4 * 3600, 5, 1);
        assert!(Density.evaluate(&short_urgent, &ctx) < Density.evaluate(&long_routine, &ctx));
        assert!((Density.evaluate(&short_urgent, &ctx) + 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_resource_scarcity() {
        let ctx = DispatchContext::for_day(0, 86_400);
        let scarce = make_candidate("A", 0, 60, 5, 1);
        let flexible = make_candidate("B", 0, 60, 5, 4);
        assert_eq!(ResourceScarcity.evaluate(&scarce, &ctx), 1.0);
        assert_eq!(ResourceScarcity.evaluate(&flexible, &ctx), 4.0);
    }

    #[test]
    fn test_unlocked_descendants() {
        let mut ctx = DispatchContext::for_day(0, 86_400);
        ctx.descendant_counts.insert("A".into(), 3);
        assert_eq!(UnlockedDescendants.evaluate(&make_candidate("A", 0, 60, 5, 1), &ctx), -3.0);
        assert_eq!(UnlockedDescendants.evaluate(&make_candidate("B", 0, 60, 5, 1), &ctx), 0.0);
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(Slack.name(), "SLACK");
        assert_eq!(Density.description(), "Throughput Density");
    }
}
