//! Candidate scoring and greedy dispatch.
//!
//! Each dispatch round turns every ready operation into a [`Candidate`]
//! (its earliest feasible slot plus a few features), ranks the candidates
//! with a [`RuleEngine`], and commits the best one. A repair pass then
//! tries to fit high-value leftovers by evicting a single cheaper
//! booking.
//!
//! # Usage
//!
//! ```
//! use u_jobshop::dispatching::{rules, RuleEngine, TieBreaker};
//!
//! let engine = RuleEngine::new()
//!     .with_rule(rules::PriorityBucket)
//!     .with_tie_breaker(rules::EarliestStart)
//!     .with_final_tie_breaker(TieBreaker::ById);
//! assert_eq!(engine.rule_names(), ["PRIORITY", "EST"]);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

mod context;
mod engine;
mod greedy;
pub mod rules;

pub use context::DispatchContext;
pub use engine::{EvaluationMode, RuleEngine, TieBreaker};
pub use greedy::{Decision, DispatchReport, GreedyDispatcher};

use std::fmt::Debug;

use crate::models::Operation;
use crate::schedule::SlotCandidate;

/// Score returned by a candidate rule.
///
/// Lower scores = higher priority (dispatched first).
pub type RuleScore = f64;

/// A ready operation together with its earliest feasible placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Operation ID.
    pub operation_id: String,
    /// Owning job.
    pub job_id: String,
    /// Earliest feasible placement.
    pub slot: SlotCandidate,
    /// Priority bucket (lower = more important).
    pub priority: f64,
    /// Base duration without adjustments (seconds).
    pub duration_secs: i64,
    /// Eligible resources across all requirements.
    pub resource_options: usize,
}

impl Candidate {
    /// Describes `op` placed at `slot`.
    pub fn new(op: &Operation, slot: SlotCandidate) -> Self {
        Self {
            operation_id: op.id.clone(),
            job_id: op.job_id.clone(),
            slot,
            priority: op.priority(),
            duration_secs: op.duration_secs,
            resource_options: op.candidate_resources().len(),
        }
    }

    /// Duration of the found slot, adjustments included (seconds).
    #[inline]
    pub fn effective_duration_secs(&self) -> i64 {
        self.slot.end - self.slot.start
    }
}

/// A rule that scores dispatch candidates.
///
/// # Score Convention
/// **Lower score = higher priority.**
///
/// # Reference
/// Pinedo (2016), "Scheduling", Ch. 4: Priority Dispatching
pub trait CandidateRule: Send + Sync + Debug {
    /// Rule name (e.g. "SLACK").
    fn name(&self) -> &'static str;

    /// Scores a candidate.
    fn evaluate(&self, candidate: &Candidate, context: &DispatchContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
