//! Rule engine for multi-criteria candidate ranking.
//!
//! Composes candidate rules with configurable evaluation modes and
//! tie-breaking strategies.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::{rules, Candidate, CandidateRule, DispatchContext, RuleScore};

/// How multiple rules are combined.
#[derive(Debug, Clone, Default)]
pub enum EvaluationMode {
    /// Apply rules in sequence; use next rule only on ties.
    #[default]
    Sequential,
    /// Compute weighted sum of all rule scores.
    Weighted,
}

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order.
    #[default]
    NextRule,
    /// Deterministic by operation ID (lexicographic).
    ById,
}

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn CandidateRule>,
    weight: f64,
}

/// A composable rule engine for candidate ranking.
///
/// # Example
/// ```
/// use u_jobshop::dispatching::{rules, EvaluationMode, RuleEngine};
///
/// let engine = RuleEngine::new()
///     .with_mode(EvaluationMode::Weighted)
///     .with_weighted_rule(rules::PriorityBucket, 2.0)
///     .with_weighted_rule(rules::Slack, 0.5);
/// assert_eq!(engine.rule_names(), ["PRIORITY", "SLACK"]);
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<WeightedRule>,
    mode: EvaluationMode,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: EvaluationMode::Sequential,
            tie_breaker: TieBreaker::NextRule,
            epsilon: 1e-9,
        }
    }

    /// Priority bucket, then rank, then earliest start, then ID.
    pub fn sequential_default() -> Self {
        Self::new()
            .with_rule(rules::PriorityBucket)
            .with_tie_breaker(rules::PriorityRank)
            .with_tie_breaker(rules::EarliestStart)
            .with_final_tie_breaker(TieBreaker::ById)
    }

    /// Weighted blend of priority, slack, density, scarcity and unlocked
    /// work. Ties go to the lower ID.
    pub fn weighted_default() -> Self {
        Self::new()
            .with_mode(EvaluationMode::Weighted)
            .with_weighted_rule(rules::PriorityBucket, 10.0)
            .with_weighted_rule(rules::Slack, 0.5)
            .with_weighted_rule(rules::Density, 2.0)
            .with_weighted_rule(rules::ResourceScarcity, 1.0)
            .with_weighted_rule(rules::UnlockedDescendants, 1.5)
            .with_final_tie_breaker(TieBreaker::ById)
    }

    /// Adds a primary rule (weight 1.0).
    pub fn with_rule<R: CandidateRule + 'static>(self, rule: R) -> Self {
        self.with_weighted_rule(rule, 1.0)
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: CandidateRule + 'static>(mut self, rule: R, weight: f64) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Adds a tie-breaking rule (weight 0.0, only matters in Sequential mode).
    pub fn with_tie_breaker<R: CandidateRule + 'static>(self, rule: R) -> Self {
        self.with_weighted_rule(rule, 0.0)
    }

    /// Sets the evaluation mode.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Names of the registered rules in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.rule.name()).collect()
    }

    /// Sorts candidates best first.
    ///
    /// Returns indices into `candidates`.
    pub fn sort_indices(&self, candidates: &[Candidate], context: &DispatchContext) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..candidates.len()).collect();

        match &self.mode {
            EvaluationMode::Sequential => {
                indices.sort_by(|&a, &b| self.compare_sequential(&candidates[a], &candidates[b], context));
            }
            EvaluationMode::Weighted => {
                let scores: Vec<f64> = candidates.iter().map(|c| self.score(c, context)).collect();
                indices.sort_by(|&a, &b| {
                    let by_score = if (scores[a] - scores[b]).abs() > self.epsilon {
                        scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal)
                    } else {
                        Ordering::Equal
                    };
                    by_score.then_with(|| self.final_tie(&candidates[a], &candidates[b]))
                });
            }
        }

        indices
    }

    /// Index of the best candidate.
    pub fn select_best(&self, candidates: &[Candidate], context: &DispatchContext) -> Option<usize> {
        self.sort_indices(candidates, context).first().copied()
    }

    /// Per-rule weighted scores of a single candidate.
    pub fn evaluate(&self, candidate: &Candidate, context: &DispatchContext) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(candidate, context) * wr.weight)
            .collect()
    }

    /// Weighted sum of all rule scores.
    pub fn score(&self, candidate: &Candidate, context: &DispatchContext) -> RuleScore {
        self.evaluate(candidate, context).into_iter().sum()
    }

    fn compare_sequential(&self, a: &Candidate, b: &Candidate, context: &DispatchContext) -> Ordering {
        for wr in &self.rules {
            let score_a = wr.rule.evaluate(a, context);
            let score_b = wr.rule.evaluate(b, context);

            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }
        self.final_tie(a, b)
    }

    fn final_tie(&self, a: &Candidate, b: &Candidate) -> Ordering {
        match &self.tie_breaker {
            TieBreaker::NextRule => Ordering::Equal,
            TieBreaker::ById => a.operation_id.cmp(&b.operation_id),
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Operation};
    use crate::schedule::SlotCandidate;

    fn make_candidate(id: &str, start: i64, duration: i64, priority: i32) -> Candidate {
        let op = Operation::new(id, "J1", duration)
            .with_resource("site", ["S1"])
            .with_metadata("priority", priority);
        Candidate::new(
            &op,
            SlotCandidate {
                start,
                end: start + duration,
                assignment: Assignment::new().with("site", "S1"),
            },
        )
    }

    #[test]
    fn test_priority_ordering() {
        let candidates = vec![
            make_candidate("low", 0, 3600, 5),
            make_candidate("high", 0, 3600, 1),
            make_candidate("mid", 0, 3600, 3),
        ];
        let ctx = DispatchContext::for_day(0, 86_400);
        let engine = RuleEngine::new().with_rule(rules::PriorityBucket);

        let indices = engine.sort_indices(&candidates, &ctx);
        assert_eq!(candidates[indices[0]].operation_id, "high");
        assert_eq!(candidates[indices[1]].operation_id, "mid");
        assert_eq!(candidates[indices[2]].operation_id, "low");
    }

    #[test]
    fn test_sequential_with_tie_breaker() {
        let candidates = vec![
            make_candidate("A", 7200, 3600, 2),
            make_candidate("B", 3600, 3600, 2),
        ];
        let ctx = DispatchContext::for_day(0, 86_400);
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityBucket)
            .with_tie_breaker(rules::EarliestStart);

        // Same bucket → earlier start wins.
        assert_eq!(engine.select_best(&candidates, &ctx), Some(1));
    }

    #[test]
    fn test_weighted_mode() {
        let candidates = vec![
            make_candidate("A", 0, 3600, 1),
            make_candidate("B", 0, 3600, 3),
        ];
        let ctx = DispatchContext::for_day(0, 10 * 3600);
        let engine = RuleEngine::new()
            .with_mode(EvaluationMode::Weighted)
            .with_weighted_rule(rules::PriorityBucket, 1.0)
            .with_weighted_rule(rules::Slack, 1.0);

        // A: 1 + 9 = 10, B: 3 + 9 = 12
        assert_eq!(engine.select_best(&candidates, &ctx), Some(0));
        assert!((engine.score(&candidates[1], &ctx) - 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_by_id_tie_breaker() {
        let candidates = vec![make_candidate("B", 0, 60, 5), make_candidate("A", 0, 60, 5)];
        let ctx = DispatchContext::for_day(0, 86_400);
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityBucket)
            .with_final_tie_breaker(TieBreaker::ById);
        assert_eq!(candidates[engine.sort_indices(&candidates, &ctx)[0]].operation_id, "A");

        let weighted = RuleEngine::weighted_default();
        assert_eq!(candidates[weighted.sort_indices(&candidates, &ctx)[0]].operation_id, "A");
    }

    #[test]
    fn test_empty_candidates() {
        let ctx = DispatchContext::for_day(0, 86_400);
        let engine = RuleEngine::sequential_default();
        assert!(engine.sort_indices(&[], &ctx).is_empty());
        assert!(engine.select_best(&[], &ctx).is_none());
    }

    #[test]
    fn test_evaluate_scores() {
        let c = make_candidate("T1", 3600, 3600, 2);
        let ctx = DispatchContext::for_day(0, 86_400);
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityBucket)
            .with_weighted_rule(rules::EarliestStart, 0.5);

        let scores = engine.evaluate(&c, &ctx);
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 2.0).abs() < 1e-10);
        assert!((scores[1] - 1800.0).abs() < 1e-10);
    }

    #[test]
    fn test_defaults_and_debug() {
        assert_eq!(
            RuleEngine::sequential_default().rule_names(),
            ["PRIORITY", "RANK", "EST"]
        );
        let dbg = format!("{:?}", RuleEngine::weighted_default());
        assert!(dbg.contains("SLACK(w=0.5)"));
    }
}
