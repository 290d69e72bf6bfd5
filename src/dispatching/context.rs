//! Dispatch context for candidate rule evaluation.

use std::collections::{HashMap, HashSet};

use crate::models::{Operation, Timestamp};
use crate::schedule::Schedule;

/// Problem-level facts shared by every round of a dispatch run.
///
/// Built once from the schedule before dispatching; precedence structure
/// does not change while operations are placed.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    /// Dispatch day opening.
    pub day_start: Timestamp,
    /// Dispatch day close.
    pub day_end: Timestamp,
    /// Global priority rank per operation (0 = first).
    pub priority_ranks: HashMap<String, usize>,
    /// Number of distinct transitive successors per operation.
    pub descendant_counts: HashMap<String, usize>,
    /// Direct successors per operation.
    pub children: HashMap<String, Vec<String>>,
}

impl DispatchContext {
    /// Empty context for one day.
    pub fn for_day(day_start: Timestamp, day_end: Timestamp) -> Self {
        Self {
            day_start,
            day_end,
            ..Default::default()
        }
    }

    /// Context with precedence facts and naive priority ranks derived from
    /// `schedule`.
    ///
    /// Ranks order operations by priority bucket, then by descendant count
    /// (more first), then by ID.
    pub fn from_schedule(schedule: &Schedule, day_start: Timestamp, day_end: Timestamp) -> Self {
        let children = children_map(schedule);
        let descendant_counts = descendant_counts(&children);

        let mut ops: Vec<&Operation> = schedule.operations().collect();
        ops.sort_by(|a, b| {
            a.priority()
                .total_cmp(&b.priority())
                .then_with(|| {
                    let da = descendant_counts.get(&a.id).copied().unwrap_or(0);
                    let db = descendant_counts.get(&b.id).copied().unwrap_or(0);
                    db.cmp(&da)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        let priority_ranks = ops
            .iter()
            .enumerate()
            .map(|(rank, op)| (op.id.clone(), rank))
            .collect();

        Self {
            day_start,
            day_end,
            priority_ranks,
            descendant_counts,
            children,
        }
    }

    /// Overrides the rank of one operation.
    pub fn with_priority_rank(mut self, op_id: impl Into<String>, rank: usize) -> Self {
        self.priority_ranks.insert(op_id.into(), rank);
        self
    }

    /// Rank of an operation, if ranked.
    pub fn rank_of(&self, op_id: &str) -> Option<usize> {
        self.priority_ranks.get(op_id).copied()
    }

    /// Transitive successor count (0 if unknown).
    pub fn descendants_of(&self, op_id: &str) -> usize {
        self.descendant_counts.get(op_id).copied().unwrap_or(0)
    }

    /// Direct successors.
    pub fn children_of(&self, op_id: &str) -> &[String] {
        self.children.get(op_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Day length in seconds.
    pub fn day_secs(&self) -> i64 {
        (self.day_end - self.day_start).max(0)
    }
}

fn children_map(schedule: &Schedule) -> HashMap<String, Vec<String>> {
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for op in schedule.operations() {
        for pred in &op.predecessors {
            children.entry(pred.clone()).or_default().push(op.id.clone());
        }
    }
    for list in children.values_mut() {
        list.sort();
        list.dedup();
    }
    children
}

/// Distinct reachable successors per node. Cycles do not loop.
fn descendant_counts(children: &HashMap<String, Vec<String>>) -> HashMap<String, usize> {
    let mut counts = HashMap::with_capacity(children.len());
    for root in children.keys() {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![root.as_str()];
        while let Some(node) = stack.pop() {
            for child in children.get(node).into_iter().flatten() {
                if child != root && seen.insert(child.as_str()) {
                    stack.push(child.as_str());
                }
            }
        }
        counts.insert(root.clone(), seen.len());
    }
    counts
}
