//! Duration adjustment policies.
//!
//! A policy adds seconds on top of an operation's base duration for a
//! concrete resource assignment, e.g. extra handling time at far-away
//! sites. The effective duration is used consistently by commits and slot
//! searches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Schedule;
use crate::models::{Assignment, Operation};

/// Extra seconds for an operation on a concrete assignment.
pub trait DurationAdjustment: fmt::Debug + Send + Sync {
    /// Additional seconds (negative values are treated as zero).
    fn additional_secs(&self, schedule: &Schedule, op: &Operation, assignment: &Assignment) -> i64;
}

/// Adapts a closure into a [`DurationAdjustment`].
pub struct FnAdjustment<F>(F);

impl<F> FnAdjustment<F>
where
    F: Fn(&Schedule, &Operation, &Assignment) -> i64 + Send + Sync,
{
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> fmt::Debug for FnAdjustment<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnAdjustment")
    }
}

impl<F> DurationAdjustment for FnAdjustment<F>
where
    F: Fn(&Schedule, &Operation, &Assignment) -> i64 + Send + Sync,
{
    fn additional_secs(&self, schedule: &Schedule, op: &Operation, assignment: &Assignment) -> i64 {
        (self.0)(schedule, op, assignment)
    }
}

/// Extra time when a resource's trailing ID number reaches a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdThresholdRule {
    /// Smallest trailing ID number the rule applies to.
    pub id_number_min: u64,
    /// Seconds added.
    pub additional_secs: i64,
}

/// Base surcharge for every assignment plus per-resource ID thresholds.
///
/// Rules are kept per resource type. For each assigned resource of a type
/// with rules whose ID ends in a number (`"Site_7"` → 7), the matching rule
/// with the highest threshold applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRuleAdjustment {
    /// Seconds added to every assignment.
    pub base_secs: i64,
    /// Threshold rules by resource type.
    pub rules: BTreeMap<String, Vec<IdThresholdRule>>,
}

impl ResourceRuleAdjustment {
    /// Creates a policy with only a base surcharge.
    pub fn new(base_secs: i64) -> Self {
        Self {
            base_secs,
            ..Self::default()
        }
    }

    /// Adds a threshold rule for `resource_type`.
    pub fn with_rule(
        mut self,
        resource_type: impl Into<String>,
        id_number_min: u64,
        additional_secs: i64,
    ) -> Self {
        self.rules
            .entry(resource_type.into())
            .or_default()
            .push(IdThresholdRule {
                id_number_min,
                additional_secs,
            });
        self
    }

    fn rule_for<'a>(rules: &'a [IdThresholdRule], resource_id: &str) -> Option<&'a IdThresholdRule> {
        let n = trailing_number(resource_id)?;
        rules
            .iter()
            .filter(|r| n >= r.id_number_min)
            .max_by_key(|r| r.id_number_min)
    }
}

impl DurationAdjustment for ResourceRuleAdjustment {
    fn additional_secs(&self, _schedule: &Schedule, _op: &Operation, assignment: &Assignment) -> i64 {
        let per_resource: i64 = self
            .rules
            .iter()
            .flat_map(|(rtype, rules)| {
                assignment
                    .get(rtype)
                    .iter()
                    .filter_map(move |id| Self::rule_for(rules, id))
            })
            .map(|r| r.additional_secs)
            .sum();
        self.base_secs + per_resource
    }
}

/// Number formed by the trailing ASCII digits of `id`.
pub(crate) fn trailing_number(id: &str) -> Option<u64> {
    let digits = id.len() - id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    id[id.len() - digits..].parse().ok()
}
