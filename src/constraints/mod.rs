//! Pluggable placement constraints.
//!
//! A constraint answers two questions about placing an operation on a
//! resource:
//!
//! - [`Constraint::is_feasible`]: hard veto for a concrete `[start, end)`.
//! - [`Constraint::adjust_earliest_start`]: the earliest start this rule
//!   allows at or after a candidate time. Never moves backward.
//!
//! Both default to pass-through, so a rule only overrides what it needs.
//! Constraints read the [`Schedule`] but never mutate it; all mutation goes
//! through the schedule's commit methods.
//!
//! # Built-in Rules
//!
//! | Rule | Veto | Push |
//! |------|------|------|
//! | [`BlockingConstraint`] | start ≠ latest predecessor end | to latest predecessor end |
//! | [`ChangeoverConstraint`] | key switch without gap | past previous booking + gap |
//! | [`DueDateConstraint`] | end after job deadline | none |
//! | [`WipLimitConstraint`] | too many concurrent jobs | none |
//! | [`TimeLagConstraint`] | start later than max delay | to min delay |
//! | [`ShiftConstraint`] | outside daily shift windows | to next shift start |
//! | [`SoakConstraint`] | soak lag not elapsed, or a committed soak cut short | to end of soak |
//!
//! # Operation Probing
//! Before commit, constraints see a copy of the operation that already
//! carries the candidate [`Assignment`](crate::models::Assignment) but no
//! start/end. Rules keyed on assigned resources rely on this.
//!
//! # Reference
//! Brucker (2007), "Scheduling Algorithms", Ch. 2

mod blocking;
mod changeover;
mod due_date;
mod shift;
mod soak;
mod time_lag;
mod wip;

pub use blocking::BlockingConstraint;
pub use changeover::{ChangeoverConstraint, ChangeoverKey};
pub use due_date::DueDateConstraint;
pub use shift::{ShiftConstraint, ShiftMode};
pub use soak::SoakConstraint;
pub use time_lag::TimeLagConstraint;
pub use wip::WipLimitConstraint;

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::models::{Operation, Resource, Timestamp};
use crate::schedule::Schedule;

/// A feasibility and earliest-start rule.
///
/// Implementations must be monotonic: `adjust_earliest_start` returns a
/// value `>= earliest`.
pub trait Constraint: Debug + Send + Sync {
    /// Short rule name, used in rejections and logs.
    fn name(&self) -> &'static str;

    /// Whether placing `op` on `resource` over `[start, end)` is allowed.
    fn is_feasible(
        &self,
        _schedule: &Schedule,
        _op: &Operation,
        _resource: &Resource,
        _start: Timestamp,
        _end: Timestamp,
    ) -> bool {
        true
    }

    /// Earliest start this rule allows at or after `earliest`.
    fn adjust_earliest_start(
        &self,
        _schedule: &Schedule,
        _op: &Operation,
        _resource: &Resource,
        earliest: Timestamp,
    ) -> Timestamp {
        earliest
    }

    /// Latest start this rule can ever accept for `op` given the current
    /// committed state. Slot searches stop once they pass it.
    fn latest_start(&self, _schedule: &Schedule, _op: &Operation) -> Option<Timestamp> {
        None
    }

    /// Whether jobs under this rule must run as no-wait chains.
    fn requires_no_wait(&self) -> bool {
        false
    }
}

/// Restricts a rule to certain resource types. Empty = every type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeFilter {
    types: Vec<String>,
}

impl ResourceTypeFilter {
    /// Matches every resource.
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches only the given types.
    pub fn only<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the rule applies to this resource.
    pub fn applies_to(&self, resource: &Resource) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| *t == resource.resource_type)
    }

    /// Listed types (empty = all).
    pub fn types(&self) -> &[String] {
        &self.types
    }
}

/// Latest end among committed predecessors of `op`.
///
/// Unknown or unscheduled predecessors are skipped.
pub(crate) fn latest_predecessor_end(schedule: &Schedule, op: &Operation) -> Option<Timestamp> {
    op.predecessors
        .iter()
        .filter_map(|p| schedule.operation(p).and_then(|o| o.end))
        .max()
}
