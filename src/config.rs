//! In-process configuration.
//!
//! Plain `serde` structs that turn a settings document into constraint
//! objects, a duration policy, and dispatcher settings. Loading the
//! document (file, env, CLI) is the caller's job.
//!
//! ```
//! use u_jobshop::config::ConstraintConfig;
//!
//! let config = ConstraintConfig {
//!     wip_limit: Some(4),
//!     ..ConstraintConfig::default()
//! };
//! let constraints = config.build_constraints().unwrap();
//! assert!(constraints.iter().any(|c| c.name() == "wip_limit"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constraints::{
    ChangeoverConstraint, ChangeoverKey, Constraint, DueDateConstraint, ResourceTypeFilter,
    ShiftConstraint, ShiftMode, SoakConstraint, TimeLagConstraint, WipLimitConstraint,
};
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{DailyWindow, Operation, Timestamp, DEFAULT_PRIORITY};
use crate::schedule::ResourceRuleAdjustment;

/// `(hour, minute)` time of day.
pub type HourMinute = (u32, u32);

/// Constraint set settings.
///
/// Zero gaps and empty window maps disable the matching rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    /// Named daily shift windows.
    pub shift_windows: BTreeMap<String, (HourMinute, HourMinute)>,
    /// `strict`, `allow_overrun` or `ignore`.
    pub shift_mode: String,
    /// Resource types the shift rule applies to (empty = all).
    pub shift_resource_type_filter: Vec<String>,
    /// Gap between bookings of different occupants on a changeover resource.
    pub site_changeover_minutes: f64,
    /// Gap between bookings at different locations on a transfer resource.
    pub vehicle_transfer_minutes: f64,
    /// Type whose bookings need a changeover when the transfer resource changes.
    pub changeover_resource_type: String,
    /// Type whose bookings need a transfer when the changeover resource changes.
    pub transfer_resource_type: String,
    /// Adds [`SoakConstraint`].
    pub enable_soak_constraint: bool,
    /// Adds [`TimeLagConstraint`].
    pub enable_time_lag_constraint: bool,
    /// Adds [`WipLimitConstraint`] with this cap.
    pub wip_limit: Option<usize>,
    /// Adds [`DueDateConstraint`] when set; the flag selects strictness.
    pub due_dates_strict: Option<bool>,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            shift_windows: BTreeMap::new(),
            shift_mode: ShiftMode::Strict.to_string(),
            shift_resource_type_filter: Vec::new(),
            site_changeover_minutes: 0.0,
            vehicle_transfer_minutes: 0.0,
            changeover_resource_type: "site".into(),
            transfer_resource_type: "vehicle".into(),
            enable_soak_constraint: false,
            enable_time_lag_constraint: false,
            wip_limit: None,
            due_dates_strict: None,
        }
    }
}

impl ConstraintConfig {
    /// Builds the configured rules in a fixed order: shift, changeover,
    /// transfer, soak, time lag, WIP, due date.
    ///
    /// # Errors
    /// Unknown shift mode, invalid window times, or a WIP cap of zero.
    pub fn build_constraints(&self) -> ScheduleResult<Vec<Box<dyn Constraint>>> {
        let mut out: Vec<Box<dyn Constraint>> = Vec::new();

        if !self.shift_windows.is_empty() {
            let windows = self
                .shift_windows
                .iter()
                .map(|(name, &(start, end))| {
                    DailyWindow::from_hm(start, end).ok_or_else(|| {
                        ScheduleError::InvalidConfig(format!("shift window '{name}' has an invalid time"))
                    })
                })
                .collect::<ScheduleResult<Vec<_>>>()?;
            let shift = ShiftConstraint::with_mode_name(windows, &self.shift_mode)?
                .with_filter(ResourceTypeFilter::only(self.shift_resource_type_filter.iter().cloned()));
            out.push(Box::new(shift));
        }

        if self.site_changeover_minutes > 0.0 {
            out.push(Box::new(
                ChangeoverConstraint::from_minutes(self.site_changeover_minutes)
                    .with_key(ChangeoverKey::AssignedResource(self.transfer_resource_type.clone()))
                    .with_filter(ResourceTypeFilter::only([self.changeover_resource_type.clone()])),
            ));
        }
        if self.vehicle_transfer_minutes > 0.0 {
            out.push(Box::new(
                ChangeoverConstraint::from_minutes(self.vehicle_transfer_minutes)
                    .with_key(ChangeoverKey::AssignedResource(self.changeover_resource_type.clone()))
                    .with_filter(ResourceTypeFilter::only([self.transfer_resource_type.clone()])),
            ));
        }

        if self.enable_soak_constraint {
            out.push(Box::new(SoakConstraint::new()));
        }
        if self.enable_time_lag_constraint {
            out.push(Box::new(TimeLagConstraint::new()));
        }
        if let Some(cap) = self.wip_limit {
            out.push(Box::new(WipLimitConstraint::new(cap)?));
        }
        if let Some(strict) = self.due_dates_strict {
            out.push(Box::new(DueDateConstraint::new().with_strict(strict)));
        }
        Ok(out)
    }
}

/// One id-number threshold in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdNumberRule {
    /// Trailing id number at or above which the rule applies.
    pub id_number_min: u64,
    /// Extra minutes.
    pub additional_minutes: f64,
}

/// Threshold rules for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceBasedRules {
    /// Resource type the rules read ids from.
    pub resource_type: String,
    /// Thresholds; the highest matching one wins.
    pub rules: Vec<IdNumberRule>,
}

/// Settings for [`ResourceRuleAdjustment`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationAdjustmentConfig {
    /// Minutes added to every assignment.
    pub base_additional_minutes: f64,
    /// Optional id-number rules.
    pub resource_based_rules: Option<ResourceBasedRules>,
}

impl DurationAdjustmentConfig {
    /// Builds the policy.
    ///
    /// # Errors
    /// Negative minute values.
    pub fn build(&self) -> ScheduleResult<ResourceRuleAdjustment> {
        let mut policy = ResourceRuleAdjustment::new(minutes_to_secs(
            self.base_additional_minutes,
            "base_additional_minutes",
        )?);
        if let Some(rr) = &self.resource_based_rules {
            for rule in &rr.rules {
                policy = policy.with_rule(
                    rr.resource_type.clone(),
                    rule.id_number_min,
                    minutes_to_secs(rule.additional_minutes, "additional_minutes")?,
                );
            }
        }
        Ok(policy)
    }
}

fn minutes_to_secs(minutes: f64, field: &str) -> ScheduleResult<i64> {
    if !minutes.is_finite() || minutes < 0.0 {
        return Err(ScheduleError::InvalidConfig(format!(
            "{field} must be a non-negative number, got {minutes}"
        )));
    }
    Ok((minutes * 60.0).round() as i64)
}

/// Value and strategy-score weights for dispatch and repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Weight per priority bucket (1 = most important).
    pub priority_bucket_weights: BTreeMap<u32, f64>,
    /// Exponent applied to duration hours in [`ScoreConfig::value_of`].
    pub duration_exponent_gamma: f64,
    /// Share of priority-weighted coverage in the strategy score.
    pub priority_coverage_weight: f64,
    /// Share of changeover-resource utilization in the strategy score.
    pub site_utilization_weight: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            priority_bucket_weights: BTreeMap::from([
                (1, 30.0),
                (2, 15.0),
                (3, 6.0),
                (4, 2.0),
                (5, 1.0),
            ]),
            duration_exponent_gamma: 0.6,
            priority_coverage_weight: 0.80,
            site_utilization_weight: 0.20,
        }
    }
}

impl ScoreConfig {
    /// Priority bucket of an operation: its priority rounded, at least 1.
    pub fn bucket_of(op: &Operation) -> u32 {
        let p = op.priority();
        if p.is_finite() && p >= 1.0 {
            p.round() as u32
        } else if p.is_finite() {
            1
        } else {
            DEFAULT_PRIORITY as u32
        }
    }

    /// Weight of a bucket. Unlisted buckets weigh as much as the lowest
    /// listed one, or 1.0 when none are listed.
    pub fn bucket_weight(&self, bucket: u32) -> f64 {
        self.priority_bucket_weights
            .get(&bucket)
            .copied()
            .or_else(|| {
                self.priority_bucket_weights
                    .values()
                    .copied()
                    .min_by(f64::total_cmp)
            })
            .unwrap_or(1.0)
    }

    /// Value of getting `op` scheduled: `bucket weight × hours^gamma`.
    pub fn value_of(&self, op: &Operation) -> f64 {
        let hours = op.duration_hours().max(0.0);
        self.bucket_weight(Self::bucket_of(op)) * hours.powf(self.duration_exponent_gamma)
    }
}

/// Greedy dispatcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Dispatch day opening.
    pub day_start: Timestamp,
    /// Dispatch day close; every placement must end by it.
    pub day_end: Timestamp,
    /// Repair passes after the first greedy fill.
    pub repair_rounds: usize,
    /// Unscheduled operations examined per repair pass.
    pub max_repair_candidates: usize,
    /// Value weights.
    pub score: ScoreConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            day_start: 0,
            day_end: 86_400,
            repair_rounds: 1,
            max_repair_candidates: 50,
            score: ScoreConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Settings for one dispatch day.
    pub fn for_day(day_start: Timestamp, day_end: Timestamp) -> Self {
        Self {
            day_start,
            day_end,
            ..Self::default()
        }
    }

    /// Checks the day bounds.
    ///
    /// # Errors
    /// `day_end <= day_start`.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.day_end <= self.day_start {
            return Err(ScheduleError::InvalidConfig(format!(
                "day_end ({}) must be after day_start ({})",
                self.day_end, self.day_start
            )));
        }
        Ok(())
    }
}
