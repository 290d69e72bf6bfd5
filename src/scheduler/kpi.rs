//! Schedule quality metrics (KPIs).
//!
//! Computes performance indicators for one dispatch day from the
//! committed state of a [`Schedule`].
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest committed end − earliest committed start |
//! | Coverage | Scheduled / total operations |
//! | Priority-weighted coverage | Scheduled value / total value |
//! | Utilization | Busy share of the day, per resource and per type |
//! | Total Tardiness | Sum of max(0, job end − due date) |
//! | On-Time Rate | Fraction of finished jobs meeting their due date |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use crate::config::{DispatchConfig, ScoreConfig};
use crate::schedule::Schedule;

/// Schedule performance indicators.
///
/// Times are in seconds; ratios are in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleKpi {
    /// Latest end minus earliest start of committed work.
    pub makespan_secs: i64,
    /// Committed operations.
    pub scheduled_operations: usize,
    /// Registered operations.
    pub total_operations: usize,
    /// `scheduled / total` (1.0 for an empty problem).
    pub coverage: f64,
    /// Share of total operation value that got scheduled.
    pub priority_weighted_coverage: f64,
    /// Busy share of the day per resource.
    pub utilization_by_resource: BTreeMap<String, f64>,
    /// Mean busy share of the day per resource type.
    pub utilization_by_type: BTreeMap<String, f64>,
    /// Mean over all resources.
    pub avg_utilization: f64,
    /// Sum of tardiness over complete jobs with a due date.
    pub total_tardiness_secs: i64,
    /// Largest single tardiness.
    pub max_tardiness_secs: i64,
    /// On-time share of complete jobs (jobs without due date count as on time).
    pub on_time_rate: f64,
}

impl ScheduleKpi {
    /// Computes KPIs over the day in `config`.
    pub fn calculate(schedule: &Schedule, config: &DispatchConfig) -> Self {
        let (day_start, day_end) = (config.day_start, config.day_end);

        let total_operations = schedule.operation_count();
        let scheduled_operations = schedule.scheduled_operations().count();
        let coverage = ratio(scheduled_operations as f64, total_operations as f64);

        let score = &config.score;
        let total_value: f64 = schedule.operations().map(|o| score.value_of(o)).sum();
        let scheduled_value: f64 = schedule.scheduled_operations().map(|o| score.value_of(o)).sum();
        let priority_weighted_coverage = ratio(scheduled_value, total_value);

        let utilization_by_resource: BTreeMap<String, f64> = schedule
            .resources()
            .map(|r| (r.id.clone(), r.utilization(day_start, day_end)))
            .collect();
        let mut by_type: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for r in schedule.resources() {
            let entry = by_type.entry(r.resource_type.clone()).or_default();
            entry.0 += utilization_by_resource.get(&r.id).copied().unwrap_or(0.0);
            entry.1 += 1;
        }
        let utilization_by_type = by_type
            .into_iter()
            .map(|(t, (sum, n))| (t, sum / n as f64))
            .collect();
        let avg_utilization = if utilization_by_resource.is_empty() {
            0.0
        } else {
            utilization_by_resource.values().sum::<f64>() / utilization_by_resource.len() as f64
        };

        let mut total_tardiness = 0i64;
        let mut max_tardiness = 0i64;
        let mut finished = 0usize;
        let mut on_time = 0usize;
        for job in schedule.jobs().filter(|j| j.is_complete() && !j.operations.is_empty()) {
            finished += 1;
            match (job.end_time(), job.due_date()) {
                (Some(end), Some(due)) if end > due => {
                    total_tardiness += end - due;
                    max_tardiness = max_tardiness.max(end - due);
                }
                _ => on_time += 1,
            }
        }

        Self {
            makespan_secs: schedule.total_operational_time(),
            scheduled_operations,
            total_operations,
            coverage,
            priority_weighted_coverage,
            utilization_by_resource,
            utilization_by_type,
            avg_utilization,
            total_tardiness_secs: total_tardiness,
            max_tardiness_secs: max_tardiness,
            on_time_rate: ratio(on_time as f64, finished as f64),
        }
    }

    /// Utilization of one resource type (0.0 if absent).
    pub fn type_utilization(&self, resource_type: &str) -> f64 {
        self.utilization_by_type.get(resource_type).copied().unwrap_or(0.0)
    }

    /// Combined score in percent points:
    /// `priority_coverage_weight × coverage% + site_utilization_weight × utilization%`,
    /// with utilization taken over `resource_type`.
    pub fn strategy_score(&self, score: &ScoreConfig, resource_type: &str) -> f64 {
        score.priority_coverage_weight * self.priority_weighted_coverage * 100.0
            + score.site_utilization_weight * self.type_utilization(resource_type) * 100.0
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        1.0
    } else {
        part / whole
    }
}
