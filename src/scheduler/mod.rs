//! Job-level schedulers and KPI evaluation.
//!
//! # Algorithm
//!
//! `SequentialScheduler` places whole jobs one after another at their
//! earliest feasible slots, as no-wait chains when blocking applies. It is
//! order-dependent and not optimal, but it is fast and deterministic.
//!
//! # KPI
//!
//! `ScheduleKpi` computes makespan, coverage, priority-weighted coverage,
//! utilization, tardiness, and a combined strategy score.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Baker & Trietsch (2019), "Principles of Sequencing and Scheduling"

mod kpi;
mod sequential;

pub use kpi::ScheduleKpi;
pub use sequential::{JobPlacement, SequentialReport, SequentialScheduler};
