//! Job-shop scheduling engine.
//!
//! Places the operations of jobs onto typed resources (sites, vehicles,
//! machines, workers) under precedence and a pluggable set of feasibility
//! rules, then reports how good the result is.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Job`, `Operation`, `Resource`,
//!   `Assignment`, `TimeWindow`, job templates and typed metadata
//! - **`schedule`**: The `Schedule` aggregate: commit/unschedule, earliest-slot
//!   search, no-wait chains and duration policies
//! - **`constraints`**: The `Constraint` trait and built-in rules (shift,
//!   changeover, soak, time lag, WIP, blocking, due date)
//! - **`dispatching`**: Candidate rules, the rule engine and the greedy
//!   day dispatcher with its repair pass
//! - **`scheduler`**: Job-by-job placement and KPI evaluation
//! - **`config`**: Serde-friendly configuration building the above
//! - **`validation`**: Input integrity checks (duplicate IDs, DAG cycles,
//!   resource refs) and audits of committed state
//!
//! # Example
//!
//! ```
//! use u_jobshop::config::DispatchConfig;
//! use u_jobshop::dispatching::GreedyDispatcher;
//! use u_jobshop::models::{Job, Operation, Resource};
//! use u_jobshop::schedule::Schedule;
//! use u_jobshop::validation::validate_schedule;
//!
//! let mut schedule = Schedule::new();
//! schedule.add_resource(Resource::new("S1", "site"));
//! schedule.add_job(
//!     Job::new("V1")
//!         .with_operation(Operation::new("T1", "V1", 3600).with_resource("site", ["S1"]))
//!         .with_operation(
//!             Operation::new("T2", "V1", 1800)
//!                 .with_resource("site", ["S1"])
//!                 .with_predecessor("T1"),
//!         ),
//! );
//!
//! let mut dispatcher = GreedyDispatcher::new(DispatchConfig::for_day(0, 8 * 3600));
//! let report = dispatcher.run(&mut schedule).unwrap();
//! assert!(report.unscheduled.is_empty());
//! assert_eq!(schedule.operation("T2").unwrap().start, Some(3600));
//! assert!(validate_schedule(&schedule).is_empty());
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Brucker (2007), "Scheduling Algorithms"
//! - Blazewicz et al. (2019), "Handbook on Scheduling"

pub mod config;
pub mod constraints;
pub mod dispatching;
pub mod error;
pub mod models;
pub mod schedule;
pub mod scheduler;
pub mod validation;

pub use error::{Placement, Rejection, ScheduleError, ScheduleResult};
pub use schedule::Schedule;
