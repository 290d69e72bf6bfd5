//! Scheduling domain models.
//!
//! Provides the data types of a scheduling problem: jobs made of
//! operations, typed resources with their occupancy, time windows and
//! typed metadata.
//!
//! # Domain Mappings
//!
//! | u-jobshop | Manufacturing | Vehicle testing | Logistics |
//! |-----------|--------------|-----------------|-----------|
//! | Job | Order | Vehicle | Shipment |
//! | Operation | Operation | Test run | Transport leg |
//! | Resource | Machine/Worker | Site/Vehicle | Truck/Driver |
//! | Schedule | Production plan | Test plan | Route plan |
//!
//! # Time Representation
//! All times are [`Timestamp`]s: seconds since the Unix epoch (UTC).
//! Durations are plain `i64` seconds.

mod calendar;
mod job;
pub mod metadata;
mod operation;
mod resource;
mod template;

/// Seconds since the Unix epoch (UTC).
pub type Timestamp = i64;

pub use calendar::{fits_any, utc_day, DailyWindow, TimeWindow};
pub use job::Job;
pub use metadata::{MetaValue, Metadata};
pub use operation::{Assignment, Operation, ResourceRequirement, DEFAULT_PRIORITY};
pub use resource::{Booking, Resource};
pub use template::{JobTemplate, OperationTemplate};
