//! Error and outcome types.
//!
//! Two tiers are kept strictly apart:
//!
//! - [`ScheduleError`]: a malformed problem or API misuse (unknown IDs,
//!   wrong resource type, invalid constraint parameters). Returned as `Err`.
//! - [`Placement`] / [`Rejection`]: the expected result of asking whether
//!   something fits. A rejected placement leaves all state untouched and
//!   callers are free to retry with other parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard errors raised by the scheduling engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// No operation with this ID is registered.
    #[error("operation not found: {0}")]
    UnknownOperation(String),
    /// No resource with this ID is registered.
    #[error("resource not found: {0}")]
    UnknownResource(String),
    /// No job with this ID is registered.
    #[error("job not found: {0}")]
    UnknownJob(String),
    /// The resource's type does not match the requirement it was bound to.
    #[error("resource '{resource_id}' has type '{actual}', operation '{operation_id}' requires '{expected}'")]
    ResourceTypeMismatch {
        operation_id: String,
        resource_id: String,
        expected: String,
        actual: String,
    },
    /// The resource is not in the operation's eligible set.
    #[error("resource '{resource_id}' is not eligible for operation '{operation_id}'")]
    IneligibleResource {
        operation_id: String,
        resource_id: String,
    },
    /// A multi-resource assignment does not line up with the requirements.
    #[error("invalid assignment for operation '{operation_id}': {reason}")]
    InvalidAssignment {
        operation_id: String,
        reason: String,
    },
    /// The operation already holds a committed slot.
    #[error("operation already scheduled: {0}")]
    AlreadyScheduled(String),
    /// A resource was asked to hold an operation without start/end times.
    #[error("operation '{0}' has no start/end time")]
    MissingSchedulingState(String),
    /// Unknown shift mode string.
    #[error("invalid shift mode '{0}' (expected strict, allow_overrun or ignore)")]
    InvalidShiftMode(String),
    /// Shift constraint built without any window.
    #[error("shift constraint requires at least one window")]
    InvalidShiftWindows,
    /// WIP cap below one.
    #[error("max_wip must be >= 1, got {0}")]
    InvalidWipLimit(usize),
    /// Configuration value out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used across the crate.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Why a placement was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// The interval overlaps committed work or falls outside availability windows.
    ResourceBusy { resource_id: String },
    /// A constraint vetoed the placement.
    ConstraintVeto {
        constraint: String,
        resource_id: String,
    },
    /// A predecessor is unscheduled or ends after the proposed start.
    PrecedenceUnsatisfied { predecessor_id: String },
    /// The occupancy insert failed after all checks passed.
    CommitFailed { resource_id: String },
}

/// Outcome of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// The operation now holds the requested slot.
    Placed,
    /// Nothing changed.
    Rejected(Rejection),
}

impl Placement {
    /// Whether the operation was committed.
    #[inline]
    pub fn is_placed(&self) -> bool {
        matches!(self, Placement::Placed)
    }

    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Placement::Placed => None,
            Placement::Rejected(r) => Some(r),
        }
    }
}
