//! Recurring daily shift windows.
//!
//! Windows repeat every UTC calendar day. A window whose end time of day is
//! not after its start runs overnight; the window opened on the previous
//! day is considered too, so times after midnight belong to it.
//!
//! # Modes
//! - `strict`: the whole operation fits inside one window.
//! - `allow_overrun`: only the start must fall inside a window.
//! - `ignore`: no enforcement.

use chrono::Days;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Constraint, ResourceTypeFilter};
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{utc_day, DailyWindow, Operation, Resource, TimeWindow, Timestamp};
use crate::schedule::Schedule;

/// Shift enforcement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftMode {
    /// Operation must fit entirely in one window.
    #[default]
    Strict,
    /// Operation must start inside a window.
    AllowOverrun,
    /// No enforcement.
    Ignore,
}

impl FromStr for ShiftMode {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ShiftMode::Strict),
            "allow_overrun" => Ok(ShiftMode::AllowOverrun),
            "ignore" => Ok(ShiftMode::Ignore),
            other => Err(ScheduleError::InvalidShiftMode(other.to_string())),
        }
    }
}

impl fmt::Display for ShiftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShiftMode::Strict => "strict",
            ShiftMode::AllowOverrun => "allow_overrun",
            ShiftMode::Ignore => "ignore",
        })
    }
}

/// Restricts operations to recurring daily windows.
#[derive(Debug, Clone)]
pub struct ShiftConstraint {
    windows: Vec<DailyWindow>,
    mode: ShiftMode,
    filter: ResourceTypeFilter,
}

impl ShiftConstraint {
    /// Creates a shift rule.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidShiftWindows`] if `windows` is empty.
    pub fn new(windows: Vec<DailyWindow>, mode: ShiftMode) -> ScheduleResult<Self> {
        if windows.is_empty() {
            return Err(ScheduleError::InvalidShiftWindows);
        }
        Ok(Self {
            windows,
            mode,
            filter: ResourceTypeFilter::any(),
        })
    }

    /// Creates a shift rule from a mode name.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidShiftMode`] for an unknown mode name, or
    /// [`ScheduleError::InvalidShiftWindows`] if `windows` is empty.
    pub fn with_mode_name(windows: Vec<DailyWindow>, mode: &str) -> ScheduleResult<Self> {
        Self::new(windows, mode.parse()?)
    }

    /// Restricts the rule to some resource types.
    pub fn with_filter(mut self, filter: ResourceTypeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Enforcement mode.
    pub fn mode(&self) -> ShiftMode {
        self.mode
    }

    /// Concrete windows relevant to the UTC day containing `t`.
    fn windows_around(&self, t: Timestamp) -> Vec<TimeWindow> {
        let day = utc_day(t);
        let mut out = Vec::with_capacity(self.windows.len() * 2);
        for w in &self.windows {
            out.push(w.on_day(day));
            if w.is_overnight() {
                if let Some(prev) = day.checked_sub_days(Days::new(1)) {
                    out.push(w.on_day(prev));
                }
            }
        }
        out
    }

    /// Whether `t` falls inside a shift.
    pub fn is_in_shift(&self, t: Timestamp) -> bool {
        self.windows_around(t).iter().any(|w| w.contains(t))
    }

    /// Whether `[start, end)` fits inside one shift.
    pub fn fits_shift(&self, start: Timestamp, end: Timestamp) -> bool {
        self.windows_around(start)
            .iter()
            .any(|w| w.start <= start && end <= w.end)
    }

    /// First shift start strictly after `t`.
    pub fn next_shift_start(&self, t: Timestamp) -> Timestamp {
        let next_day = t + 86_400;
        self.windows_around(t)
            .into_iter()
            .chain(self.windows_around(next_day))
            .map(|w| w.start)
            .filter(|&s| s > t)
            .min()
            .unwrap_or(next_day)
    }

    fn enforced_on(&self, resource: &Resource) -> bool {
        self.mode != ShiftMode::Ignore && self.filter.applies_to(resource)
    }
}

impl Constraint for ShiftConstraint {
    fn name(&self) -> &'static str {
        "shift"
    }

    fn is_feasible(
        &self,
        _schedule: &Schedule,
        _op: &Operation,
        resource: &Resource,
        start: Timestamp,
        end: Timestamp,
    ) -> bool {
        if !self.enforced_on(resource) {
            return true;
        }
        match self.mode {
            ShiftMode::Strict => self.fits_shift(start, end),
            ShiftMode::AllowOverrun => self.is_in_shift(start),
            ShiftMode::Ignore => true,
        }
    }

    /// Moves to the next shift start when `earliest` is outside every
    /// shift. In strict mode it also moves when the operation's base
    /// duration no longer fits the current shift.
    fn adjust_earliest_start(
        &self,
        _schedule: &Schedule,
        op: &Operation,
        resource: &Resource,
        earliest: Timestamp,
    ) -> Timestamp {
        if !self.enforced_on(resource) {
            return earliest;
        }
        let fits = match self.mode {
            ShiftMode::Strict => self.fits_shift(earliest, earliest + op.duration_secs),
            _ => self.is_in_shift(earliest),
        };
        if fits {
            earliest
        } else {
            self.next_shift_start(earliest)
        }
    }
}
