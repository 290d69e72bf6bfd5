//! Resource model.
//!
//! Resources are the typed entities operations are bound to: sites,
//! machines, vehicles, workers. Each resource keeps its own occupancy, the
//! set of committed intervals ordered by start time. The occupancy refers
//! to operations by ID only; the owning [`Job`](super::Job) holds the
//! operation itself.
//!
//! # Invariants
//! - No two committed intervals on one resource overlap.
//! - If availability windows are declared, every committed interval lies
//!   inside one of them.
//!
//! Both are enforced on insert; callers committing across several
//! resources still call [`Resource::is_available`] on all of them first.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1.2

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};

use super::calendar::fits_any;
use super::{Operation, TimeWindow, Timestamp};
use crate::error::{ScheduleError, ScheduleResult};

/// A committed interval on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Booking<'a> {
    /// Operation holding the interval.
    pub operation_id: &'a str,
    /// Committed interval.
    pub window: TimeWindow,
}

/// A resource that operations can be assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Resource type; must match a requirement's type to be eligible.
    pub resource_type: String,
    /// Human-readable name.
    pub name: String,
    /// Disjoint availability windows. Empty = always available.
    pub availability: Vec<TimeWindow>,
    /// `(start, operation_id) → end`.
    #[serde(skip)]
    occupancy: BTreeMap<(Timestamp, String), Timestamp>,
    /// `operation_id → start`.
    #[serde(skip)]
    starts: HashMap<String, Timestamp>,
}

impl Resource {
    /// Creates a resource without availability windows.
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            resource_type: resource_type.into(),
            availability: Vec::new(),
            occupancy: BTreeMap::new(),
            starts: HashMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an availability window `[start, end)`.
    pub fn with_window(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.availability.push(TimeWindow::new(start, end));
        self
    }

    /// Whether `[start, end)` lies inside an availability window and
    /// overlaps no committed interval.
    ///
    /// O(log n) in the number of committed operations.
    pub fn is_available(&self, start: Timestamp, end: Timestamp) -> bool {
        if !fits_any(&self.availability, start, end) {
            return false;
        }
        let probe = (start, String::new());
        if let Some((_, &prev_end)) = self.occupancy.range(..probe.clone()).next_back() {
            if prev_end > start {
                return false;
            }
        }
        if let Some(((next_start, _), _)) = self.occupancy.range(probe..).next() {
            if *next_start < end {
                return false;
            }
        }
        true
    }

    /// Inserts a scheduled operation into the occupancy.
    ///
    /// Returns `Ok(false)` when the interval is unavailable; nothing is
    /// inserted in that case.
    ///
    /// # Errors
    /// - [`ScheduleError::MissingSchedulingState`] if the operation has no
    ///   start/end.
    /// - [`ScheduleError::ResourceTypeMismatch`] if the operation has no
    ///   requirement of this resource's type.
    pub fn add_operation(&mut self, op: &Operation) -> ScheduleResult<bool> {
        let (start, end) = match (op.start, op.end) {
            (Some(s), Some(e)) => (s, e),
            _ => return Err(ScheduleError::MissingSchedulingState(op.id.clone())),
        };
        if !op.requires_type(&self.resource_type) {
            return Err(ScheduleError::ResourceTypeMismatch {
                operation_id: op.id.clone(),
                resource_id: self.id.clone(),
                expected: op
                    .requirements
                    .first()
                    .map(|r| r.resource_type.clone())
                    .unwrap_or_default(),
                actual: self.resource_type.clone(),
            });
        }
        if self.starts.contains_key(&op.id) || !self.is_available(start, end) {
            return Ok(false);
        }
        self.occupancy.insert((start, op.id.clone()), end);
        self.starts.insert(op.id.clone(), start);
        Ok(true)
    }

    /// Removes an operation from the occupancy. Returns whether it was present.
    pub fn remove_operation(&mut self, op_id: &str) -> bool {
        match self.starts.remove(op_id) {
            Some(start) => self.occupancy.remove(&(start, op_id.to_string())).is_some(),
            None => false,
        }
    }

    /// Drops every committed interval.
    pub fn clear(&mut self) {
        self.occupancy.clear();
        self.starts.clear();
    }

    /// Whether the operation is committed here.
    pub fn holds(&self, op_id: &str) -> bool {
        self.starts.contains_key(op_id)
    }

    /// Committed interval of an operation.
    pub fn booking_of(&self, op_id: &str) -> Option<TimeWindow> {
        let start = *self.starts.get(op_id)?;
        let end = *self.occupancy.get(&(start, op_id.to_string()))?;
        Some(TimeWindow::new(start, end))
    }

    /// Committed intervals in start order.
    pub fn bookings(&self) -> impl Iterator<Item = Booking<'_>> {
        self.occupancy.iter().map(|((s, id), e)| Booking {
            operation_id: id,
            window: TimeWindow::new(*s, *e),
        })
    }

    /// Committed operation IDs in start order.
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.occupancy.keys().map(|(_, id)| id.as_str())
    }

    /// Number of committed operations.
    pub fn operation_count(&self) -> usize {
        self.occupancy.len()
    }

    /// Last booking starting strictly before `t`.
    pub fn previous_before(&self, t: Timestamp) -> Option<Booking<'_>> {
        self.occupancy
            .range(..(t, String::new()))
            .next_back()
            .map(|((s, id), e)| Booking {
                operation_id: id,
                window: TimeWindow::new(*s, *e),
            })
    }

    /// First booking starting at or after `t`.
    pub fn next_at_or_after(&self, t: Timestamp) -> Option<Booking<'_>> {
        self.occupancy
            .range((t, String::new())..)
            .next()
            .map(|((s, id), e)| Booking {
                operation_id: id,
                window: TimeWindow::new(*s, *e),
            })
    }

    /// First booking starting strictly after `t`.
    pub fn next_after(&self, t: Timestamp) -> Option<Booking<'_>> {
        self.occupancy
            .range((Excluded((t, char::MAX.to_string())), Unbounded))
            .find(|((s, _), _)| *s > t)
            .map(|((s, id), e)| Booking {
                operation_id: id,
                window: TimeWindow::new(*s, *e),
            })
    }

    /// Earliest `t' >= t` such that `[t', t' + duration)` fits inside an
    /// availability window. `None` if no window can hold it.
    pub fn clamp_to_windows(&self, t: Timestamp, duration: i64) -> Option<Timestamp> {
        if self.availability.is_empty() {
            return Some(t);
        }
        self.availability
            .iter()
            .filter_map(|w| {
                let s = t.max(w.start);
                (s + duration <= w.end).then_some(s)
            })
            .min()
    }

    /// Sum of committed durations (seconds).
    pub fn total_scheduled_time(&self) -> i64 {
        self.occupancy.iter().map(|((s, _), e)| e - s).sum()
    }

    /// Fraction of `[start, end)` covered by committed intervals.
    pub fn utilization(&self, start: Timestamp, end: Timestamp) -> f64 {
        if end <= start {
            return 0.0;
        }
        let busy: i64 = self
            .bookings()
            .map(|b| b.window.overlap_secs(start, end))
            .sum();
        busy as f64 / (end - start) as f64
    }

    /// Idle intervals inside `[start, end)`, restricted to availability
    /// windows when declared.
    pub fn gaps(&self, start: Timestamp, end: Timestamp) -> Vec<TimeWindow> {
        let mut free = Vec::new();
        let mut cursor = start;
        for b in self.bookings() {
            if b.window.end <= start {
                continue;
            }
            if b.window.start >= end {
                break;
            }
            if b.window.start > cursor {
                free.push(TimeWindow::new(cursor, b.window.start));
            }
            cursor = cursor.max(b.window.end);
        }
        if cursor < end {
            free.push(TimeWindow::new(cursor, end));
        }

        if self.availability.is_empty() {
            return free;
        }
        let mut windows = self.availability.clone();
        windows.sort_by_key(|w| w.start);
        free.iter()
            .flat_map(|g| {
                windows.iter().filter_map(move |w| {
                    let s = g.start.max(w.start);
                    let e = g.end.min(w.end);
                    (s < e).then(|| TimeWindow::new(s, e))
                })
            })
            .collect()
    }

    /// Earliest start `>= earliest` at which `duration` seconds fit,
    /// considering only availability windows and committed work.
    pub fn next_available_time(&self, duration: i64, earliest: Timestamp) -> Option<Timestamp> {
        let mut t = earliest;
        for _ in 0..=(self.occupancy.len() + self.availability.len() + 1) {
            t = self.clamp_to_windows(t, duration)?;
            if self.is_available(t, t + duration) {
                return Some(t);
            }
            let blocker = self
                .previous_before(t)
                .filter(|b| b.window.end > t)
                .or_else(|| self.next_at_or_after(t));
            t = match blocker {
                Some(b) => b.window.end.max(t + 1),
                None => return None,
            };
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Assignment;

    const H: i64 = 3600;

    fn booked(id: &str, start: Timestamp, end: Timestamp) -> Operation {
        let mut op = Operation::new(id, "J", end - start).with_resource("site", ["S1"]);
        op.commit(start, end, Assignment::new().with("site", "S1"));
        op
    }

    #[test]
    fn test_availability_with_window_and_booking() {
        let mut r = Resource::new("S1", "site").with_window(8 * H, 17 * H);
        assert!(r.add_operation(&booked("A", 8 * H, 10 * H)).unwrap());

        assert!(!r.is_available(9 * H, 10 * H));
        assert!(r.is_available(10 * H, 11 * H));
        assert!(!r.is_available(16 * H, 18 * H)); // leaves the window
        assert!(!r.is_available(7 * H, 8 * H));
    }

    #[test]
    fn test_no_windows_always_available() {
        let r = Resource::new("S1", "site");
        assert!(r.is_available(-100, 1_000_000));
    }

    #[test]
    fn test_add_rejects_overlap() {
        let mut r = Resource::new("S1", "site");
        assert!(r.add_operation(&booked("A", 0, 100)).unwrap());
        assert!(!r.add_operation(&booked("B", 50, 150)).unwrap());
        assert!(r.add_operation(&booked("C", 100, 150)).unwrap());
        assert_eq!(r.operation_ids().collect::<Vec<_>>(), vec!["A", "C"]);
    }

    #[test]
    fn test_add_requires_scheduling_state() {
        let mut r = Resource::new("S1", "site");
        let op = Operation::new("A", "J", 10).with_resource("site", ["S1"]);
        assert_eq!(
            r.add_operation(&op),
            Err(ScheduleError::MissingSchedulingState("A".into()))
        );
    }

    #[test]
    fn test_add_requires_matching_type() {
        let mut r = Resource::new("V1", "vehicle");
        assert!(matches!(
            r.add_operation(&booked("A", 0, 10)),
            Err(ScheduleError::ResourceTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_remove_operation() {
        let mut r = Resource::new("S1", "site");
        r.add_operation(&booked("A", 0, 100)).unwrap();
        assert!(r.holds("A"));
        assert_eq!(r.booking_of("A"), Some(TimeWindow::new(0, 100)));
        assert!(r.remove_operation("A"));
        assert!(!r.remove_operation("A"));
        assert!(r.is_available(0, 100));
    }

    #[test]
    fn test_neighbor_lookups() {
        let mut r = Resource::new("S1", "site");
        r.add_operation(&booked("A", 0, 10)).unwrap();
        r.add_operation(&booked("B", 20, 30)).unwrap();

        assert_eq!(r.previous_before(20).map(|b| b.operation_id), Some("A"));
        assert_eq!(r.next_at_or_after(20).map(|b| b.operation_id), Some("B"));
        assert_eq!(r.next_after(20).map(|b| b.operation_id), None);
        assert_eq!(r.next_after(5).map(|b| b.operation_id), Some("B"));
        assert!(r.previous_before(0).is_none());
    }

    #[test]
    fn test_utilization_and_total() {
        let mut r = Resource::new("S1", "site");
        r.add_operation(&booked("A", 0, 10)).unwrap();
        r.add_operation(&booked("B", 20, 30)).unwrap();
        assert_eq!(r.total_scheduled_time(), 20);
        assert!((r.utilization(0, 40) - 0.5).abs() < 1e-10);
        assert!((r.utilization(5, 25) - 0.5).abs() < 1e-10);
        assert_eq!(r.utilization(10, 10), 0.0);
    }

    #[test]
    fn test_gaps() {
        let mut r = Resource::new("S1", "site");
        r.add_operation(&booked("A", 10, 20)).unwrap();
        r.add_operation(&booked("B", 30, 40)).unwrap();
        assert_eq!(
            r.gaps(0, 50),
            vec![
                TimeWindow::new(0, 10),
                TimeWindow::new(20, 30),
                TimeWindow::new(40, 50)
            ]
        );

        let windowed = Resource::new("S2", "site").with_window(5, 15);
        assert_eq!(windowed.gaps(0, 50), vec![TimeWindow::new(5, 15)]);
    }

    #[test]
    fn test_next_available_time() {
        let mut r = Resource::new("S1", "site")
            .with_window(0, 100)
            .with_window(200, 300);
        r.add_operation(&booked("A", 0, 40)).unwrap();
        r.add_operation(&booked("B", 50, 90)).unwrap();

        assert_eq!(r.next_available_time(10, 0), Some(40));
        assert_eq!(r.next_available_time(20, 0), Some(200));
        assert_eq!(r.next_available_time(200, 0), None);
    }

    #[test]
    fn test_clamp_to_windows() {
        let r = Resource::new("S1", "site")
            .with_window(0, 10)
            .with_window(20, 40);
        assert_eq!(r.clamp_to_windows(5, 5), Some(5));
        assert_eq!(r.clamp_to_windows(8, 5), Some(20));
        assert_eq!(r.clamp_to_windows(41, 1), None);
    }
}
