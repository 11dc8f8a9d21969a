//! # reflow-core
//!
//! Core domain model and traits for the reflow scheduling engine.
//!
//! This crate provides:
//! - Domain types: `WorkCenter`, `Shift`, `MaintenanceWindow`, `WorkOrder`, `Schedule`
//! - The `Reflow` trait implemented by scheduling engines
//! - Result and error types: `ReflowResult`, `Change`, `ReflowError`
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use reflow_core::{Shift, WorkCenter, WorkOrder};
//!
//! let lathe = WorkCenter::new("wc-lathe")
//!     .name("Lathe 1")
//!     .shift(Shift::new(1, 8, 16))
//!     .shift(Shift::new(2, 8, 16));
//!
//! let order = WorkOrder::new("wo-1")
//!     .number("WO-0001")
//!     .on(lathe.id.as_str())
//!     .window(
//!         Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
//!         Utc.with_ymd_and_hms(2026, 1, 5, 11, 0, 0).unwrap(),
//!     )
//!     .duration_minutes(120)
//!     .depends_on("wo-0");
//! assert_eq!(order.depends_on.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for a work order
pub type WorkOrderId = String;

/// Unique identifier for a work center
pub type WorkCenterId = String;

/// A point in time with minute resolution, interpreted in UTC
pub type Instant = DateTime<Utc>;

// ============================================================================
// Work Center
// ============================================================================

/// A working interval on one weekday.
///
/// The shift covers the half-open interval `[start_hour:00, end_hour:00)`
/// on its weekday. A work center has at most one shift per weekday.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    /// Weekday this shift covers: Sunday = 0 .. Saturday = 6
    /// (the ISO weekday number taken modulo 7).
    pub day_of_week: u8,
    /// First working hour of the day, `0..=24`
    pub start_hour: u8,
    /// End of the working interval, exclusive, `0..=24`
    pub end_hour: u8,
}

impl Shift {
    pub const fn new(day_of_week: u8, start_hour: u8, end_hour: u8) -> Self {
        Self {
            day_of_week,
            start_hour,
            end_hour,
        }
    }
}

/// A blocked interval on a work center, half-open `[start, end)`.
/// May cross day boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub start: Instant,
    pub end: Instant,
    pub reason: Option<String>,
}

impl MaintenanceWindow {
    pub fn new(start: Instant, end: Instant) -> Self {
        Self {
            start,
            end,
            reason: None,
        }
    }

    /// Set the reason for the window
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Check whether an instant falls inside the window (half-open)
    pub fn contains(&self, t: Instant) -> bool {
        self.start <= t && t < self.end
    }
}

/// A machine with a weekly shift calendar and maintenance windows.
///
/// Identity is by `id`. Work centers are immutable during a reflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkCenter {
    /// Unique identifier
    pub id: WorkCenterId,
    /// Human-readable name
    pub name: String,
    /// Weekly shift calendar, at most one shift per weekday
    pub shifts: Vec<Shift>,
    /// Blocked intervals
    pub maintenance_windows: Vec<MaintenanceWindow>,
}

impl WorkCenter {
    /// Create a new work center with the given id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            shifts: Vec::new(),
            maintenance_windows: Vec::new(),
        }
    }

    /// Set the work center name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a shift
    pub fn shift(mut self, shift: Shift) -> Self {
        self.shifts.push(shift);
        self
    }

    /// Add a maintenance window
    pub fn maintenance(mut self, window: MaintenanceWindow) -> Self {
        self.maintenance_windows.push(window);
        self
    }

    /// Get the shift covering a weekday (Sunday = 0 .. Saturday = 6)
    pub fn shift_for_weekday(&self, day: u8) -> Option<&Shift> {
        self.shifts.iter().find(|s| s.day_of_week == day)
    }

    /// Check whether an instant falls inside any maintenance window
    pub fn in_maintenance(&self, t: Instant) -> bool {
        self.maintenance_windows.iter().any(|w| w.contains(t))
    }
}

// ============================================================================
// Work Order
// ============================================================================

/// A unit of manufacturing work with a duration and machine assignment.
///
/// `start`/`end` carry the current (possibly invalid) placement on input
/// and the recomputed placement on output. An order with
/// `is_maintenance = true` is pinned: its times are authoritative and the
/// engine never moves it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    /// Unique identifier
    pub id: WorkOrderId,
    /// Human-readable order number
    pub number: String,
    /// The machine this order runs on
    pub work_center_id: WorkCenterId,
    /// Scheduled start
    pub start: Instant,
    /// Scheduled end
    pub end: Instant,
    /// Working time required, in minutes
    pub duration_minutes: i64,
    /// Pinned maintenance order: never rescheduled
    pub is_maintenance: bool,
    /// Ids of work orders that must finish before this one starts
    pub depends_on: Vec<WorkOrderId>,
}

impl WorkOrder {
    /// Create a new work order with the given id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            number: id.clone(),
            id,
            work_center_id: String::new(),
            start: DateTime::<Utc>::UNIX_EPOCH,
            end: DateTime::<Utc>::UNIX_EPOCH,
            duration_minutes: 0,
            is_maintenance: false,
            depends_on: Vec::new(),
        }
    }

    /// Set the order number
    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    /// Assign the order to a work center
    pub fn on(mut self, work_center_id: impl Into<String>) -> Self {
        self.work_center_id = work_center_id.into();
        self
    }

    /// Set the scheduled start and end
    pub fn window(mut self, start: Instant, end: Instant) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Set the working duration in minutes
    pub fn duration_minutes(mut self, minutes: i64) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Add a dependency on another work order
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    /// Pin the order as a maintenance order
    pub fn maintenance(mut self) -> Self {
        self.is_maintenance = true;
        self
    }

    /// Check whether two orders occupy the same machine at the same time.
    ///
    /// Intervals are half-open, so back-to-back orders do not overlap.
    pub fn overlaps(&self, other: &WorkOrder) -> bool {
        self.work_center_id == other.work_center_id
            && self.start < other.end
            && self.end > other.start
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// Placed work orders grouped by work center.
///
/// The per-center vectors keep the engine's placement order, which is not
/// a sort order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule {
    pub centers: HashMap<WorkCenterId, Vec<WorkOrder>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order to its work center's placement list
    pub fn place(&mut self, order: WorkOrder) {
        self.centers
            .entry(order.work_center_id.clone())
            .or_default()
            .push(order);
    }

    /// Orders placed on a work center, in placement order
    pub fn orders_on(&self, center_id: &str) -> &[WorkOrder] {
        self.centers.get(center_id).map_or(&[], Vec::as_slice)
    }

    /// Find a placed order by id, on any work center
    pub fn find(&self, order_id: &str) -> Option<&WorkOrder> {
        self.centers.values().flatten().find(|o| o.id == order_id)
    }

    /// Check whether an order has been placed
    pub fn contains(&self, order_id: &str) -> bool {
        self.find(order_id).is_some()
    }

    /// Iterate over all placed orders
    pub fn iter_orders(&self) -> impl Iterator<Item = &WorkOrder> {
        self.centers.values().flatten()
    }

    /// Total number of placed orders
    pub fn total_orders(&self) -> usize {
        self.centers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.values().all(Vec::is_empty)
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// An audit record for one rescheduled work order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub work_order_id: WorkOrderId,
    pub work_order_number: String,
    pub old_start: Instant,
    pub old_end: Instant,
    pub new_start: Instant,
    pub new_end: Instant,
    /// How much later the order now ends, in minutes (never negative)
    pub delay_minutes: i64,
    pub reason: String,
}

/// The outcome of a reflow run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflowResult {
    /// Whether the final schedule satisfies every constraint
    pub success: bool,
    /// The recomputed schedule, per work center
    pub updated_work_orders: Schedule,
    /// Audit log of orders whose times changed
    pub changes: Vec<Change>,
    /// Human-readable summary of the run
    pub explanation: String,
    /// Constraint violations found by the final validation
    pub errors: Vec<String>,
}

impl ReflowResult {
    /// A rejected run that never produced a schedule
    pub fn rejected(explanation: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            updated_work_orders: Schedule::new(),
            changes: Vec::new(),
            explanation: explanation.into(),
            errors,
        }
    }

    /// Summarize a change log the way the engine reports it
    pub fn summary(changes: &[Change]) -> String {
        if changes.is_empty() {
            return "no changes required".into();
        }
        let total_delay: i64 = changes.iter().map(|c| c.delay_minutes).sum();
        format!(
            "Rescheduled {} work order(s) with total delay of {} minutes",
            changes.len(),
            total_delay
        )
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A scheduling engine that recomputes work order placements so that all
/// machine, calendar, and dependency constraints hold.
pub trait Reflow: Send + Sync {
    /// Reflow the given work orders across the given work centers.
    ///
    /// Soft failures (cycles, empty input, constraint violations in the
    /// final schedule) come back as `ReflowResult { success: false, .. }`.
    /// Structural failures are returned as `Err`.
    fn reflow(
        &self,
        centers: &[WorkCenter],
        orders: &[WorkOrder],
    ) -> Result<ReflowResult, ReflowError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal reflow error
#[derive(Debug, Error)]
pub enum ReflowError {
    #[error("Work order '{order}' references unknown work center '{center}'")]
    UnknownWorkCenter {
        order: WorkOrderId,
        center: WorkCenterId,
    },

    #[error("Work order '{order}' depends on '{missing}' which does not exist")]
    UnknownDependency {
        order: WorkOrderId,
        missing: WorkOrderId,
    },

    #[error("Conflict resolution for work order '{order}' did not converge within {limit} rounds")]
    ConflictResolution { order: WorkOrderId, limit: u32 },

    #[error("Calendar projection on work center '{center}' exceeded {limit} iterations")]
    CalendarProjection { center: WorkCenterId, limit: u32 },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ============================================================================
// Tests
// ============================================================================
