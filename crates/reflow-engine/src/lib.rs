//! # reflow-engine
//!
//! Reflow engine for manufacturing schedules.
//!
//! This crate provides:
//! - The dependency-ordered worklist driver (`reflow`, `GreedyReflow`)
//! - Calendar projection across shifts and maintenance windows
//! - Per-order conflict resolution on a machine
//! - Whole-schedule constraint validation
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use reflow_core::{Shift, WorkCenter, WorkOrder};
//!
//! let mill = WorkCenter::new("wc-mill")
//!     .shift(Shift::new(1, 8, 16))
//!     .shift(Shift::new(2, 8, 16));
//!
//! let monday = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
//! let orders = vec![
//!     WorkOrder::new("a")
//!         .on("wc-mill")
//!         .window(monday, monday + chrono::TimeDelta::minutes(60))
//!         .duration_minutes(60),
//! ];
//!
//! let result = reflow_engine::reflow(&[mill], &orders).unwrap();
//! assert!(result.success);
//! assert!(result.changes.is_empty());
//! ```

use std::collections::{HashMap, VecDeque};

use reflow_core::{
    Change, Reflow, ReflowError, ReflowResult, Schedule, WorkCenter, WorkOrder,
};

pub mod calendar;
pub mod graph;
pub mod placement;
pub mod validate;

pub use calendar::{next_available, project_end, CalendarError, PROJECTION_MAX_ITERATIONS};
pub use graph::detect_cycles;
pub use placement::{resolve_placement, Placement, PlacementError, RESOLVER_MAX_ROUNDS};
pub use validate::{dependencies_satisfied, validate_schedule, ValidationReport};

/// Worklist iterations allowed per input order before the driver stops
pub const DRIVER_ROUNDS_PER_ORDER: usize = 100;

/// The greedy worklist reflow engine
pub struct GreedyReflow;

impl GreedyReflow {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GreedyReflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Reflow for GreedyReflow {
    fn reflow(
        &self,
        centers: &[WorkCenter],
        orders: &[WorkOrder],
    ) -> Result<ReflowResult, ReflowError> {
        reflow(centers, orders)
    }
}

/// Reflow a set of work orders across the given work centers.
///
/// Orders are processed from a queue seeded in input order. An order
/// whose dependencies are not yet placed pushes them to the front of the
/// queue (keeping their relative order) and re-enqueues itself at the
/// back. Maintenance-pinned orders are placed with their original times;
/// every other order is pushed to its earliest constraint-free start and
/// its end is projected through the machine calendar. The final schedule
/// is validated as a whole and the verdict becomes `success`.
pub fn reflow(centers: &[WorkCenter], orders: &[WorkOrder]) -> Result<ReflowResult, ReflowError> {
    if orders.is_empty() {
        return Ok(ReflowResult::rejected("no work orders", Vec::new()));
    }

    let cycles = detect_cycles(orders);
    if !cycles.is_empty() {
        let explanation = cycles.join("; ");
        return Ok(ReflowResult::rejected(explanation, cycles));
    }

    let center_index: HashMap<&str, &WorkCenter> =
        centers.iter().map(|c| (c.id.as_str(), c)).collect();
    let order_index: HashMap<&str, usize> = orders
        .iter()
        .enumerate()
        .map(|(i, o)| (o.id.as_str(), i))
        .collect();

    // Structural failures are fatal, and cheap to find up-front.
    for order in orders {
        if !center_index.contains_key(order.work_center_id.as_str()) {
            return Err(ReflowError::UnknownWorkCenter {
                order: order.id.clone(),
                center: order.work_center_id.clone(),
            });
        }
        for dep in &order.depends_on {
            if !order_index.contains_key(dep.as_str()) {
                return Err(ReflowError::UnknownDependency {
                    order: order.id.clone(),
                    missing: dep.clone(),
                });
            }
        }
    }

    let mut schedule = Schedule::new();
    let mut changes: Vec<Change> = Vec::new();

    let mut queue: VecDeque<usize> = (0..orders.len()).collect();
    let budget = orders.len() * DRIVER_ROUNDS_PER_ORDER;
    let mut rounds = 0usize;

    while let Some(idx) = queue.pop_front() {
        rounds += 1;
        if rounds > budget {
            return Ok(ReflowResult {
                success: false,
                updated_work_orders: schedule,
                changes,
                explanation: format!("Worklist did not settle within {} iterations", budget),
                errors: Vec::new(),
            });
        }

        let order = &orders[idx];
        if schedule.contains(&order.id) {
            continue;
        }

        let waiting: Vec<usize> = order
            .depends_on
            .iter()
            .map(|dep| order_index[dep.as_str()])
            .filter(|&dep_idx| !schedule.contains(&orders[dep_idx].id))
            .collect();
        if !waiting.is_empty() {
            for &dep_idx in waiting.iter().rev() {
                queue.push_front(dep_idx);
            }
            queue.push_back(idx);
            continue;
        }

        // Pinned: times are authoritative, never moved.
        if order.is_maintenance {
            schedule.place(order.clone());
            continue;
        }

        let wc = center_index[order.work_center_id.as_str()];

        // Earliest start: the original start pushed past every placed
        // dependency's end, wherever that dependency runs.
        let mut earliest = order.start;
        for dep_id in &order.depends_on {
            if let Some(dep) = schedule.find(dep_id) {
                earliest = earliest.max(dep.end);
            }
        }
        let snapped = next_available(earliest, wc);

        let resolved = resolve_placement(order, snapped, wc, schedule.orders_on(&wc.id))
            .map_err(|e| match e {
                PlacementError::Unresolved { order, limit } => {
                    ReflowError::ConflictResolution { order, limit }
                }
                PlacementError::Calendar(CalendarError::ProjectionBudget { center, limit }) => {
                    ReflowError::CalendarProjection { center, limit }
                }
            })?;

        if resolved.start != order.start || resolved.end != order.end {
            changes.push(Change {
                work_order_id: order.id.clone(),
                work_order_number: order.number.clone(),
                old_start: order.start,
                old_end: order.end,
                new_start: resolved.start,
                new_end: resolved.end,
                delay_minutes: (resolved.end - order.end).num_minutes().max(0),
                reason: change_reason(order, &schedule),
            });
        }

        let mut placed = order.clone();
        placed.start = resolved.start;
        placed.end = resolved.end;
        schedule.place(placed);
    }

    let report = validate_schedule(&schedule, centers);
    let explanation = if report.valid {
        ReflowResult::summary(&changes)
    } else {
        report.errors.join("; ")
    };

    Ok(ReflowResult {
        success: report.valid,
        updated_work_orders: schedule,
        changes,
        explanation,
        errors: report.errors,
    })
}

/// Classify why an order moved: a dependency that now finishes after the
/// order's original start, else other work already holding the machine,
/// else the calendar itself.
fn change_reason(order: &WorkOrder, schedule: &Schedule) -> String {
    for dep_id in &order.depends_on {
        if let Some(dep) = schedule.find(dep_id) {
            if dep.end > order.start {
                return format!("Delayed by dependency {}", dep.number);
            }
        }
    }
    if !schedule.orders_on(&order.work_center_id).is_empty() {
        return "Machine conflict with other scheduled work".into();
    }
    "Shift or maintenance constraint".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use reflow_core::{Instant, Shift};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Instant {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn weekday_center(id: &str) -> WorkCenter {
        let mut wc = WorkCenter::new(id);
        for day in 1..=5 {
            wc = wc.shift(Shift::new(day, 8, 16));
        }
        wc
    }

    #[test]
    fn empty_input_is_rejected() {
        let result = reflow(&[weekday_center("wc-1")], &[]).unwrap();
        assert!(!result.success);
        assert!(result.updated_work_orders.is_empty());
        assert!(result.explanation.contains("no work orders"));
    }

    #[test]
    fn unknown_work_center_is_fatal() {
        let orders = vec![WorkOrder::new("a").on("wc-ghost")];
        let err = reflow(&[weekday_center("wc-1")], &orders).unwrap_err();
        assert!(matches!(err, ReflowError::UnknownWorkCenter { .. }));
    }

    #[test]
    fn unknown_dependency_is_fatal() {
        let orders = vec![WorkOrder::new("a").on("wc-1").depends_on("ghost")];
        let err = reflow(&[weekday_center("wc-1")], &orders).unwrap_err();
        assert!(matches!(
            err,
            ReflowError::UnknownDependency { ref missing, .. } if missing == "ghost"
        ));
    }

    #[test]
    fn cycle_is_soft_rejected() {
        let orders = vec![
            WorkOrder::new("a").on("wc-1").depends_on("b"),
            WorkOrder::new("b").on("wc-1").depends_on("a"),
        ];
        let result = reflow(&[weekday_center("wc-1")], &orders).unwrap();
        assert!(!result.success);
        assert!(result.errors[0].contains("Circular dependency detected"));
        assert!(result.updated_work_orders.is_empty());
    }

    #[test]
    fn maintenance_order_is_never_moved() {
        let wc = weekday_center("wc-1");
        // Deliberately outside any shift: pinned times are authoritative.
        let pinned = WorkOrder::new("pm")
            .on("wc-1")
            .window(at(2026, 1, 3, 22, 0), at(2026, 1, 4, 2, 0))
            .duration_minutes(240)
            .maintenance();

        let result = reflow(&[wc], std::slice::from_ref(&pinned)).unwrap();
        assert!(result.success);
        assert!(result.changes.is_empty());
        let placed = result.updated_work_orders.find("pm").unwrap();
        assert_eq!(placed.start, pinned.start);
        assert_eq!(placed.end, pinned.end);
    }

    #[test]
    fn cross_machine_dependency_pushes_successor() {
        let centers = vec![weekday_center("wc-1"), weekday_center("wc-2")];
        let orders = vec![
            WorkOrder::new("a")
                .on("wc-1")
                .window(at(2026, 1, 5, 9, 0), at(2026, 1, 5, 12, 0))
                .duration_minutes(180),
            WorkOrder::new("b")
                .on("wc-2")
                .window(at(2026, 1, 5, 9, 0), at(2026, 1, 5, 10, 0))
                .duration_minutes(60)
                .depends_on("a"),
        ];

        let result = reflow(&centers, &orders).unwrap();
        assert!(result.success, "errors: {:?}", result.errors);
        let b = result.updated_work_orders.find("b").unwrap();
        assert_eq!(b.start, at(2026, 1, 5, 12, 0));
        assert_eq!(b.end, at(2026, 1, 5, 13, 0));
    }

    #[test]
    fn dependency_listed_after_successor_is_placed_first() {
        let centers = vec![weekday_center("wc-1")];
        let orders = vec![
            WorkOrder::new("b")
                .on("wc-1")
                .window(at(2026, 1, 5, 9, 0), at(2026, 1, 5, 10, 0))
                .duration_minutes(60)
                .depends_on("a"),
            WorkOrder::new("a")
                .on("wc-1")
                .window(at(2026, 1, 5, 9, 0), at(2026, 1, 5, 10, 0))
                .duration_minutes(60),
        ];

        let result = reflow(&centers, &orders).unwrap();
        assert!(result.success, "errors: {:?}", result.errors);

        // The dependency keeps its slot; the successor moves behind it.
        let a = result.updated_work_orders.find("a").unwrap();
        let b = result.updated_work_orders.find("b").unwrap();
        assert_eq!(a.start, at(2026, 1, 5, 9, 0));
        assert_eq!(b.start, at(2026, 1, 5, 10, 0));

        let ids: Vec<&str> = result
            .updated_work_orders
            .orders_on("wc-1")
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn change_reason_prefers_dependency_over_conflict() {
        let mut schedule = Schedule::new();
        schedule.place(
            WorkOrder::new("dep")
                .number("WO-DEP")
                .on("wc-1")
                .window(at(2026, 1, 5, 9, 0), at(2026, 1, 5, 11, 0)),
        );

        let order = WorkOrder::new("o")
            .on("wc-1")
            .window(at(2026, 1, 5, 9, 0), at(2026, 1, 5, 10, 0))
            .depends_on("dep");
        assert_eq!(change_reason(&order, &schedule), "Delayed by dependency WO-DEP");

        // Dependency ends before the original start: the machine is the cause.
        let order = WorkOrder::new("o")
            .on("wc-1")
            .window(at(2026, 1, 5, 12, 0), at(2026, 1, 5, 13, 0))
            .depends_on("dep");
        assert_eq!(
            change_reason(&order, &schedule),
            "Machine conflict with other scheduled work"
        );

        // Nothing else on the machine: the calendar did it.
        let order = WorkOrder::new("o")
            .on("wc-2")
            .window(at(2026, 1, 5, 12, 0), at(2026, 1, 5, 13, 0));
        assert_eq!(change_reason(&order, &schedule), "Shift or maintenance constraint");
    }

    #[test]
    fn engine_implements_the_reflow_trait() {
        let engine = GreedyReflow::default();
        let orders = vec![WorkOrder::new("a")
            .on("wc-1")
            .window(at(2026, 1, 5, 9, 0), at(2026, 1, 5, 10, 0))
            .duration_minutes(60)];
        let result = Reflow::reflow(&engine, &[weekday_center("wc-1")], &orders).unwrap();
        assert!(result.success);
    }
}
