//! Whole-schedule constraint validation.
//!
//! The validator accumulates human-readable error strings instead of
//! failing fast, so a broken schedule reports every violation at once.

use crate::graph::detect_cycles;
use reflow_core::{Schedule, WorkCenter, WorkOrder};
use std::collections::HashMap;

/// Outcome of validating a schedule
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check that every dependency of `order` is placed and finishes no
/// later than the order starts.
///
/// Dependencies are looked up across the whole schedule, not just the
/// order's own machine, so cross-machine chains validate correctly.
pub fn dependencies_satisfied(order: &WorkOrder, pool: &Schedule) -> bool {
    order
        .depends_on
        .iter()
        .all(|dep_id| pool.find(dep_id).is_some_and(|dep| dep.end <= order.start))
}

/// Validate a placed schedule against machine, dependency, and
/// maintenance constraints.
pub fn validate_schedule(schedule: &Schedule, centers: &[WorkCenter]) -> ValidationReport {
    let mut errors = Vec::new();

    let all_orders: Vec<WorkOrder> = schedule.iter_orders().cloned().collect();
    errors.extend(detect_cycles(&all_orders));

    let center_index: HashMap<&str, &WorkCenter> =
        centers.iter().map(|c| (c.id.as_str(), c)).collect();

    for (center_id, orders) in &schedule.centers {
        let center = center_index.get(center_id.as_str()).copied();
        if center.is_none() {
            errors.push(format!(
                "Work orders placed on unknown work center '{}'",
                center_id
            ));
        }

        for (i, order) in orders.iter().enumerate() {
            if !dependencies_satisfied(order, schedule) {
                for dep_id in &order.depends_on {
                    match schedule.find(dep_id) {
                        None => errors.push(format!(
                            "Work order {} depends on '{}' which is not in the schedule",
                            order.number, dep_id
                        )),
                        Some(dep) if dep.end > order.start => errors.push(format!(
                            "Work order {} starts at {} before dependency {} finishes at {}",
                            order.number, order.start, dep.number, dep.end
                        )),
                        Some(_) => {}
                    }
                }
            }

            for other in &orders[i + 1..] {
                if order.overlaps(other) {
                    errors.push(format!(
                        "Work orders {} and {} overlap on work center '{}'",
                        order.number, other.number, center_id
                    ));
                }
            }

            // A placement may span a window (the projection works around
            // it), but it may not start or end inside one: that only
            // happens when worked time ran through the window.
            if let Some(center) = center {
                for window in &center.maintenance_windows {
                    let starts_inside = window.contains(order.start);
                    let ends_inside =
                        order.start < order.end && order.end > window.start && order.end <= window.end;
                    if starts_inside || ends_inside {
                        errors.push(format!(
                            "Work order {} runs into the maintenance window {} - {} on '{}'",
                            order.number, window.start, window.end, center_id
                        ));
                    }
                }
            }
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
