//! Per-order conflict resolution on a single machine.
//!
//! Given a proposed start for a work order, the resolver projects the
//! matching end through the machine's calendar, gathers overlaps with
//! already placed orders, and pushes the start past the latest
//! conflicting end until the order fits.

use crate::calendar::{next_available, project_end, CalendarError};
use reflow_core::{Instant, WorkCenter, WorkOrder, WorkOrderId};

/// How many push-forward rounds the resolver attempts before giving up
pub const RESOLVER_MAX_ROUNDS: u32 = 100;

/// Errors during conflict resolution
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementError {
    /// No conflict-free start found within the round budget
    Unresolved { order: WorkOrderId, limit: u32 },
    /// Calendar projection failed while probing a candidate start
    Calendar(CalendarError),
}

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementError::Unresolved { order, limit } => {
                write!(
                    f,
                    "Conflict resolution for work order '{}' did not converge within {} rounds",
                    order, limit
                )
            }
            PlacementError::Calendar(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PlacementError {}

impl From<CalendarError> for PlacementError {
    fn from(e: CalendarError) -> Self {
        PlacementError::Calendar(e)
    }
}

/// A resolved placement interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub start: Instant,
    pub end: Instant,
}

/// Search forward from `proposed` for the first start where `order` fits
/// on `wc` without overlapping any of the orders in `placed`.
///
/// When several conflicts end at the same latest instant any of them may
/// be treated as the blocker; the maximum is well-defined either way.
pub fn resolve_placement(
    order: &WorkOrder,
    proposed: Instant,
    wc: &WorkCenter,
    placed: &[WorkOrder],
) -> Result<Placement, PlacementError> {
    let mut start = proposed;

    for _ in 0..RESOLVER_MAX_ROUNDS {
        let end = project_end(start, order.duration_minutes, wc)?;
        let candidate = order.clone().window(start, end);

        let latest_conflict_end = placed
            .iter()
            .filter(|x| x.id != order.id && candidate.overlaps(x))
            .map(|x| x.end)
            .max();

        match latest_conflict_end {
            None => return Ok(Placement { start, end }),
            Some(latest) => start = next_available(latest, wc),
        }
    }

    Err(PlacementError::Unresolved {
        order: order.id.clone(),
        limit: RESOLVER_MAX_ROUNDS,
    })
}
