//! Calendar arithmetic over a work center's shifts and maintenance windows.
//!
//! All functions operate on UTC instants. Weekday numbering is
//! Sunday = 0 .. Saturday = 6, i.e. the ISO weekday taken modulo 7.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeDelta};
use reflow_core::{Instant, Shift, WorkCenter, WorkCenterId};

/// Iteration budget for `project_end`
pub const PROJECTION_MAX_ITERATIONS: u32 = 10_000;

/// Errors during calendar projection
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarError {
    /// The projection loop did not finish within its budget. Happens on
    /// degenerate calendars (no shifts, or windows blocking all of them).
    ProjectionBudget {
        center: WorkCenterId,
        limit: u32,
    },
}

impl std::fmt::Display for CalendarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarError::ProjectionBudget { center, limit } => {
                write!(
                    f,
                    "Calendar projection on work center '{}' exceeded {} iterations",
                    center, limit
                )
            }
        }
    }
}

impl std::error::Error for CalendarError {}

fn weekday_index(t: Instant) -> u8 {
    t.weekday().num_days_from_sunday() as u8
}

fn start_of_next_day(t: Instant) -> Instant {
    (t.date_naive() + Days::new(1)).and_time(NaiveTime::MIN).and_utc()
}

fn hour_on(date: NaiveDate, hour: u8) -> Instant {
    if hour >= 24 {
        (date + Days::new(1)).and_time(NaiveTime::MIN).and_utc()
    } else {
        date.and_hms_opt(u32::from(hour), 0, 0).unwrap().and_utc()
    }
}

/// The shift's `[start, end)` bounds on a concrete date
fn shift_bounds(date: NaiveDate, shift: &Shift) -> (Instant, Instant) {
    (hour_on(date, shift.start_hour), hour_on(date, shift.end_hour))
}

/// Advance an instant to the earliest `t' >= t` that lies inside a shift
/// and outside every maintenance window.
///
/// Every step jumps to a structural boundary (window end, next-day start,
/// shift start) that strictly advances the instant, so the loop needs no
/// budget. A work center without any non-empty shift has no working
/// instants; `t` comes back unchanged and `project_end`'s budget catches
/// the degenerate machine downstream.
pub fn next_available(t: Instant, wc: &WorkCenter) -> Instant {
    if !wc.shifts.iter().any(|s| s.end_hour > s.start_hour) {
        return t;
    }

    let mut current = t;
    loop {
        if let Some(window) = wc.maintenance_windows.iter().find(|w| w.contains(current)) {
            current = window.end;
            continue;
        }
        let Some(shift) = wc.shift_for_weekday(weekday_index(current)) else {
            current = start_of_next_day(current);
            continue;
        };
        let (shift_start, shift_end) = shift_bounds(current.date_naive(), shift);
        if current < shift_start {
            current = shift_start;
            continue;
        }
        if current >= shift_end {
            current = start_of_next_day(current);
            continue;
        }
        return current;
    }
}

/// Project a placement end: the instant reached after accumulating
/// `duration_minutes` of in-shift, non-maintenance working time starting
/// at `start`.
///
/// A shift segment is cut at the first maintenance window that opens
/// before the shift ends, so worked time never overlaps a window.
pub fn project_end(
    start: Instant,
    duration_minutes: i64,
    wc: &WorkCenter,
) -> Result<Instant, CalendarError> {
    let mut current = start;
    let mut remaining = duration_minutes;
    let mut iterations = 0u32;

    while remaining > 0 {
        iterations += 1;
        if iterations > PROJECTION_MAX_ITERATIONS {
            return Err(CalendarError::ProjectionBudget {
                center: wc.id.clone(),
                limit: PROJECTION_MAX_ITERATIONS,
            });
        }

        if wc.in_maintenance(current) {
            current = next_available(current, wc);
            continue;
        }
        let Some(shift) = wc.shift_for_weekday(weekday_index(current)) else {
            current = start_of_next_day(current);
            continue;
        };
        let (shift_start, shift_end) = shift_bounds(current.date_naive(), shift);
        if current < shift_start {
            current = shift_start;
            continue;
        }
        if current >= shift_end {
            current = start_of_next_day(current);
            continue;
        }

        // Work until the shift ends or the next maintenance window opens.
        let segment_end = wc
            .maintenance_windows
            .iter()
            .map(|w| w.start)
            .filter(|&s| current < s && s < shift_end)
            .min()
            .unwrap_or(shift_end);

        let available = (segment_end - current).num_minutes();
        let worked = available.min(remaining);
        current += TimeDelta::minutes(worked);
        remaining -= worked;
    }

    Ok(current)
}
