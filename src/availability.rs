//! Slot availability: the authoritative "can this range be booked" check.
//!
//! Business hours and unavailable blocks are weekly patterns evaluated as
//! time-of-day on the candidate's local date. Booked events are absolute
//! instants. All ranges are half-open `[start, end)`, so ranges that only
//! touch do not overlap.

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::hours::{BusinessHoursInterval, UnavailableInterval};

/// The range a customer is trying to select on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSelection {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CandidateSelection {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        overlaps(self.start, self.end, start, end)
    }
}

/// Someone else's confirmed reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub color: String,
}

/// Why a candidate was refused. Variants follow rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    EmptyRange,
    SpansMultipleDays,
    NoBusinessHours { weekday: u8 },
    OutsideBusinessHours {
        #[serde(with = "crate::hours::hhmm")]
        open: NaiveTime,
        #[serde(with = "crate::hours::hhmm")]
        close: NaiveTime,
    },
    Unavailable {
        #[serde(with = "crate::hours::hhmm")]
        start: NaiveTime,
        #[serde(with = "crate::hours::hhmm")]
        end: NaiveTime,
    },
    AlreadyBooked {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRange => write!(f, "selection has no duration"),
            Self::SpansMultipleDays => write!(f, "selection spans more than one day"),
            Self::NoBusinessHours { weekday } => {
                write!(f, "adviser does not work on weekday {weekday}")
            }
            Self::OutsideBusinessHours { open, close } => write!(
                f,
                "selection is outside business hours {} - {}",
                open.format("%H:%M"),
                close.format("%H:%M")
            ),
            Self::Unavailable { start, end } => write!(
                f,
                "selection overlaps unavailable time {} - {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            ),
            Self::AlreadyBooked { start, end } => write!(
                f,
                "selection overlaps an existing booking {} - {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            ),
        }
    }
}

fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// Run every rule in order and report the first failure.
pub fn check_selection(
    candidate: &CandidateSelection,
    zone: &Tz,
    business_hours: &[BusinessHoursInterval],
    unavailable: &[UnavailableInterval],
    booked: &[BookedEvent],
) -> Result<(), Rejection> {
    if candidate.start >= candidate.end {
        return Err(Rejection::EmptyRange);
    }

    // Rule 1: one calendar day in the viewing zone.
    let local_start = candidate.start.with_timezone(zone).naive_local();
    let local_end = candidate.end.with_timezone(zone).naive_local();
    if local_start.date() != local_end.date() {
        return Err(Rejection::SpansMultipleDays);
    }
    let weekday = local_start.date().weekday().number_from_monday() as u8;
    let (start_time, end_time) = (local_start.time(), local_end.time());

    // Rule 2: inside the day's business hours.
    let Some(hours) = business_hours.iter().find(|b| b.weekday == weekday) else {
        return Err(Rejection::NoBusinessHours { weekday });
    };
    if start_time < hours.start_time || end_time > hours.end_time {
        return Err(Rejection::OutsideBusinessHours {
            open: hours.start_time,
            close: hours.end_time,
        });
    }

    // Rule 3: clear of the day's unavailable blocks.
    if let Some(block) = unavailable
        .iter()
        .filter(|u| u.weekday == weekday)
        .find(|u| overlaps(start_time, end_time, u.start_time, u.end_time))
    {
        return Err(Rejection::Unavailable {
            start: block.start_time,
            end: block.end_time,
        });
    }

    // Rule 4: clear of existing bookings.
    if let Some(event) = booked.iter().find(|e| candidate.overlaps(e.start, e.end)) {
        return Err(Rejection::AlreadyBooked {
            start: event.start,
            end: event.end,
        });
    }

    Ok(())
}

/// Boolean form of [`check_selection`] for the calendar's select-allow hook.
pub fn is_selectable(
    candidate: &CandidateSelection,
    zone: &Tz,
    business_hours: &[BusinessHoursInterval],
    unavailable: &[UnavailableInterval],
    booked: &[BookedEvent],
) -> bool {
    match check_selection(candidate, zone, business_hours, unavailable, booked) {
        Ok(()) => true,
        Err(rejection) => {
            tracing::debug!(
                %rejection,
                start = %candidate.start,
                end = %candidate.end,
                "Selection not bookable"
            );
            false
        }
    }
}
