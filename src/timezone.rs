//! Timezone boundary between the calendar (client-local instants) and the
//! stored slot string.
//!
//! The stored form of a booked slot is a single human-readable line:
//! `"Tuesday, 15 April 2025 : 10:00 - 10:30"`. Reading it back needs the
//! zone to interpret the wall-clock times in.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SlotParseError, TimezoneError};

const DATE_FORMAT: &str = "%A, %d %B %Y";
const TIME_FORMAT: &str = "%H:%M";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

static SLOT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*) : (\d{2}:\d{2}) - (\d{2}:\d{2})$").expect("slot pattern is valid")
});

static WEEKDAY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^,]+, ").expect("weekday prefix pattern is valid"));

/// Look up an IANA zone id such as `"Africa/Casablanca"`.
pub fn resolve_zone(zone_id: &str) -> Result<Tz, TimezoneError> {
    zone_id
        .trim()
        .parse::<Tz>()
        .map_err(|_| TimezoneError::UnknownZone(zone_id.to_string()))
}

/// Parse an instant from the calendar. Strings with an offset keep it;
/// strings without one are UTC wall-clock values.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, TimezoneError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimezoneError::MalformedInstant(raw.to_string()))
}

/// Convert a client instant to the canonical UTC instant. The zone must
/// resolve even when the instant carries its own offset.
pub fn to_canonical(raw: &str, zone_id: &str) -> Result<DateTime<Utc>, TimezoneError> {
    resolve_zone(zone_id)?;
    parse_instant(raw)
}

/// A slot rendered for people: long date plus 24-hour start/end times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySlot {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl DisplaySlot {
    /// `"HH:MM - HH:MM"`.
    pub fn time_range(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }

    /// The canonical storage string.
    pub fn label(&self) -> String {
        format!("{} : {}", self.date, self.time_range())
    }
}

/// Render a slot in an already-resolved zone.
pub fn display_in(start: DateTime<Utc>, end: DateTime<Utc>, zone: &Tz) -> DisplaySlot {
    let start = start.with_timezone(zone);
    let end = end.with_timezone(zone);
    DisplaySlot {
        date: start.format(DATE_FORMAT).to_string(),
        start_time: start.format(TIME_FORMAT).to_string(),
        end_time: end.format(TIME_FORMAT).to_string(),
    }
}

/// Render a slot in the client's zone.
pub fn to_display(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    zone_id: &str,
) -> Result<DisplaySlot, TimezoneError> {
    Ok(display_in(start, end, &resolve_zone(zone_id)?))
}

/// Canonical storage string for a slot, e.g.
/// `"Tuesday, 15 April 2025 : 10:00 - 10:30"`.
pub fn slot_label(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    zone_id: &str,
) -> Result<String, TimezoneError> {
    Ok(to_display(start, end, zone_id)?.label())
}

/// Read a stored slot string back into UTC instants, interpreting its
/// wall-clock times in `zone`.
pub fn parse_slot_label(
    label: &str,
    zone: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SlotParseError> {
    let caps = SLOT_PATTERN
        .captures(label)
        .ok_or_else(|| SlotParseError::Pattern(label.to_string()))?;

    let date_part = WEEKDAY_PREFIX.replace(caps[1].trim(), "");
    let date = NaiveDate::parse_from_str(&date_part, "%d %B %Y")
        .map_err(|_| SlotParseError::Date(date_part.to_string()))?;

    let start = parse_time(&caps[2])?;
    let end = parse_time(&caps[3])?;
    if end <= start {
        return Err(SlotParseError::Time(format!("{} - {}", &caps[2], &caps[3])));
    }

    Ok((localize(date, start, zone)?, localize(date, end, zone)?))
}

fn parse_time(raw: &str) -> Result<NaiveTime, SlotParseError> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT).map_err(|_| SlotParseError::Time(raw.to_string()))
}

fn localize(date: NaiveDate, time: NaiveTime, zone: &Tz) -> Result<DateTime<Utc>, TimezoneError> {
    let naive = date.and_time(time);
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimezoneError::NonexistentLocalTime(naive.to_string()))
}
