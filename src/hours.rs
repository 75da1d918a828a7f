//! Working hours: turns an adviser's per-weekday records into canonical
//! business-hour intervals plus the unavailable blocks around them.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::BookingConfig;

/// Label carried by derived unavailable blocks.
pub const UNAVAILABLE_LABEL: &str = "Unavailable";

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Long English name for an ISO weekday (Monday = 1).
pub fn weekday_name(iso_weekday: u8) -> Option<&'static str> {
    match iso_weekday {
        1..=7 => Some(WEEKDAY_NAMES[usize::from(iso_weekday) - 1]),
        _ => None,
    }
}

/// `"HH:MM"` (de)serialization for `NaiveTime`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A time-of-day window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl DayWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }
}

/// Raw working hours for one weekday, as the adviser record stores them.
///
/// Times are packed `HHMM` numbers (`900` is 09:00). Either side missing
/// means "not filled in", which resolves to the default window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursRecord {
    /// ISO weekday, Monday = 1.
    pub weekday: u8,
    #[serde(default, deserialize_with = "packed_time")]
    pub start_hours: Option<u16>,
    #[serde(default, deserialize_with = "packed_time")]
    pub end_hours: Option<u16>,
}

impl WorkingHoursRecord {
    pub fn new(weekday: u8, start_hours: Option<u16>, end_hours: Option<u16>) -> Self {
        Self {
            weekday,
            start_hours,
            end_hours,
        }
    }
}

/// Accepts `900`, `"0900"`, `""` and `null`.
fn packed_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Packed {
        Number(u16),
        Text(String),
    }

    match Option::<Packed>::deserialize(d)? {
        None => Ok(None),
        Some(Packed::Number(n)) => Ok(Some(n)),
        Some(Packed::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Packed::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Decode a packed `HHMM` value. `None` if hour or minute is out of range.
pub fn parse_packed_time(packed: u16) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(u32::from(packed / 100), u32::from(packed % 100), 0)
}

/// The open window for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHoursInterval {
    pub weekday: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

/// A recurring weekly block the calendar shows as non-selectable background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableInterval {
    pub weekday: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub label: String,
    pub is_background_display: bool,
}

impl UnavailableInterval {
    fn new(weekday: u8, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            weekday,
            start_time,
            end_time,
            label: UNAVAILABLE_LABEL.to_string(),
            is_background_display: true,
        }
    }
}

/// Output of [`WorkingHoursNormalizer::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedHours {
    pub business_hours: Vec<BusinessHoursInterval>,
    pub unavailable: Vec<UnavailableInterval>,
}

/// Resolves working-hour records against a default window and a reference
/// day span. Stateless once built.
#[derive(Debug, Clone, Copy)]
pub struct WorkingHoursNormalizer {
    default_window: DayWindow,
    reference_span: DayWindow,
}

impl Default for WorkingHoursNormalizer {
    fn default() -> Self {
        Self::from_config(&BookingConfig::default())
    }
}

impl WorkingHoursNormalizer {
    pub fn new(default_window: DayWindow, reference_span: DayWindow) -> Self {
        Self {
            default_window,
            reference_span,
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(config.default_window, config.reference_span)
    }

    /// Resolve one record to its open window. Returns `None` for a weekday
    /// outside 1–7.
    pub fn resolve(&self, record: &WorkingHoursRecord) -> Option<DayWindow> {
        if weekday_name(record.weekday).is_none() {
            tracing::warn!(weekday = record.weekday, "Dropping working hours with invalid weekday");
            return None;
        }

        let (Some(start), Some(end)) = (record.start_hours, record.end_hours) else {
            return Some(self.default_window);
        };

        match (parse_packed_time(start), parse_packed_time(end)) {
            (Some(start), Some(end)) => Some(DayWindow::new(start, end)),
            _ => {
                tracing::warn!(
                    weekday = record.weekday,
                    start,
                    end,
                    "Unreadable packed working hours, using default window"
                );
                Some(self.default_window)
            }
        }
    }

    /// Produce business hours and their unavailable complements.
    ///
    /// A start later than the end is passed through untouched; no selection
    /// can fit inside such a window.
    pub fn normalize(&self, records: &[WorkingHoursRecord]) -> NormalizedHours {
        let mut out = NormalizedHours::default();
        let reference = self.reference_span;

        for record in records {
            let Some(window) = self.resolve(record) else {
                continue;
            };
            let weekday = record.weekday;

            out.business_hours.push(BusinessHoursInterval {
                weekday,
                start_time: window.start,
                end_time: window.end,
            });

            if window.start > reference.start {
                out.unavailable
                    .push(UnavailableInterval::new(weekday, reference.start, window.start));
            }
            if window.end < reference.end {
                out.unavailable
                    .push(UnavailableInterval::new(weekday, window.end, reference.end));
            }
        }

        out
    }
}

/// Human-readable opening hours, e.g. `"Monday: 09:00 - 17:00, Tuesday: ..."`.
///
/// Only days with both times filled in are listed.
pub fn format_operating_hours(records: &[WorkingHoursRecord]) -> String {
    records
        .iter()
        .filter_map(|r| {
            let name = weekday_name(r.weekday)?;
            let start = parse_packed_time(r.start_hours?)?;
            let end = parse_packed_time(r.end_hours?)?;
            Some(format!("{name}: {} - {}", start.format("%H:%M"), end.format("%H:%M")))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn packed_times_decode() {
        assert_eq!(parse_packed_time(900), Some(t(9, 0)));
        assert_eq!(parse_packed_time(1730), Some(t(17, 30)));
        assert_eq!(parse_packed_time(0), Some(t(0, 0)));
        assert_eq!(parse_packed_time(2400), None);
        assert_eq!(parse_packed_time(975), None);
    }

    #[test]
    fn tuesday_nine_to_five() {
        let records: Vec<WorkingHoursRecord> = serde_json::from_str(
            r#"[{"weekday": 2, "start_hours": "0900", "end_hours": "1700"}]"#,
        )
        .unwrap();
        let out = WorkingHoursNormalizer::default().normalize(&records);

        assert_eq!(
            out.business_hours,
            vec![BusinessHoursInterval {
                weekday: 2,
                start_time: t(9, 0),
                end_time: t(17, 0),
            }]
        );
        assert_eq!(out.unavailable.len(), 2);
        assert_eq!((out.unavailable[0].start_time, out.unavailable[0].end_time), (t(8, 0), t(9, 0)));
        assert_eq!((out.unavailable[1].start_time, out.unavailable[1].end_time), (t(17, 0), t(18, 0)));
        assert!(out.unavailable.iter().all(|u| u.weekday == 2 && u.is_background_display));
    }

    #[test]
    fn missing_side_falls_back_to_default_window() {
        let records = vec![
            WorkingHoursRecord::new(1, None, None),
            WorkingHoursRecord::new(3, Some(1000), None),
        ];
        let out = WorkingHoursNormalizer::default().normalize(&records);
        assert_eq!(out.business_hours.len(), 2);
        for bh in &out.business_hours {
            assert_eq!((bh.start_time, bh.end_time), (t(8, 0), t(18, 0)));
        }
        assert!(out.unavailable.is_empty());
    }

    #[test]
    fn configured_default_window_is_used() {
        let normalizer = WorkingHoursNormalizer::new(
            DayWindow::new(t(10, 0), t(16, 0)),
            DayWindow::new(t(8, 0), t(18, 0)),
        );
        let out = normalizer.normalize(&[WorkingHoursRecord::new(5, None, None)]);
        assert_eq!(out.business_hours[0].start_time, t(10, 0));
        assert_eq!(out.unavailable.len(), 2);
    }

    #[test]
    fn absent_weekdays_produce_nothing() {
        let records = vec![
            WorkingHoursRecord::new(1, Some(900), Some(1700)),
            WorkingHoursRecord::new(4, Some(800), Some(1800)),
        ];
        let out = WorkingHoursNormalizer::default().normalize(&records);
        let days: Vec<u8> = out.business_hours.iter().map(|b| b.weekday).collect();
        assert_eq!(days, vec![1, 4]);
        assert!(out.unavailable.iter().all(|u| u.weekday == 1));
    }

    #[test]
    fn hours_wider_than_reference_emit_no_gaps() {
        let out = WorkingHoursNormalizer::default()
            .normalize(&[WorkingHoursRecord::new(2, Some(700), Some(1900))]);
        assert_eq!(out.business_hours[0].start_time, t(7, 0));
        assert!(out.unavailable.is_empty());
    }

    #[test]
    fn inverted_window_is_kept_as_given() {
        let out = WorkingHoursNormalizer::default()
            .normalize(&[WorkingHoursRecord::new(2, Some(1700), Some(900))]);
        assert_eq!(out.business_hours[0].start_time, t(17, 0));
        assert_eq!(out.business_hours[0].end_time, t(9, 0));
        assert_eq!(out.unavailable.len(), 2);
    }

    #[test]
    fn invalid_weekday_is_dropped_and_bad_time_defaults() {
        let out = WorkingHoursNormalizer::default().normalize(&[
            WorkingHoursRecord::new(0, Some(900), Some(1700)),
            WorkingHoursRecord::new(8, Some(900), Some(1700)),
            WorkingHoursRecord::new(2, Some(961), Some(1700)),
        ]);
        assert_eq!(out.business_hours.len(), 1);
        assert_eq!(out.business_hours[0].start_time, t(8, 0));
    }

    #[test]
    fn packed_time_accepts_numbers_strings_and_blanks() {
        let records: Vec<WorkingHoursRecord> = serde_json::from_str(
            r#"[
                {"weekday": 1, "start_hours": 900, "end_hours": 1700},
                {"weekday": 2, "start_hours": "", "end_hours": null},
                {"weekday": 3}
            ]"#,
        )
        .unwrap();
        assert_eq!(records[0].start_hours, Some(900));
        assert_eq!(records[1].start_hours, None);
        assert_eq!(records[1].end_hours, None);
        assert_eq!(records[2].end_hours, None);
    }

    #[test]
    fn business_hours_serialize_as_hh_mm() {
        let bh = BusinessHoursInterval {
            weekday: 2,
            start_time: t(9, 0),
            end_time: t(17, 30),
        };
        let json = serde_json::to_value(&bh).unwrap();
        assert_eq!(json["start_time"], "09:00");
        assert_eq!(json["end_time"], "17:30");
    }

    #[test]
    fn operating_hours_summary_skips_unset_days() {
        let summary = format_operating_hours(&[
            WorkingHoursRecord::new(1, Some(900), Some(1700)),
            WorkingHoursRecord::new(2, None, Some(1700)),
            WorkingHoursRecord::new(6, Some(830), Some(1200)),
        ]);
        assert_eq!(summary, "Monday: 09:00 - 17:00, Saturday: 08:30 - 12:00");
    }
}
