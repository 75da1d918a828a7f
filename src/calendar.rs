//! Calendar overlay for the date/time step, in the shapes the calendar
//! widget consumes (camelCase, `daysOfWeek` with Sunday = 0).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::availability::BookedEvent;
use crate::booking::model::AppointmentRecord;
use crate::config::BookingConfig;
use crate::hours::{BusinessHoursInterval, NormalizedHours, UnavailableInterval};
use crate::timezone::parse_slot_label;

const RESERVED_TITLE: &str = "Appointment reserved";
const RESERVED_COLOR: &str = "#0000FF";
const RESERVED_TEXT_COLOR: &str = "#FFFFFF";

const USER_SLOT_TITLE: &str = "Your appointment";
const USER_SLOT_COLOR: &str = "#00FF00";
const USER_SLOT_TEXT_COLOR: &str = "#000000";

const UNAVAILABLE_COLOR: &str = "#ffcccc";
const UNAVAILABLE_TEXT_COLOR: &str = "#cc0000";

/// ISO weekday (Monday = 1 .. Sunday = 7) to the widget's numbering
/// (Sunday = 0 .. Saturday = 6).
pub fn widget_day(iso_weekday: u8) -> u8 {
    iso_weekday % 7
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHoursSlot {
    pub days_of_week: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
}

impl From<&BusinessHoursInterval> for BusinessHoursSlot {
    fn from(interval: &BusinessHoursInterval) -> Self {
        Self {
            days_of_week: vec![widget_day(interval.weekday)],
            start_time: interval.start_time.format("%H:%M").to_string(),
            end_time: interval.end_time.format("%H:%M").to_string(),
        }
    }
}

/// Recurring background block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableSlot {
    pub days_of_week: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
    pub title: String,
    pub color: String,
    pub text_color: String,
    pub display: &'static str,
}

impl From<&UnavailableInterval> for UnavailableSlot {
    fn from(interval: &UnavailableInterval) -> Self {
        Self {
            days_of_week: vec![widget_day(interval.weekday)],
            start_time: interval.start_time.format("%H:%M").to_string(),
            end_time: interval.end_time.format("%H:%M").to_string(),
            title: interval.label.clone(),
            color: UNAVAILABLE_COLOR.to_string(),
            text_color: UNAVAILABLE_TEXT_COLOR.to_string(),
            display: if interval.is_background_display { "background" } else { "auto" },
        }
    }
}

/// A dated event: someone else's booking or the customer's own pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub color: String,
    pub text_color: String,
}

impl CalendarEvent {
    /// The customer's pending selection.
    pub fn user_slot(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            title: USER_SLOT_TITLE.to_string(),
            color: USER_SLOT_COLOR.to_string(),
            text_color: USER_SLOT_TEXT_COLOR.to_string(),
        }
    }
}

impl From<&BookedEvent> for CalendarEvent {
    fn from(event: &BookedEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            title: event.title.clone(),
            color: event.color.clone(),
            text_color: RESERVED_TEXT_COLOR.to_string(),
        }
    }
}

/// Widget display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSettings {
    pub slot_duration: String,
    pub min_time: String,
    pub max_time: String,
    pub first_day: u8,
    pub hidden_days: Vec<u8>,
}

impl CalendarSettings {
    pub fn from_config(config: &BookingConfig) -> Self {
        let secs = config.slot_duration.as_secs();
        Self {
            slot_duration: format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60),
            min_time: config.reference_span.start.format("%H:%M:%S").to_string(),
            max_time: config.reference_span.end.format("%H:%M:%S").to_string(),
            first_day: 1,
            hidden_days: vec![0],
        }
    }
}

/// Everything the date/time step draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarOverlay {
    pub business_hours: Vec<BusinessHoursSlot>,
    pub unavailable: Vec<UnavailableSlot>,
    pub events: Vec<CalendarEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_slot: Option<CalendarEvent>,
    pub settings: CalendarSettings,
}

impl CalendarOverlay {
    pub fn build(
        hours: &NormalizedHours,
        booked: &[BookedEvent],
        user_slot: Option<(DateTime<Utc>, DateTime<Utc>)>,
        settings: CalendarSettings,
    ) -> Self {
        Self {
            business_hours: hours.business_hours.iter().map(Into::into).collect(),
            unavailable: hours.unavailable.iter().map(Into::into).collect(),
            events: booked.iter().map(Into::into).collect(),
            user_slot: user_slot.map(|(start, end)| CalendarEvent::user_slot(start, end)),
            settings,
        }
    }
}

/// Turn stored appointments into booked events, reading each slot string
/// in `zone`. Unparsable slot strings are logged and skipped.
///
/// Slot strings record no zone. A slot written in a customer's zone that
/// differs from `zone` comes back shifted by the offset between the two.
pub fn booked_events(appointments: &[AppointmentRecord], zone: &Tz) -> Vec<BookedEvent> {
    appointments
        .iter()
        .filter_map(|appointment| match parse_slot_label(&appointment.date, zone) {
            Ok((start, end)) => Some(BookedEvent {
                start,
                end,
                title: RESERVED_TITLE.to_string(),
                color: RESERVED_COLOR.to_string(),
            }),
            Err(e) => {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    date = %appointment.date,
                    error = %e,
                    "Skipping appointment with unparsable slot"
                );
                None
            }
        })
        .collect()
}
