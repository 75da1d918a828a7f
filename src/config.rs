//! Configuration types.

use std::time::Duration;

use chrono::NaiveTime;

use crate::error::ConfigError;
use crate::hours::DayWindow;

/// Booking core configuration.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Window used for a weekday whose working hours are not filled in.
    pub default_window: DayWindow,
    /// Day span the calendar shows; gaps between it and an adviser's hours
    /// become unavailable background blocks.
    pub reference_span: DayWindow,
    /// Calendar slot granularity.
    pub slot_duration: Duration,
    /// Zone used to re-render stored slot strings on the calendar.
    pub display_time_zone: String,
    /// HTTP port for the demo server.
    pub port: u16,
    /// Sessions idle longer than this are dropped by the route layer.
    pub session_idle_timeout: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        let window = DayWindow::new(hm(8, 0), hm(18, 0));
        Self {
            default_window: window,
            reference_span: window,
            slot_duration: Duration::from_secs(30 * 60),
            display_time_zone: "UTC".to_string(),
            port: 8080,
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl BookingConfig {
    /// Build a config from `BOOKING_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> crate::error::Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let open = lookup("BOOKING_DEFAULT_OPEN")
            .map(|v| parse_time("BOOKING_DEFAULT_OPEN", &v))
            .transpose()?;
        let close = lookup("BOOKING_DEFAULT_CLOSE")
            .map(|v| parse_time("BOOKING_DEFAULT_CLOSE", &v))
            .transpose()?;
        config.default_window = DayWindow::new(
            open.unwrap_or(config.default_window.start),
            close.unwrap_or(config.default_window.end),
        );

        let span_start = lookup("BOOKING_DAY_START")
            .map(|v| parse_time("BOOKING_DAY_START", &v))
            .transpose()?;
        let span_end = lookup("BOOKING_DAY_END")
            .map(|v| parse_time("BOOKING_DAY_END", &v))
            .transpose()?;
        config.reference_span = DayWindow::new(
            span_start.unwrap_or(config.reference_span.start),
            span_end.unwrap_or(config.reference_span.end),
        );

        if let Some(minutes) = lookup("BOOKING_SLOT_MINUTES") {
            let minutes: u64 = parse_number("BOOKING_SLOT_MINUTES", &minutes)?;
            if minutes == 0 {
                return Err(invalid("BOOKING_SLOT_MINUTES", "must be greater than zero"));
            }
            config.slot_duration = Duration::from_secs(minutes * 60);
        }

        if let Some(zone) = lookup("BOOKING_TIME_ZONE") {
            if zone.parse::<chrono_tz::Tz>().is_err() {
                return Err(invalid("BOOKING_TIME_ZONE", &format!("unknown zone '{zone}'")));
            }
            config.display_time_zone = zone;
        }

        if let Some(port) = lookup("BOOKING_PORT") {
            config.port = parse_number("BOOKING_PORT", &port)?;
        }

        if let Some(secs) = lookup("BOOKING_SESSION_IDLE_SECS") {
            let secs: u64 = parse_number("BOOKING_SESSION_IDLE_SECS", &secs)?;
            config.session_idle_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| invalid(key, &format!("expected HH:MM, got '{value}' ({e})")))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, &format!("'{value}': {e}")))
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
