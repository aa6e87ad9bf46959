//! Turns a position sample into the on-screen labels and the SMS body.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{DisplaySettings, DisplayTimeZone, LocationDisplay, PositionSample, StatusMessage};
use crate::PLACEHOLDER_VALUE;

pub const LATITUDE_DECIMALS: usize = 6;
pub const LONGITUDE_DECIMALS: usize = 6;
pub const ALTITUDE_DECIMALS: usize = 2;
pub const ALTITUDE_UNIT: &str = "metros";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const LATITUDE_LABEL: &str = "Latitud";
pub const LONGITUDE_LABEL: &str = "Longitud";
pub const ALTITUDE_LABEL: &str = "Altitud";
pub const TIME_LABEL: &str = "Tiempo";

/// Fixed-precision rendering of a sample, already localized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedPosition {
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub time: String,
}

impl FormattedPosition {
    #[must_use]
    pub fn display(&self) -> LocationDisplay {
        LocationDisplay {
            latitude: format!("{LATITUDE_LABEL}: {}", self.latitude),
            longitude: format!("{LONGITUDE_LABEL}: {}", self.longitude),
            altitude: format!("{ALTITUDE_LABEL}: {} {ALTITUDE_UNIT}", self.altitude),
            time: format!("{TIME_LABEL}: {}", self.time),
        }
    }

    #[must_use]
    pub fn status_message(&self) -> StatusMessage {
        StatusMessage::new(format!(
            "La latitud es {}. La longitud es {}. La altitud es {} {ALTITUDE_UNIT}. El tiempo fue {}.",
            self.latitude, self.longitude, self.altitude, self.time
        ))
    }
}

#[must_use]
pub fn compose(sample: &PositionSample, settings: &DisplaySettings) -> FormattedPosition {
    let separator = settings.decimal_separator;
    FormattedPosition {
        latitude: format_decimal(sample.latitude(), LATITUDE_DECIMALS, separator),
        longitude: format_decimal(sample.longitude(), LONGITUDE_DECIMALS, separator),
        altitude: format_decimal(sample.altitude(), ALTITUDE_DECIMALS, separator),
        time: format_time(sample.timestamp_ms(), settings.time_zone),
    }
}

/// Labels shown before the first press.
#[must_use]
pub fn placeholder_display() -> LocationDisplay {
    FormattedPosition {
        latitude: PLACEHOLDER_VALUE.into(),
        longitude: PLACEHOLDER_VALUE.into(),
        altitude: PLACEHOLDER_VALUE.into(),
        time: PLACEHOLDER_VALUE.into(),
    }
    .display()
}

/// Rounds to exactly `decimals` places and swaps in the locale separator.
#[must_use]
pub fn format_decimal(value: f64, decimals: usize, separator: char) -> String {
    let rendered = format!("{value:.decimals$}");
    if separator == '.' {
        rendered
    } else {
        rendered.replace('.', separator.encode_utf8(&mut [0; 4]))
    }
}

#[must_use]
pub fn format_timestamp<Tz>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    DateTime::from_timestamp_millis(timestamp_ms)
        .unwrap_or_default()
        .with_timezone(tz)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn format_time(timestamp_ms: i64, time_zone: DisplayTimeZone) -> String {
    match time_zone {
        DisplayTimeZone::DeviceLocal => format_timestamp(timestamp_ms, &Local),
        DisplayTimeZone::FixedOffset { seconds } => match FixedOffset::east_opt(seconds) {
            Some(offset) => format_timestamp(timestamp_ms, &offset),
            None => format_timestamp(timestamp_ms, &Utc),
        },
    }
}
