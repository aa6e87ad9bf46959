use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::capabilities::{
    LocationFix, LocationRequestConfig, PermissionKind, PermissionState,
};
use crate::gate::PermissionGate;
use crate::{ToastKind, ToastMessage, DEFAULT_DECIMAL_SEPARATOR, MAX_UTC_OFFSET_SECS};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    #[error("latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("timestamp {0} ms cannot be represented as a date")]
    TimestampOutOfRange(i64),
}

/// A validated reading. Immutable; a newer one replaces it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    timestamp_ms: i64,
}

impl PositionSample {
    pub fn new(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        timestamp_ms: i64,
    ) -> Result<Self, SampleError> {
        for (field, value) in [
            ("latitude", latitude),
            ("longitude", longitude),
            ("altitude", altitude),
        ] {
            if !value.is_finite() {
                return Err(SampleError::NotFinite { field });
            }
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(SampleError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(SampleError::LongitudeOutOfRange(longitude));
        }
        if DateTime::from_timestamp_millis(timestamp_ms).is_none() {
            return Err(SampleError::TimestampOutOfRange(timestamp_ms));
        }

        Ok(Self {
            latitude,
            longitude,
            altitude,
            timestamp_ms,
        })
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Meters above the WGS84 ellipsoid.
    #[must_use]
    pub const fn altitude(&self) -> f64 {
        self.altitude
    }

    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

impl TryFrom<LocationFix> for PositionSample {
    type Error = SampleError;

    fn try_from(fix: LocationFix) -> Result<Self, Self::Error> {
        Self::new(fix.latitude, fix.longitude, fix.altitude, fix.time_ms)
    }
}

/// A phone number as typed by the user, trimmed. Never empty.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient(String);

impl Recipient {
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masks all but the last two characters, for logs.
    #[must_use]
    pub fn redacted(&self) -> String {
        let count = self.0.chars().count();
        self.0
            .chars()
            .enumerate()
            .map(|(i, c)| if i + 2 < count { '*' } else { c })
            .collect()
    }
}

// Phone numbers stay out of debug output.
impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Recipient").field(&self.redacted()).finish()
    }
}

/// Message body composed from a sample. Only produced by the composer, so
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub(crate) fn new(body: String) -> Self {
        Self(body)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// The four read-only labels on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDisplay {
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ScreenState {
    #[default]
    Idle,
    HasSample(PositionSample),
}

impl ScreenState {
    #[must_use]
    pub const fn sample(&self) -> Option<&PositionSample> {
        match self {
            Self::Idle => None,
            Self::HasSample(sample) => Some(sample),
        }
    }

    #[must_use]
    pub const fn has_sample(&self) -> bool {
        matches!(self, Self::HasSample(_))
    }

    /// Replaces the held sample. Returns `true` on the `Idle -> HasSample`
    /// transition.
    pub fn record(&mut self, sample: PositionSample) -> bool {
        let first = !self.has_sample();
        *self = Self::HasSample(sample);
        first
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lifecycle {
    #[default]
    Inactive,
    Active,
}

impl Lifecycle {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Tracks the single effective location subscription. Every start bumps the
/// generation; batches tagged with an older generation are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocationSubscription {
    generation: u64,
    active: bool,
}

impl LocationSubscription {
    pub fn begin(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.active = true;
        self.generation
    }

    pub fn end(&mut self) {
        self.active = false;
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn accepts(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayTimeZone {
    /// The device's zone as reported by the OS clock.
    #[default]
    DeviceLocal,
    FixedOffset { seconds: i32 },
}

impl DisplayTimeZone {
    /// Offsets beyond a day are not representable; they fall back to the
    /// device zone.
    #[must_use]
    pub fn from_offset_seconds(seconds: Option<i32>) -> Self {
        match seconds {
            Some(seconds) if (-MAX_UTC_OFFSET_SECS..=MAX_UTC_OFFSET_SECS).contains(&seconds) => {
                Self::FixedOffset { seconds }
            }
            _ => Self::DeviceLocal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub decimal_separator: char,
    pub time_zone: DisplayTimeZone,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            decimal_separator: DEFAULT_DECIMAL_SEPARATOR,
            time_zone: DisplayTimeZone::DeviceLocal,
        }
    }
}

impl DisplaySettings {
    #[must_use]
    pub fn with_decimal_separator(mut self, separator: char) -> Self {
        self.decimal_separator = if separator.is_ascii_digit() || separator == '-' {
            DEFAULT_DECIMAL_SEPARATOR
        } else {
            separator
        };
        self
    }

    #[must_use]
    pub fn with_time_zone(mut self, time_zone: DisplayTimeZone) -> Self {
        self.time_zone = time_zone;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionStates {
    pub location: PermissionState,
    pub sms: PermissionState,
}

impl PermissionStates {
    pub fn set(&mut self, kind: PermissionKind, state: PermissionState) {
        match kind {
            PermissionKind::FineLocation => self.location = state,
            PermissionKind::SendSms => self.sms = state,
        }
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub screen: ScreenState,
    pub lifecycle: Lifecycle,
    pub subscription: LocationSubscription,
    pub location_config: LocationRequestConfig,
    pub settings: DisplaySettings,

    /// Raw text of the phone number field; trimmed only when sending.
    pub recipient_input: String,
    pub display: Option<LocationDisplay>,
    /// Composed body waiting on the SMS permission. Taken when handed to
    /// the sender.
    pub pending_message: Option<StatusMessage>,

    pub permissions: PermissionStates,
    pub gate: PermissionGate,
    pub active_toast: Option<ToastMessage>,
}

impl Model {
    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind));
    }

    pub fn clear_toast(&mut self) {
        self.active_toast = None;
    }

    #[must_use]
    pub fn recipient(&self) -> Option<Recipient> {
        Recipient::parse(&self.recipient_input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PositionSample {
        PositionSample::new(40.416_775, -3.703_79, 667.0, 1_700_000_000_000).unwrap()
    }

    mod sample_tests {
        use super::*;

        #[test]
        fn test_valid_sample() {
            let s = sample();
            assert_eq!(s.latitude(), 40.416_775);
            assert_eq!(s.longitude(), -3.703_79);
            assert_eq!(s.altitude(), 667.0);
            assert_eq!(s.timestamp_ms(), 1_700_000_000_000);
        }

        #[test]
        fn test_rejects_non_finite() {
            assert_eq!(
                PositionSample::new(f64::NAN, 0.0, 0.0, 0),
                Err(SampleError::NotFinite { field: "latitude" })
            );
            assert_eq!(
                PositionSample::new(0.0, f64::INFINITY, 0.0, 0),
                Err(SampleError::NotFinite { field: "longitude" })
            );
            assert_eq!(
                PositionSample::new(0.0, 0.0, f64::NEG_INFINITY, 0),
                Err(SampleError::NotFinite { field: "altitude" })
            );
        }

        #[test]
        fn test_rejects_out_of_range() {
            assert!(matches!(
                PositionSample::new(90.1, 0.0, 0.0, 0),
                Err(SampleError::LatitudeOutOfRange(_))
            ));
            assert!(matches!(
                PositionSample::new(0.0, -180.5, 0.0, 0),
                Err(SampleError::LongitudeOutOfRange(_))
            ));
            assert!(matches!(
                PositionSample::new(0.0, 0.0, 0.0, i64::MAX),
                Err(SampleError::TimestampOutOfRange(_))
            ));
        }

        #[test]
        fn test_boundaries_and_negative_altitude() {
            assert!(PositionSample::new(90.0, 180.0, -430.5, 0).is_ok());
            assert!(PositionSample::new(-90.0, -180.0, 8_848.86, -1).is_ok());
        }

        #[test]
        fn test_from_fix() {
            let fix = LocationFix {
                latitude: 1.5,
                longitude: 2.5,
                altitude: 3.5,
                time_ms: 42,
            };
            let s = PositionSample::try_from(fix).unwrap();
            assert_eq!(s.latitude(), 1.5);
            assert_eq!(s.timestamp_ms(), 42);
        }
    }

    mod recipient_tests {
        use super::*;

        #[test]
        fn test_parse_trims() {
            let r = Recipient::parse(" 123456789 ").unwrap();
            assert_eq!(r.as_str(), "123456789");
        }

        #[test]
        fn test_parse_rejects_blank() {
            assert!(Recipient::parse("").is_none());
            assert!(Recipient::parse("   \t\n").is_none());
        }

        #[test]
        fn test_redacted() {
            let r = Recipient::parse("+34600111222").unwrap();
            assert_eq!(r.redacted(), "**********22");
            assert!(!format!("{r:?}").contains("600111"));

            let short = Recipient::parse("7").unwrap();
            assert_eq!(short.redacted(), "7");
        }
    }

    mod screen_state_tests {
        use super::*;

        #[test]
        fn test_record_reports_first_sample() {
            let mut state = ScreenState::default();
            assert!(!state.has_sample());
            assert!(state.sample().is_none());

            assert!(state.record(sample()));
            assert!(state.has_sample());

            let newer = PositionSample::new(1.0, 1.0, 1.0, 1).unwrap();
            assert!(!state.record(newer));
            assert_eq!(state.sample(), Some(&newer));
        }
    }

    mod subscription_tests {
        use super::*;

        #[test]
        fn test_generations() {
            let mut sub = LocationSubscription::default();
            assert!(!sub.is_active());

            let first = sub.begin();
            assert!(sub.accepts(first));

            sub.end();
            assert!(!sub.accepts(first));

            let second = sub.begin();
            assert_ne!(first, second);
            assert!(sub.accepts(second));
            assert!(!sub.accepts(first));
            assert_eq!(sub.generation(), second);
        }

        #[test]
        fn test_end_is_idempotent() {
            let mut sub = LocationSubscription::default();
            sub.end();
            sub.end();
            assert!(!sub.is_active());
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_time_zone_from_offset() {
            assert_eq!(
                DisplayTimeZone::from_offset_seconds(Some(3_600)),
                DisplayTimeZone::FixedOffset { seconds: 3_600 }
            );
            assert_eq!(
                DisplayTimeZone::from_offset_seconds(None),
                DisplayTimeZone::DeviceLocal
            );
            assert_eq!(
                DisplayTimeZone::from_offset_seconds(Some(90_000)),
                DisplayTimeZone::DeviceLocal
            );
        }

        #[test]
        fn test_decimal_separator_guard() {
            let settings = DisplaySettings::default().with_decimal_separator(',');
            assert_eq!(settings.decimal_separator, ',');

            let settings = DisplaySettings::default().with_decimal_separator('7');
            assert_eq!(settings.decimal_separator, '.');
        }

        #[test]
        fn test_permission_states() {
            let mut states = PermissionStates::default();
            states.set(PermissionKind::SendSms, PermissionState::Granted);
            assert_eq!(states.sms, PermissionState::Granted);
            assert_eq!(states.location, PermissionState::Unknown);
        }
    }

    #[test]
    fn test_model_default() {
        let model = Model::default();
        assert_eq!(model.screen, ScreenState::Idle);
        assert_eq!(model.lifecycle, Lifecycle::Inactive);
        assert!(!model.subscription.is_active());
        assert!(model.display.is_none());
        assert!(model.pending_message.is_none());
        assert!(model.active_toast.is_none());
        assert!(model.recipient().is_none());
    }

    #[test]
    fn test_model_toast() {
        let mut model = Model::default();
        model.show_toast("hola", ToastKind::Info);
        assert_eq!(model.active_toast.as_ref().unwrap().message, "hola");
        model.clear_toast();
        assert!(model.active_toast.is_none());
    }
}
