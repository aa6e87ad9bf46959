// lib.rs - shared core for the SendGeo screen

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capabilities;
pub mod compose;
pub mod event;
pub mod gate;
pub mod model;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use event::Event;
pub use model::{
    DisplaySettings, DisplayTimeZone, LocationDisplay, Model, PositionSample, Recipient,
    SampleError, ScreenState, StatusMessage,
};

use capabilities::{LocationError, PermissionKind, PermissionState, SmsError};

pub const LOCATION_INTERVAL_MS: u64 = 1_000;
pub const LOCATION_FASTEST_INTERVAL_MS: u64 = 500;
pub const MIN_LOCATION_INTERVAL_MS: u64 = 100;
pub const MAX_LOCATION_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_DECIMAL_SEPARATOR: char = '.';
pub const MAX_UTC_OFFSET_SECS: i32 = 86_399;
pub const PLACEHOLDER_VALUE: &str = "--";
pub const SMS_SENT_MESSAGE: &str = "SMS enviado exitosamente";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Logged only.
    Silent,
    /// Shown to the user as a toast.
    Transient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NoSample,
    EmptyRecipient,
    LocationPermissionDenied,
    SmsPermissionDenied,
    TransmissionFailed,
    InvalidSample,
    LocationUnavailable,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoSample => "NO_SAMPLE",
            Self::EmptyRecipient => "EMPTY_RECIPIENT",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::SmsPermissionDenied => "SMS_PERMISSION_DENIED",
            Self::TransmissionFailed => "TRANSMISSION_FAILED",
            Self::InvalidSample => "INVALID_SAMPLE",
            Self::LocationUnavailable => "LOCATION_UNAVAILABLE",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::InvalidSample | Self::LocationUnavailable => ErrorSeverity::Silent,
            Self::NoSample
            | Self::EmptyRecipient
            | Self::LocationPermissionDenied
            | Self::SmsPermissionDenied
            | Self::TransmissionFailed => ErrorSeverity::Transient,
        }
    }

    #[must_use]
    pub const fn toast_kind(self) -> ToastKind {
        match self {
            Self::NoSample | Self::EmptyRecipient => ToastKind::Info,
            Self::LocationPermissionDenied | Self::SmsPermissionDenied => ToastKind::Warning,
            Self::TransmissionFailed | Self::InvalidSample | Self::LocationUnavailable => {
                ToastKind::Error
            }
        }
    }

    #[must_use]
    pub const fn for_denied(kind: PermissionKind) -> Self {
        match kind {
            PermissionKind::FineLocation => Self::LocationPermissionDenied,
            PermissionKind::SendSms => Self::SmsPermissionDenied,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn permission_denied(kind: PermissionKind) -> Self {
        Self::new(ErrorKind::for_denied(kind), format!("{kind} permission denied"))
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        matches!(self.severity, ErrorSeverity::Transient)
    }

    /// Toast text. Causes stay in the logs.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::NoSample => "No se pudo obtener la ubicación".into(),
            ErrorKind::EmptyRecipient => {
                "Por favor, ingrese un número y obtenga los datos".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Permiso denegado para acceder a la ubicación".into()
            }
            ErrorKind::SmsPermissionDenied => "Permiso denegado para enviar SMS".into(),
            ErrorKind::TransmissionFailed => "Error al enviar SMS".into(),
            ErrorKind::InvalidSample | ErrorKind::LocationUnavailable => {
                "No se pudo obtener la ubicación".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<SmsError> for AppError {
    fn from(e: SmsError) -> Self {
        let kind = match e {
            SmsError::PermissionDenied => ErrorKind::SmsPermissionDenied,
            SmsError::NotAvailable | SmsError::SendFailed { .. } => ErrorKind::TransmissionFailed,
        };
        Self::new(kind, "SMS transmission failed").with_internal(e.to_string())
    }
}

impl From<SampleError> for AppError {
    fn from(e: SampleError) -> Self {
        Self::new(ErrorKind::InvalidSample, e.to_string())
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        Self::new(ErrorKind::LocationUnavailable, "location provider error")
            .with_internal(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            duration_ms: kind.default_duration_ms(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(t: &ToastMessage) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub recipient: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub time: String,
    pub has_sample: bool,
    pub sampling: bool,
    pub location_permission: PermissionState,
    pub sms_permission: PermissionState,
    pub awaiting_sms_permission: bool,
    pub toast: Option<ToastView>,
}

pub mod app {
    use tracing::{debug, error, info, instrument, warn};

    use super::*;
    use crate::capabilities::{LocationResult, PermissionStatus, SmsOutput};
    use crate::compose::{compose, placeholder_display};
    use crate::gate::{Admission, GuardedAction};
    use crate::model::Lifecycle;

    #[derive(Default)]
    pub struct App;

    impl App {
        fn notify(model: &mut Model, error: &AppError) {
            warn!(code = error.code(), internal = ?error.internal_message, "{}", error.message);
            if error.is_user_visible() {
                model.show_toast(error.user_facing_message(), error.kind.toast_kind());
            }
        }

        #[instrument(skip(model, caps))]
        fn guard(action: GuardedAction, model: &mut Model, caps: &Capabilities) {
            match model.gate.admit(action) {
                Admission::Check(kind) => {
                    debug!(%kind, "querying permission");
                    caps.permissions
                        .check(kind, move |status| Event::PermissionChecked { kind, status });
                }
                Admission::Coalesced(kind) => {
                    debug!(%kind, "permission query already in flight");
                }
            }
        }

        fn resume(kind: PermissionKind, model: &mut Model, caps: &Capabilities) {
            if let Some(action) = model.gate.resume(kind) {
                Self::perform(action, model, caps);
            }
        }

        /// A grant observed earlier no longer holds.
        fn revoke(kind: PermissionKind, model: &mut Model, caps: &Capabilities) {
            warn!(%kind, "permission revoked");
            model.permissions.set(kind, PermissionState::Denied);
            if kind == PermissionKind::FineLocation {
                Self::stop_location_updates(model, caps);
            }
            Self::notify(model, &AppError::permission_denied(kind));
        }

        fn perform(action: GuardedAction, model: &mut Model, caps: &Capabilities) {
            match action {
                GuardedAction::StartLocationUpdates => Self::start_location_updates(model, caps),
                GuardedAction::SendStatusMessage => Self::send_status_message(model, caps),
            }
        }

        fn start_location_updates(model: &mut Model, caps: &Capabilities) {
            if !model.lifecycle.is_active() {
                debug!("screen inactive, sampling waits for the next activation");
                return;
            }

            let generation = model.subscription.begin();
            info!(generation, "starting location updates");
            caps.location
                .start_updates(model.location_config.clone(), move |result| {
                    Event::LocationUpdate {
                        generation,
                        result: Box::new(result),
                    }
                });
        }

        fn stop_location_updates(model: &mut Model, caps: &Capabilities) {
            if model.subscription.is_active() {
                info!(generation = model.subscription.generation(), "stopping location updates");
            }
            model.subscription.end();
            caps.location.stop_updates();
        }

        fn send_status_message(model: &mut Model, caps: &Capabilities) {
            let message = model.pending_message.take();

            let Some(recipient) = model.recipient() else {
                Self::notify(model, &AppError::new(ErrorKind::EmptyRecipient, "recipient is blank"));
                return;
            };
            let Some(message) = message else {
                Self::notify(model, &AppError::new(ErrorKind::NoSample, "no composed message"));
                return;
            };

            info!(recipient = %recipient.redacted(), "submitting status message");
            caps.sms
                .send(&recipient, message, |result| Event::SmsSent(Box::new(result)));
        }

        /// Returns `true` when the view changed.
        fn record_location(
            generation: u64,
            result: LocationResult,
            model: &mut Model,
            caps: &Capabilities,
        ) -> bool {
            if !model.subscription.accepts(generation) {
                debug!(
                    generation,
                    current = model.subscription.generation(),
                    "dropping update from superseded subscription"
                );
                return false;
            }

            let batch = match result {
                Ok(batch) if batch.is_empty() => {
                    debug!("empty location batch");
                    return false;
                }
                Ok(batch) => batch,
                Err(LocationError::PermissionRevoked) => {
                    Self::revoke(PermissionKind::FineLocation, model, caps);
                    return true;
                }
                Err(e) => {
                    let error = AppError::from(e);
                    warn!(code = error.code(), "{error}");
                    return false;
                }
            };

            let latest = batch
                .fixes
                .into_iter()
                .filter_map(|fix| match PositionSample::try_from(fix) {
                    Ok(sample) => Some(sample),
                    Err(e) => {
                        let error = AppError::from(e);
                        warn!(code = error.code(), "{error}");
                        None
                    }
                })
                .last();

            match latest {
                Some(sample) => {
                    let first = model.screen.record(sample);
                    if first {
                        info!("first position sample received");
                    }
                    first
                }
                None => false,
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        #[instrument(skip_all, fields(event = event.name()))]
        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            if event.is_user_initiated() {
                debug!("user action");
            }

            match event {
                Event::Noop => {}

                Event::ScreenActivated => {
                    model.lifecycle = Lifecycle::Active;
                    Self::guard(GuardedAction::StartLocationUpdates, model, caps);
                    caps.render.render();
                }

                Event::ScreenDeactivated => {
                    model.lifecycle = Lifecycle::Inactive;
                    Self::stop_location_updates(model, caps);
                    caps.render.render();
                }

                Event::RecipientChanged { text } => {
                    model.recipient_input = text;
                    caps.render.render();
                }

                Event::UpdateAndSendPressed => {
                    match model.screen.sample().copied() {
                        Some(sample) => {
                            let formatted = compose(&sample, &model.settings);
                            model.display = Some(formatted.display());
                            model.pending_message = Some(formatted.status_message());
                            Self::guard(GuardedAction::SendStatusMessage, model, caps);
                        }
                        None => Self::notify(
                            model,
                            &AppError::new(ErrorKind::NoSample, "no position sample yet"),
                        ),
                    }
                    caps.render.render();
                }

                Event::DismissToast => {
                    model.clear_toast();
                    caps.render.render();
                }

                // Labels keep their formatting until the next press.
                Event::LocaleChanged {
                    decimal_separator,
                    utc_offset_seconds,
                } => {
                    model.settings = model
                        .settings
                        .with_decimal_separator(decimal_separator)
                        .with_time_zone(DisplayTimeZone::from_offset_seconds(utc_offset_seconds));
                    debug!(settings = ?model.settings, "display settings updated");
                }

                Event::LocationUpdate { generation, result } => {
                    if Self::record_location(generation, *result, model, caps) {
                        caps.render.render();
                    }
                }

                Event::PermissionChecked { kind, status } => {
                    if !model.gate.is_pending(kind) {
                        debug!(%kind, "permission answer with nothing parked");
                        model.permissions.set(kind, status.into());
                        return;
                    }

                    if status.is_granted() {
                        model.permissions.set(kind, PermissionState::Granted);
                        Self::resume(kind, model, caps);
                    } else {
                        model.permissions.set(kind, PermissionState::Requesting);
                        info!(%kind, "prompting for permission");
                        caps.permissions.request(kind, move |status| {
                            Event::PermissionRequestCompleted { kind, status }
                        });
                    }
                    caps.render.render();
                }

                Event::PermissionRequestCompleted { kind, status } => {
                    model.permissions.set(kind, status.into());
                    info!(%kind, granted = status.is_granted(), "permission request completed");

                    if status == PermissionStatus::Granted {
                        Self::resume(kind, model, caps);
                    } else {
                        model.gate.abandon(kind);
                        Self::notify(model, &AppError::permission_denied(kind));
                    }
                    caps.render.render();
                }

                Event::SmsSent(result) => {
                    match *result {
                        Ok(SmsOutput::Submitted) => {
                            info!("status message submitted");
                            model.show_toast(SMS_SENT_MESSAGE, ToastKind::Success);
                        }
                        Err(SmsError::PermissionDenied) => {
                            error!("status message rejected, SMS permission gone");
                            Self::revoke(PermissionKind::SendSms, model, caps);
                        }
                        Err(e) => {
                            error!(error = %e, "status message not sent");
                            Self::notify(model, &AppError::from(e));
                        }
                    }
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let display = model.display.clone().unwrap_or_else(placeholder_display);

            ViewModel {
                recipient: model.recipient_input.clone(),
                latitude: display.latitude,
                longitude: display.longitude,
                altitude: display.altitude,
                time: display.time,
                has_sample: model.screen.has_sample(),
                sampling: model.subscription.is_active(),
                location_permission: model.permissions.location,
                sms_permission: model.permissions.sms,
                awaiting_sms_permission: model.gate.is_pending(PermissionKind::SendSms),
                toast: model.active_toast.as_ref().map(ToastView::from),
            }
        }
    }
}
