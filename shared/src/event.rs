use serde::{Deserialize, Serialize};

use crate::capabilities::{LocationResult, PermissionKind, PermissionStatus, SmsResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Event {
    #[default]
    Noop,

    /// The screen came to the foreground (`onResume`).
    ScreenActivated,
    /// The screen left the foreground (`onPause`).
    ScreenDeactivated,

    RecipientChanged {
        text: String,
    },
    UpdateAndSendPressed,
    DismissToast,

    /// Locale facts only the shell knows. `utc_offset_seconds: None` means
    /// follow the device clock.
    LocaleChanged {
        decimal_separator: char,
        utc_offset_seconds: Option<i32>,
    },

    // Shell responses
    #[serde(skip)]
    LocationUpdate {
        generation: u64,
        result: Box<LocationResult>,
    },
    #[serde(skip)]
    PermissionChecked {
        kind: PermissionKind,
        status: PermissionStatus,
    },
    #[serde(skip)]
    PermissionRequestCompleted {
        kind: PermissionKind,
        status: PermissionStatus,
    },
    #[serde(skip)]
    SmsSent(Box<SmsResult>),
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::ScreenActivated => "screen_activated",
            Self::ScreenDeactivated => "screen_deactivated",
            Self::RecipientChanged { .. } => "recipient_changed",
            Self::UpdateAndSendPressed => "update_and_send_pressed",
            Self::DismissToast => "dismiss_toast",
            Self::LocaleChanged { .. } => "locale_changed",
            Self::LocationUpdate { .. } => "location_update",
            Self::PermissionChecked { .. } => "permission_checked",
            Self::PermissionRequestCompleted { .. } => "permission_request_completed",
            Self::SmsSent(_) => "sms_sent",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::RecipientChanged { .. } | Self::UpdateAndSendPressed | Self::DismissToast
        )
    }
}
