mod location;
mod permissions;
mod sms;

pub use self::location::{
    Location, LocationBatch, LocationError, LocationFix, LocationOperation, LocationPriority,
    LocationRequestConfig, LocationResult,
};
pub use self::permissions::{
    PermissionKind, PermissionOperation, PermissionState, PermissionStatus, Permissions,
};
pub use self::sms::{OutgoingSms, Sms, SmsError, SmsOperation, SmsOutput, SmsResult};

// Crux's built-in Render capability covers view updates as-is.
pub use crux_core::render::Render;

use crate::event::Event;
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub location: Location<Event>,
    pub sms: Sms<Event>,
    pub permissions: Permissions<Event>,
}
