use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Guarded platform capabilities. Each kind maps to one OS permission
/// (`ACCESS_FINE_LOCATION`, `SEND_SMS` on Android) and doubles as the
/// request identity that correlates a prompt with its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    FineLocation,
    SendSms,
}

impl PermissionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FineLocation => "fine_location",
            Self::SendSms => "send_sms",
        }
    }
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the shell reports for a check or a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// The core's last known view of a permission. Display only; every guarded
/// action still asks the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    Unknown,
    Requesting,
    Granted,
    Denied,
}

impl From<PermissionStatus> for PermissionState {
    fn from(status: PermissionStatus) -> Self {
        match status {
            PermissionStatus::Granted => Self::Granted,
            PermissionStatus::Denied => Self::Denied,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "kind")]
pub enum PermissionOperation {
    /// Query the current grant without prompting.
    Check(PermissionKind),
    /// Show the OS prompt. Resolved once the user answers; an unanswered
    /// prompt is never resolved.
    Request(PermissionKind),
}

impl Operation for PermissionOperation {
    type Output = PermissionStatus;
}

#[derive(Clone)]
pub struct Permissions<E> {
    context: CapabilityContext<PermissionOperation, E>,
}

impl<Ev> Capability<Ev> for Permissions<Ev> {
    type Operation = PermissionOperation;
    type MappedSelf<MappedEv> = Permissions<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Permissions::new(self.context.map_event(f))
    }
}

impl<E> Permissions<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<PermissionOperation, E>) -> Self {
        Self { context }
    }

    pub fn check<F>(&self, kind: PermissionKind, callback: F)
    where
        F: FnOnce(PermissionStatus) -> E + Send + 'static,
    {
        self.dispatch(PermissionOperation::Check(kind), callback);
    }

    pub fn request<F>(&self, kind: PermissionKind, callback: F)
    where
        F: FnOnce(PermissionStatus) -> E + Send + 'static,
    {
        self.dispatch(PermissionOperation::Request(kind), callback);
    }

    fn dispatch<F>(&self, operation: PermissionOperation, callback: F)
    where
        F: FnOnce(PermissionStatus) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let status = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(status));
        });
    }
}
