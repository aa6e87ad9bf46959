use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Recipient, StatusMessage};

/// A single text message handed to the platform's default SMS manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingSms {
    pub recipient: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum SmsOperation {
    Send(OutgoingSms),
}

/// The transport accepted the message. Delivery is not tracked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SmsOutput {
    Submitted,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SmsError {
    #[error("SMS is not available on this device")]
    NotAvailable,

    #[error("permission denied by user")]
    PermissionDenied,

    #[error("send failed: {reason}")]
    SendFailed { reason: String },
}

impl SmsError {
    #[must_use]
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed {
            reason: reason.into(),
        }
    }
}

pub type SmsResult = Result<SmsOutput, SmsError>;

impl Operation for SmsOperation {
    type Output = SmsResult;
}

#[derive(Clone)]
pub struct Sms<E> {
    context: CapabilityContext<SmsOperation, E>,
}

impl<Ev> Capability<Ev> for Sms<Ev> {
    type Operation = SmsOperation;
    type MappedSelf<MappedEv> = Sms<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Sms::new(self.context.map_event(f))
    }
}

impl<E> Sms<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<SmsOperation, E>) -> Self {
        Self { context }
    }

    /// Best-effort, single attempt. Both arguments are non-empty by
    /// construction.
    pub fn send<F>(&self, recipient: &Recipient, message: StatusMessage, callback: F)
    where
        F: FnOnce(SmsResult) -> E + Send + 'static,
    {
        let operation = SmsOperation::Send(OutgoingSms {
            recipient: recipient.as_str().to_owned(),
            body: message.into_string(),
        });
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(result));
        });
    }
}
