use thiserror::Error;

/// Failures surfaced by the webhook core.
///
/// Delivery outcomes (remote 5xx, refused connections, timeouts) are not
/// errors here; they are recorded on the delivery log as a
/// [`DeliveryFailure`](crate::models::DeliveryFailure).
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("subscription '{0}' not found")]
    NotFound(String),

    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("webhook queue is full, event {0} was not enqueued")]
    QueueFull(String),

    #[error("webhook dispatcher has shut down")]
    QueueClosed,

    #[error("secret integrity failure: {0}")]
    Integrity(String),

    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),
}

impl WebhookError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Storage failures risk losing the delivery audit trail and should page someone.
    pub fn is_escalated(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Integrity(_))
    }
}

impl From<rusqlite::Error> for WebhookError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.into())
    }
}

impl From<r2d2::Error> for WebhookError {
    fn from(err: r2d2::Error) -> Self {
        Self::Storage(err.into())
    }
}

pub type WebhookResult<T> = Result<T, WebhookError>;
