use serde::Serialize;

/// One recorded attempt to deliver one envelope to one subscription.
///
/// Rows are append-only. `subscription_id` is a weak reference and may name
/// a subscription that has since been deleted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: i64,
    pub subscription_id: String,
    pub tenant_id: String,
    pub event_id: String,
    pub event_type: String,
    pub request_payload: String,
    pub response_status: Option<u16>,
    pub response_body: Option<String>,
    pub error: Option<String>,
    pub succeeded: bool,
    pub attempt: u32,
    pub duration_ms: u64,
    pub attempted_at: String,
}

/// Why an attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// Connection refused, DNS failure, TLS failure or timeout.
    Network(String),
    /// The endpoint answered with a non-2xx status.
    Http(u16),
}

impl DeliveryFailure {
    /// Network errors, 408, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http(status) => *status == 408 || *status == 429 || *status >= 500,
        }
    }
}

/// Everything the recorder needs to append one attempt.
#[derive(Debug, Clone)]
pub struct NewDelivery<'a> {
    pub subscription_id: &'a str,
    pub tenant_id: &'a str,
    pub event_id: &'a str,
    pub event_type: &'a str,
    pub request_payload: &'a str,
    pub response_status: Option<u16>,
    pub response_body: Option<&'a str>,
    pub error: Option<&'a str>,
    pub attempt: u32,
    pub duration_ms: u64,
}

impl NewDelivery<'_> {
    pub fn succeeded(&self) -> bool {
        matches!(self.response_status, Some(s) if (200..300).contains(&s))
    }
}
