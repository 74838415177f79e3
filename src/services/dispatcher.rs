//! Fan-out of one event to every matching subscription.
//!
//! ```text
//! Event --> resolve active subscriptions (tenant, event type)
//!             |
//!             +--> per subscription, concurrently:
//!                    sign body --> POST --> record attempt --> retry?
//! ```
//!
//! Each subscription is delivered in its own task; a slow or failing
//! endpoint never delays or fails its siblings. Outbound concurrency is
//! capped by a shared semaphore. Store and recorder calls run on the
//! blocking pool so a saturated connection pool never stalls the runtime.

use crate::error::{WebhookError, WebhookResult};
use crate::models::{ActiveSubscription, Delivery, DeliveryFailure, Event, NewDelivery};
use crate::services::signer::{self, ATTEMPT_HEADER, EVENT_HEADER, ID_HEADER, SIGNATURE_HEADER};
use crate::services::{deliveries, subscriptions::Subscriptions};
use crate::Database;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One signed POST, fully prepared.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub body: Arc<[u8]>,
    pub signature: String,
    pub event_type: String,
    pub event_id: String,
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Outbound delivery seam. The HTTP implementation is used in production;
/// tests substitute their own.
pub trait Transport: Send + Sync {
    /// Performs the request. `Err` is a network-level failure
    /// (refused, DNS, TLS, timeout) described as text.
    fn send<'a>(&'a self, request: &'a OutboundRequest) -> BoxFuture<'a, Result<TransportResponse, String>>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    body_limit: usize,
}

impl HttpTransport {
    pub fn new(timeout: Duration, body_limit: usize, user_agent: &str) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client, body_limit })
    }

    async fn read_limited(&self, mut resp: reqwest::Response) -> String {
        let mut buf: Vec<u8> = Vec::new();
        while buf.len() < self.body_limit {
            match resp.chunk().await {
                Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                Ok(None) | Err(_) => break,
            }
        }
        truncate_utf8(&String::from_utf8_lossy(&buf), self.body_limit)
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, request: &'a OutboundRequest) -> BoxFuture<'a, Result<TransportResponse, String>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(&request.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, &request.signature)
                .header(EVENT_HEADER, &request.event_type)
                .header(ID_HEADER, &request.event_id)
                .header(ATTEMPT_HEADER, request.attempt.to_string())
                .body(request.body.to_vec())
                .send()
                .await
                .map_err(describe_reqwest_error)?;

            let status = resp.status().as_u16();
            let body = self.read_limited(resp).await;
            Ok(TransportResponse { status, body })
        })
    }
}

fn describe_reqwest_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {}", err)
    } else if err.is_connect() {
        format!("connect: {}", err)
    } else {
        err.to_string()
    }
}

/// Cuts `s` to at most `limit` bytes on a char boundary.
pub fn truncate_utf8(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Bounded exponential-style retry schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(5),
                Duration::from_secs(30),
            ],
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Vec::new(),
        }
    }

    /// Delay before the attempt following `attempt` (1-based). The last
    /// configured step repeats if the schedule is shorter than the budget.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn should_retry(&self, attempt: u32, failure: &DeliveryFailure) -> bool {
        attempt < self.max_attempts && failure.is_retryable()
    }
}

pub struct Dispatcher {
    db: Database,
    subscriptions: Subscriptions,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    limiter: Arc<Semaphore>,
    max_in_flight: usize,
    body_limit: usize,
}

/// One attempt's outcome, owned so it can move onto the blocking pool.
struct AttemptRecord {
    subscription_id: String,
    tenant_id: String,
    event_id: String,
    event_type: String,
    payload: Arc<str>,
    response_status: Option<u16>,
    response_body: Option<String>,
    error: Option<String>,
    attempt: u32,
    duration_ms: u64,
}

impl AttemptRecord {
    fn as_new_delivery(&self) -> NewDelivery<'_> {
        NewDelivery {
            subscription_id: &self.subscription_id,
            tenant_id: &self.tenant_id,
            event_id: &self.event_id,
            event_type: &self.event_type,
            request_payload: &self.payload,
            response_status: self.response_status,
            response_body: self.response_body.as_deref(),
            error: self.error.as_deref(),
            attempt: self.attempt,
            duration_ms: self.duration_ms,
        }
    }
}

impl Dispatcher {
    pub fn new(
        db: Database,
        subscriptions: Subscriptions,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        max_in_flight: usize,
        body_limit: usize,
    ) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            db,
            subscriptions,
            transport,
            policy,
            limiter: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            body_limit,
        }
    }

    /// Upper bound on concurrent outbound requests.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    async fn resolve_targets(&self, event: &Event) -> WebhookResult<Vec<ActiveSubscription>> {
        let subscriptions = self.subscriptions.clone();
        let tenant_id = event.tenant_id.clone();
        let event_type = event.event_type.clone();
        tokio::task::spawn_blocking(move || {
            subscriptions.list_active_for_tenant_and_event(&tenant_id, &event_type)
        })
        .await
        .map_err(|e| WebhookError::Storage(e.into()))?
    }

    async fn record(&self, attempt: AttemptRecord) -> WebhookResult<Delivery> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || deliveries::record(&db, &attempt.as_new_delivery()))
            .await
            .map_err(|e| WebhookError::Storage(e.into()))?
    }

    /// Delivers `event` to every matching subscription and waits for all of
    /// them, returning every recorded attempt. No matches is a silent no-op.
    pub async fn dispatch(self: &Arc<Self>, event: Arc<Event>) -> Vec<Delivery> {
        let targets = match self.resolve_targets(&event).await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(
                    alert = "webhook_dispatch_unresolved",
                    event_id = %event.id,
                    event_type = %event.event_type,
                    tenant_id = %event.tenant_id,
                    error = %e,
                    "Failed to resolve webhook subscriptions"
                );
                return Vec::new();
            }
        };

        if targets.is_empty() {
            tracing::debug!(
                event_type = %event.event_type,
                tenant_id = %event.tenant_id,
                "No webhook subscriptions for event"
            );
            return Vec::new();
        }

        let body: Arc<[u8]> = match event.envelope_bytes() {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "Failed to serialize webhook envelope");
                return Vec::new();
            }
        };

        let mut tasks = JoinSet::new();
        for target in targets {
            let this = Arc::clone(self);
            let event = Arc::clone(&event);
            let body = Arc::clone(&body);
            tasks.spawn(async move { this.deliver(&target, &event, body).await });
        }

        let mut recorded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(mut attempts) => recorded.append(&mut attempts),
                Err(e) => tracing::error!(event_id = %event.id, error = %e, "Webhook delivery task panicked"),
            }
        }
        recorded
    }

    /// Runs the attempt/retry loop for one subscription. Every attempt is
    /// recorded before the next one starts or the loop ends.
    pub async fn deliver(
        &self,
        target: &ActiveSubscription,
        event: &Event,
        body: Arc<[u8]>,
    ) -> Vec<Delivery> {
        let sub = &target.subscription;
        let mut recorded = Vec::new();

        let signature = match signer::sign(&body, target.secret.expose()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!(subscription_id = %sub.id, error = %e, "Cannot sign webhook payload");
                return recorded;
            }
        };
        let payload_text: Arc<str> = Arc::from(String::from_utf8_lossy(&body).as_ref());

        let mut attempt = 1;
        loop {
            let request = OutboundRequest {
                url: sub.url.clone(),
                body: Arc::clone(&body),
                signature: signature.clone(),
                event_type: event.event_type.clone(),
                event_id: event.id.clone(),
                attempt,
            };

            let started = Instant::now();
            let result = {
                let _permit = match self.limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!(subscription_id = %sub.id, "Delivery limiter closed");
                        return recorded;
                    }
                };
                self.transport.send(&request).await
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            let (status, response_body, failure) = match result {
                Ok(resp) if (200..300).contains(&resp.status) => (Some(resp.status), Some(resp.body), None),
                Ok(resp) => (
                    Some(resp.status),
                    Some(resp.body),
                    Some(DeliveryFailure::Http(resp.status)),
                ),
                Err(message) => (None, None, Some(DeliveryFailure::Network(message))),
            };
            let response_body = response_body.map(|b| truncate_utf8(&b, self.body_limit));
            let error_text = match &failure {
                Some(DeliveryFailure::Network(message)) => Some(message.clone()),
                Some(DeliveryFailure::Http(status)) => Some(format!("endpoint returned HTTP {}", status)),
                None => None,
            };

            let outcome = AttemptRecord {
                subscription_id: sub.id.clone(),
                tenant_id: sub.tenant_id.clone(),
                event_id: event.id.clone(),
                event_type: event.event_type.clone(),
                payload: Arc::clone(&payload_text),
                response_status: status,
                response_body,
                error: error_text,
                attempt,
                duration_ms,
            };
            match self.record(outcome).await {
                Ok(row) => recorded.push(row),
                Err(e) => tracing::error!(
                    alert = "webhook_audit_loss",
                    subscription_id = %sub.id,
                    event_id = %event.id,
                    attempt,
                    error = %e,
                    "Failed to record webhook delivery attempt"
                ),
            }

            match failure {
                None => {
                    tracing::info!(
                        subscription_id = %sub.id,
                        tenant_id = %sub.tenant_id,
                        event_type = %event.event_type,
                        event_id = %event.id,
                        status = ?status,
                        attempt,
                        duration_ms,
                        "Webhook delivered"
                    );
                    return recorded;
                }
                Some(failure) if self.policy.should_retry(attempt, &failure) => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        subscription_id = %sub.id,
                        event_id = %event.id,
                        attempt,
                        failure = ?failure,
                        retry_in_ms = delay.as_millis() as u64,
                        "Webhook delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Some(failure) => {
                    tracing::warn!(
                        subscription_id = %sub.id,
                        tenant_id = %sub.tenant_id,
                        event_type = %event.event_type,
                        event_id = %event.id,
                        attempt,
                        failure = ?failure,
                        "Webhook delivery failed"
                    );
                    return recorded;
                }
            }
        }
    }
}
