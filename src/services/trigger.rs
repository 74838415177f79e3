//! The entry point domain code uses to announce that something happened.
//!
//! `trigger` validates the event type, stamps the event and enqueues it on a
//! bounded channel. A background worker drains the channel and hands each
//! event to the [`Dispatcher`]; the caller never waits on delivery. The
//! worker holds a bounded number of dispatches, so backpressure reaches
//! the channel.

use crate::error::{WebhookError, WebhookResult};
use crate::models::Event;
use crate::services::catalog;
use crate::services::dispatcher::Dispatcher;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

pub struct WebhookService {
    sender: Mutex<Option<mpsc::Sender<Arc<Event>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WebhookService {
    /// Spawns the dispatch worker. Must be called inside a tokio runtime.
    pub fn start(dispatcher: Arc<Dispatcher>, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(dispatcher, receiver));
        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Emits `event_type` for `tenant_id` and returns the new event's id.
    ///
    /// Fails fast with [`WebhookError::UnknownEventType`] for event types
    /// outside the catalog; that is a programming error in the producer.
    /// [`WebhookError::QueueFull`] and [`WebhookError::QueueClosed`] mean the
    /// event was not accepted; producers log them and carry on.
    pub fn trigger(
        &self,
        event_type: &str,
        tenant_id: &str,
        data: serde_json::Value,
    ) -> WebhookResult<String> {
        if !catalog::is_valid_event_type(event_type) {
            tracing::error!(event_type = %event_type, tenant_id = %tenant_id, "Trigger called with unknown event type");
            return Err(WebhookError::UnknownEventType(event_type.to_string()));
        }
        if tenant_id.trim().is_empty() {
            return Err(WebhookError::validation("tenant id cannot be empty"));
        }

        let event = Arc::new(Event::new(event_type, tenant_id, data));
        let id = event.id.clone();

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(WebhookError::QueueClosed)?;

        match sender.try_send(event) {
            Ok(()) => {
                tracing::debug!(event_id = %id, event_type = %event_type, tenant_id = %tenant_id, "Webhook event queued");
                Ok(id)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::error!(
                    alert = "webhook_queue_full",
                    event_id = %id,
                    event_type = %event_type,
                    tenant_id = %tenant_id,
                    "Webhook queue full, event dropped"
                );
                Err(WebhookError::QueueFull(id))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(WebhookError::QueueClosed),
        }
    }

    /// Stops accepting events, then waits until everything already queued
    /// or in flight has been delivered and recorded.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Webhook worker terminated abnormally");
            }
        }
    }
}

/// Runs at most `max_in_flight` dispatches at once. While at the cap the
/// worker stops receiving, so a stalled endpoint fills the channel and
/// `trigger` reports `QueueFull` instead of buffering without bound.
async fn run_worker(dispatcher: Arc<Dispatcher>, mut receiver: mpsc::Receiver<Arc<Event>>) {
    let limit = dispatcher.max_in_flight();
    let mut in_flight = JoinSet::new();

    loop {
        while in_flight.len() >= limit {
            if let Some(done) = in_flight.join_next().await {
                log_join(done);
            }
        }

        let Some(event) = receiver.recv().await else {
            break;
        };
        let dispatcher = Arc::clone(&dispatcher);
        in_flight.spawn(async move {
            dispatcher.dispatch(event).await;
        });

        while let Some(done) = in_flight.try_join_next() {
            log_join(done);
        }
    }

    while let Some(done) = in_flight.join_next().await {
        log_join(done);
    }
    tracing::info!("Webhook worker drained and stopped");
}

fn log_join(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        tracing::error!(error = %e, "Webhook dispatch task panicked");
    }
}
