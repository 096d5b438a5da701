//! Intake worker pool — the queue consumer.
//!
//! A fixed pool of workers drains the ingest queue. Each worker claims one
//! message at a time and runs its full pipeline to completion before taking
//! the next: parse → classify → persist → publish. Malformed messages and
//! persistence failures are routed to the dead-letter destination; there is
//! no requeue path. Failures after the insert (alerting, fan-out) belong to
//! the bus subscribers and can never unwind the stored event.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fieldwatch_core::event::{EventSeverity, NewEvent};
use fieldwatch_core::inbound::parse_message;
use fieldwatch_db::store::{EventStore, IngestQueue, QueuedMessage};

use crate::bus::EventBus;

// ---------------------------------------------------------------------------
// IntakeConfig
// ---------------------------------------------------------------------------

/// Bounds for the worker pool size.
const MIN_WORKERS: usize = 1;
const MAX_WORKERS: usize = 10;

/// Configuration for the intake pool.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Number of concurrent intake workers. Clamped to `1..=10`.
    pub workers: usize,
    /// Poll interval when the queue just had messages.
    pub min_poll_interval: Duration,
    /// Poll interval ceiling when the queue stays empty.
    pub max_poll_interval: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            min_poll_interval: Duration::from_millis(100),
            max_poll_interval: Duration::from_secs(5),
        }
    }
}

impl IntakeConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(MIN_WORKERS, MAX_WORKERS);
        self
    }
}

// ---------------------------------------------------------------------------
// IntakePool
// ---------------------------------------------------------------------------

/// Fixed-size pool of intake workers.
pub struct IntakePool {
    store: Arc<dyn EventStore>,
    queue: Arc<dyn IngestQueue>,
    bus: Arc<EventBus>,
    config: IntakeConfig,
}

impl IntakePool {
    pub fn new(
        store: Arc<dyn EventStore>,
        queue: Arc<dyn IngestQueue>,
        bus: Arc<EventBus>,
        config: IntakeConfig,
    ) -> Self {
        let config = IntakeConfig {
            workers: config.workers.clamp(MIN_WORKERS, MAX_WORKERS),
            ..config
        };
        Self {
            store,
            queue,
            bus,
            config,
        }
    }

    /// Spawn the worker tasks.
    ///
    /// Workers run until `cancel` fires; a worker finishes its in-flight
    /// message before exiting (there is no cancellation of in-flight
    /// processing). Await the returned handles to drain the pool.
    pub fn spawn(self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        tracing::info!(workers = self.config.workers, "Starting intake workers");

        (0..self.config.workers)
            .map(|i| {
                let worker = IntakeWorker {
                    id: format!("intake-{i}"),
                    store: Arc::clone(&self.store),
                    queue: Arc::clone(&self.queue),
                    bus: Arc::clone(&self.bus),
                    config: self.config.clone(),
                };
                tokio::spawn(worker.run(cancel.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// IntakeWorker
// ---------------------------------------------------------------------------

struct IntakeWorker {
    id: String,
    store: Arc<dyn EventStore>,
    queue: Arc<dyn IngestQueue>,
    bus: Arc<EventBus>,
    config: IntakeConfig,
}

impl IntakeWorker {
    async fn run(self, cancel: CancellationToken) {
        let mut idle_interval = self.config.min_poll_interval;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.queue.claim(&self.id).await {
                Ok(Some(message)) => {
                    self.process(message).await;
                    idle_interval = self.config.min_poll_interval;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(idle_interval) => {}
                    }
                    idle_interval = (idle_interval * 2).min(self.config.max_poll_interval);
                }
                Err(e) => {
                    tracing::error!(worker = %self.id, error = %e, "Failed to claim message");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.max_poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(worker = %self.id, "Intake worker stopped");
    }

    /// Run one message through the full pipeline.
    async fn process(&self, message: QueuedMessage) {
        let parsed = match parse_message(&message.payload) {
            Ok(parsed) => parsed,
            Err(malformed) => {
                tracing::warn!(
                    worker = %self.id,
                    message_id = %message.id,
                    error = %malformed,
                    "Rejecting malformed message"
                );
                self.dead_letter(message.id, &malformed.to_string()).await;
                return;
            }
        };

        let received_at = Utc::now();
        if parsed.timestamp.is_none() {
            tracing::warn!(
                worker = %self.id,
                message_id = %message.id,
                "Missing or unparsable timestamp, using ingestion time"
            );
        }

        let new_event = NewEvent {
            event_type: parsed.event_type,
            equipment_id: parsed.equipment_id,
            equipment_type: parsed.equipment_type,
            farm_id: parsed.farm_id,
            timestamp: parsed.timestamp.unwrap_or(received_at),
            payload: parsed.payload,
            message: parsed.message,
            severity: EventSeverity::for_event_type(parsed.event_type),
            received_at,
        };

        let stored = match self.store.insert(new_event).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(
                    worker = %self.id,
                    message_id = %message.id,
                    error = %e,
                    "Failed to persist event"
                );
                self.dead_letter(message.id, &format!("persistence failed: {e}"))
                    .await;
                return;
            }
        };

        tracing::info!(
            worker = %self.id,
            event_id = %stored.id,
            event_type = %stored.event_type,
            severity = %stored.severity,
            farm_id = %stored.farm_id,
            "Event persisted"
        );

        // Downstream side effects only after the insert committed. The bus
        // never fails; subscribers handle their own errors.
        self.bus.publish(stored);

        if let Err(e) = self.queue.complete(message.id).await {
            // The message stays claimed; at worst the transport redelivers
            // it and a duplicate event row appears (no dedup key exists).
            tracing::error!(
                worker = %self.id,
                message_id = %message.id,
                error = %e,
                "Failed to remove completed message from queue"
            );
        }
    }

    async fn dead_letter(&self, message_id: uuid::Uuid, reason: &str) {
        if let Err(e) = self.queue.dead_letter(message_id, reason).await {
            tracing::error!(
                worker = %self.id,
                message_id = %message_id,
                error = %e,
                "Failed to dead-letter message"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
