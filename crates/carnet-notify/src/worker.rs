//! Notification worker: claims queued emails and delivers them.
//!
//! A single sequential consumer. Each message is claimed, handed to the
//! delivery adapter, then acknowledged on success or negatively
//! acknowledged on failure. Delivery may therefore happen more than once
//! for the same message (at-least-once); it is never silently dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use carnet_core::{defaults, DeliveryMode, NotificationQueue, QueuedMessage, Result};

use crate::delivery::EmailDelivery;

/// Configuration for the notification worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Claims older than this are treated as abandoned by a crashed
    /// worker and returned to the queue at startup.
    pub stuck_after_secs: u64,
    /// Whether to process messages at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::NOTIFY_POLL_INTERVAL_MS,
            stuck_after_secs: defaults::NOTIFY_STUCK_AFTER_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTIFY_WORKER_ENABLED` | `true` | Enable/disable delivery |
    /// | `NOTIFY_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    /// | `NOTIFY_STUCK_AFTER_SECS` | `300` | Age at which a claim counts as abandoned |
    pub fn from_env() -> Self {
        let enabled = std::env::var("NOTIFY_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("NOTIFY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::NOTIFY_POLL_INTERVAL_MS);

        let stuck_after_secs = std::env::var("NOTIFY_STUCK_AFTER_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::NOTIFY_STUCK_AFTER_SECS);

        Self {
            poll_interval_ms,
            stuck_after_secs,
            enabled,
        }
    }

    /// Set the polling interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the abandoned-claim threshold.
    pub fn with_stuck_after(mut self, secs: u64) -> Self {
        self.stuck_after_secs = secs;
        self
    }

    /// Enable or disable delivery.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the notification worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A message was delivered and acknowledged.
    MessageDelivered {
        message_id: Uuid,
        mode: DeliveryMode,
    },
    /// Delivery failed; the message was returned to the queue.
    MessageRetried {
        message_id: Uuid,
        attempt: i32,
        error: String,
    },
    /// Delivery failed past the attempt budget; the message is dead.
    MessageDead { message_id: Uuid, error: String },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| carnet_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that drains the notification queue.
pub struct NotifyWorker {
    queue: Arc<dyn NotificationQueue>,
    delivery: Arc<dyn EmailDelivery>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl NotifyWorker {
    /// Create a new worker over a queue and delivery adapter.
    pub fn new(
        queue: Arc<dyn NotificationQueue>,
        delivery: Arc<dyn EmailDelivery>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::WORKER_EVENT_CAPACITY);
        Self {
            queue,
            delivery,
            config,
            event_tx,
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop until shutdown.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Notification worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            mode = ?self.delivery.mode(),
            "Notification worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        self.recover_stuck().await;

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Notification worker received shutdown signal");
                break;
            }

            match self.queue.claim_next().await {
                Ok(Some(msg)) => {
                    self.process(msg).await;
                    // Drain the queue before sleeping again.
                }
                Ok(None) => {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("Notification worker received shutdown signal");
                            break;
                        }
                        _ = sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to claim next notification");
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = sleep(poll_interval) => {}
                    }
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Notification worker stopped");
    }

    /// Return abandoned claims from a previous crashed run to the queue.
    async fn recover_stuck(&self) {
        let cutoff = Duration::from_secs(self.config.stuck_after_secs);
        match self.queue.requeue_stuck(cutoff).await {
            Ok(0) => {}
            Ok(n) => warn!(requeued = n, "Requeued abandoned notification claims"),
            Err(e) => error!(error = %e, "Failed to requeue abandoned claims"),
        }
    }

    /// Deliver one claimed message, then ack or nack.
    async fn process(&self, msg: QueuedMessage) {
        let message_id = msg.id;
        debug!(
            message_id = %message_id,
            to = %msg.message.to,
            attempt = msg.attempts + 1,
            "Delivering notification"
        );

        match self.delivery.send(&msg.message).await {
            Ok(receipt) => {
                if let Err(e) = self.queue.ack(message_id).await {
                    // Delivery succeeded but the ack did not stick. The
                    // message will be redelivered; this is the at-least-once
                    // trade-off, not a lost email.
                    error!(message_id = %message_id, error = %e, "Failed to ack delivered notification");
                    return;
                }
                info!(
                    message_id = %message_id,
                    to = %msg.message.to,
                    mode = ?receipt.mode,
                    "Notification delivered"
                );
                let _ = self.event_tx.send(WorkerEvent::MessageDelivered {
                    message_id,
                    mode: receipt.mode,
                });
            }
            Err(e) => {
                let error = e.to_string();
                let attempt = msg.attempts + 1;
                let exhausted = attempt >= msg.max_attempts;

                if let Err(nack_err) = self.queue.nack(message_id, &error).await {
                    error!(message_id = %message_id, error = %nack_err, "Failed to nack notification");
                    return;
                }

                if exhausted {
                    error!(
                        message_id = %message_id,
                        to = %msg.message.to,
                        attempt,
                        error = %error,
                        "Notification moved to dead-letter state"
                    );
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::MessageDead { message_id, error });
                } else {
                    warn!(
                        message_id = %message_id,
                        to = %msg.message.to,
                        attempt,
                        error = %error,
                        "Notification delivery failed, will retry"
                    );
                    let _ = self.event_tx.send(WorkerEvent::MessageRetried {
                        message_id,
                        attempt,
                        error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::MockDelivery;
    use crate::memory::MemoryQueue;
    use carnet_core::{new_v7, NotificationMessage};
    use chrono::Utc;

    fn message(to: &str) -> NotificationMessage {
        NotificationMessage {
            to: to.to_string(),
            subject: "Note shared with you".to_string(),
            body: "A note was shared with you".to_string(),
            note_id: new_v7(),
            shared_by: "owner@example.com".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig::default().with_poll_interval(10)
    }

    async fn wait_for<F>(mut check: F)
    where
        F: FnMut() -> bool,
    {
        for _ in 0..200 {
            if check() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn test_delivers_and_acks_queued_messages() {
        let queue = Arc::new(MemoryQueue::new());
        let delivery = Arc::new(MockDelivery::new());

        queue.publish(&message("a@example.com")).await.unwrap();
        queue.publish(&message("b@example.com")).await.unwrap();

        let worker = NotifyWorker::new(queue.clone(), delivery.clone(), fast_config());
        let handle = worker.start();

        wait_for(|| delivery.sent_count() == 2).await;
        wait_for(|| queue.delivered().len() == 2).await;

        let sent = delivery.sent();
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[1].to, "b@example.com");

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_then_delivered() {
        let queue = Arc::new(MemoryQueue::new());
        let delivery = Arc::new(MockDelivery::failing_first(2));

        queue.publish(&message("retry@example.com")).await.unwrap();

        let worker = NotifyWorker::new(queue.clone(), delivery.clone(), fast_config());
        let mut events = worker.event_tx.subscribe();
        let handle = worker.start();

        wait_for(|| queue.delivered().len() == 1).await;

        // Two failed attempts plus the successful one.
        assert_eq!(delivery.sent_count(), 1);
        let delivered = &queue.delivered()[0];
        assert_eq!(delivered.attempts, 2);

        let mut retries = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, WorkerEvent::MessageRetried { .. }) {
                retries += 1;
            }
        }
        assert_eq!(retries, 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_attempts_move_message_to_dead_letter() {
        let queue = Arc::new(MemoryQueue::new().with_max_attempts(3));
        let delivery = Arc::new(MockDelivery::failing_first(100));

        queue.publish(&message("dead@example.com")).await.unwrap();

        let worker = NotifyWorker::new(queue.clone(), delivery.clone(), fast_config());
        let handle = worker.start();

        wait_for(|| queue.dead().len() == 1).await;

        let dead = &queue.dead()[0];
        assert_eq!(dead.attempts, 3);
        assert!(dead.last_error.is_some());
        assert!(queue.delivered().is_empty());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_worker_leaves_queue_untouched() {
        let queue = Arc::new(MemoryQueue::new());
        let delivery = Arc::new(MockDelivery::new());

        queue.publish(&message("idle@example.com")).await.unwrap();

        let config = fast_config().with_enabled(false);
        let worker = NotifyWorker::new(queue.clone(), delivery.clone(), config);
        let _handle = worker.start();

        sleep(Duration::from_millis(100)).await;
        assert_eq!(delivery.sent_count(), 0);
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let queue = Arc::new(MemoryQueue::new());
        let delivery = Arc::new(MockDelivery::new());

        let worker = NotifyWorker::new(queue.clone(), delivery, fast_config());
        let handle = worker.start();
        let mut events = handle.events();

        handle.shutdown().await.unwrap();

        wait_for(|| matches!(events.try_recv(), Ok(WorkerEvent::WorkerStopped))).await;
    }
}
