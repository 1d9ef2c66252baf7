//! Notification producer: durably publishes collaboration-invite events.
//!
//! The producer never blocks or fails its caller. Publishing returns `true`
//! when the message is durably queued and `false` on any failure; the
//! share flow treats `false` as "best effort only" and the user-facing
//! request succeeds either way.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use carnet_core::{NotificationMessage, NotificationQueue};

/// Producer handle over the durable queue. Cheap to clone; the queue
/// connection behind it is the process-wide shared one.
#[derive(Clone)]
pub struct NotificationProducer {
    queue: Arc<dyn NotificationQueue>,
}

impl NotificationProducer {
    /// Create a producer over the given queue.
    pub fn new(queue: Arc<dyn NotificationQueue>) -> Self {
        Self { queue }
    }

    /// Publish a collaboration-invite email, stamping the timestamp.
    ///
    /// Returns whether the message was durably queued. Failures are logged
    /// here and swallowed; they are never the caller's problem.
    pub async fn publish(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        note_id: Uuid,
        shared_by: &str,
    ) -> bool {
        let message = NotificationMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            note_id,
            shared_by: shared_by.to_string(),
            timestamp: Utc::now(),
        };

        self.publish_message(&message).await
    }

    /// Publish a pre-built message. Same fail-safe contract as `publish`.
    pub async fn publish_message(&self, message: &NotificationMessage) -> bool {
        match self.queue.publish(message).await {
            Ok(id) => {
                info!(
                    subsystem = "notify",
                    component = "producer",
                    message_id = %id,
                    to = %message.to,
                    note_id = %message.note_id,
                    "Email notification queued"
                );
                true
            }
            Err(e) => {
                warn!(
                    subsystem = "notify",
                    component = "producer",
                    to = %message.to,
                    error = %e,
                    "Failed to queue email notification, dropping best-effort"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryQueue;

    #[tokio::test]
    async fn test_publish_stamps_timestamp_and_queues() {
        let queue = Arc::new(MemoryQueue::new());
        let producer = NotificationProducer::new(queue.clone());

        let before = Utc::now();
        let queued = producer
            .publish(
                "friend@example.com",
                "Note shared with you",
                "body",
                Uuid::now_v7(),
                "owner@example.com",
            )
            .await;
        assert!(queued);

        let claimed = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.message.to, "friend@example.com");
        assert!(claimed.message.timestamp >= before);
        assert!(claimed.message.timestamp <= Utc::now());
    }

    #[tokio::test]
    async fn test_publish_failure_returns_false_not_error() {
        let queue = Arc::new(MemoryQueue::new().with_publish_failures());
        let producer = NotificationProducer::new(queue);

        let queued = producer
            .publish("a@b.c", "s", "b", Uuid::now_v7(), "x@y.z")
            .await;
        assert!(!queued);
    }
}
