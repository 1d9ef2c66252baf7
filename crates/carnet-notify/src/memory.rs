//! In-memory notification queue for deterministic testing.
//!
//! Implements the same claim/ack/nack discipline as the Postgres queue so
//! the worker's acknowledgment behavior, redelivery, and dead-letter paths
//! can run without infrastructure. "Durability" here is process-lifetime
//! only; this double exists for tests and local experiments.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use carnet_core::{
    defaults, new_v7, Error, MessageStatus, NotificationMessage, NotificationQueue, QueueStats,
    QueuedMessage, Result,
};

#[derive(Default)]
struct MemoryQueueInner {
    pending: VecDeque<QueuedMessage>,
    delivering: HashMap<Uuid, QueuedMessage>,
    delivered: Vec<QueuedMessage>,
    dead: Vec<QueuedMessage>,
}

/// In-memory implementation of NotificationQueue.
pub struct MemoryQueue {
    inner: Mutex<MemoryQueueInner>,
    max_attempts: i32,
    fail_publish: bool,
}

impl MemoryQueue {
    /// Create an empty queue with the default attempt budget.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryQueueInner::default()),
            max_attempts: defaults::NOTIFY_MAX_ATTEMPTS,
            fail_publish: false,
        }
    }

    /// Override the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Make every publish fail, for exercising the producer's fail-safe
    /// contract.
    pub fn with_publish_failures(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    /// Messages acknowledged so far, in ack order.
    pub fn delivered(&self) -> Vec<QueuedMessage> {
        self.inner.lock().unwrap().delivered.clone()
    }

    /// Messages parked in the dead-letter state.
    pub fn dead(&self) -> Vec<QueuedMessage> {
        self.inner.lock().unwrap().dead.clone()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationQueue for MemoryQueue {
    async fn publish(&self, message: &NotificationMessage) -> Result<Uuid> {
        if self.fail_publish {
            return Err(Error::Queue("publish disabled by test".to_string()));
        }

        let id = new_v7();
        self.inner.lock().unwrap().pending.push_back(QueuedMessage {
            id,
            message: message.clone(),
            status: MessageStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            last_error: None,
            created_at: Utc::now(),
            claimed_at: None,
        });
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<QueuedMessage>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(mut msg) = inner.pending.pop_front() else {
            return Ok(None);
        };
        msg.status = MessageStatus::Delivering;
        msg.claimed_at = Some(Utc::now());
        inner.delivering.insert(msg.id, msg.clone());
        Ok(Some(msg))
    }

    async fn ack(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let mut msg = inner
            .delivering
            .remove(&id)
            .ok_or_else(|| Error::Queue(format!("ack for message {id} not in delivering state")))?;
        msg.status = MessageStatus::Delivered;
        inner.delivered.push(msg);
        Ok(())
    }

    async fn nack(&self, id: Uuid, error: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let mut msg = inner
            .delivering
            .remove(&id)
            .ok_or_else(|| Error::Queue(format!("nack for message {id} not in delivering state")))?;

        msg.attempts += 1;
        msg.last_error = Some(error.to_string());
        msg.claimed_at = None;

        if msg.attempts >= msg.max_attempts {
            msg.status = MessageStatus::Dead;
            inner.dead.push(msg);
        } else {
            msg.status = MessageStatus::Pending;
            inner.pending.push_back(msg);
        }
        Ok(())
    }

    async fn requeue_stuck(&self, older_than: Duration) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_default();
        let mut inner = self.inner.lock().unwrap();

        let stuck: Vec<Uuid> = inner
            .delivering
            .values()
            .filter(|m| m.claimed_at.is_some_and(|t| t < cutoff))
            .map(|m| m.id)
            .collect();

        for id in &stuck {
            if let Some(mut msg) = inner.delivering.remove(id) {
                msg.status = MessageStatus::Pending;
                msg.claimed_at = None;
                inner.pending.push_back(msg);
            }
        }
        Ok(stuck.len() as u64)
    }

    async fn pending_count(&self) -> Result<i64> {
        Ok(self.inner.lock().unwrap().pending.len() as i64)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let inner = self.inner.lock().unwrap();
        Ok(QueueStats {
            pending: inner.pending.len() as i64,
            delivering: inner.delivering.len() as i64,
            delivered: inner.delivered.len() as i64,
            dead: inner.dead.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> NotificationMessage {
        NotificationMessage {
            to: "friend@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
            note_id: new_v7(),
            shared_by: "owner@example.com".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_claim_ack_cycle() {
        let queue = MemoryQueue::new();
        let id = queue.publish(&message()).await.unwrap();

        let claimed = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.status, MessageStatus::Delivering);

        queue.ack(id).await.unwrap();
        assert_eq!(queue.delivered().len(), 1);
        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nack_requeues_until_budget_exhausted() {
        let queue = MemoryQueue::new().with_max_attempts(2);
        let id = queue.publish(&message()).await.unwrap();

        queue.claim_next().await.unwrap().unwrap();
        queue.nack(id, "boom").await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 1);

        let redelivered = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(redelivered.attempts, 1);
        assert_eq!(redelivered.last_error.as_deref(), Some("boom"));

        queue.nack(id, "boom again").await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert_eq!(queue.dead().len(), 1);
    }

    #[tokio::test]
    async fn test_ack_requires_claim() {
        let queue = MemoryQueue::new();
        let id = queue.publish(&message()).await.unwrap();
        assert!(queue.ack(id).await.is_err());
    }

    #[tokio::test]
    async fn test_requeue_stuck_recovers_old_claims() {
        let queue = MemoryQueue::new();
        let id = queue.publish(&message()).await.unwrap();
        queue.claim_next().await.unwrap().unwrap();

        // Claimed just now: not stuck yet.
        assert_eq!(queue.requeue_stuck(Duration::from_secs(60)).await.unwrap(), 0);
        // Zero cutoff treats any claim as stuck.
        assert_eq!(queue.requeue_stuck(Duration::ZERO).await.unwrap(), 1);

        let reclaimed = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(reclaimed.id, id);
        // A crash-recovered message did not consume an attempt.
        assert_eq!(reclaimed.attempts, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let queue = MemoryQueue::new();
        queue.publish(&message()).await.unwrap();
        queue.publish(&message()).await.unwrap();
        let claimed = queue.claim_next().await.unwrap().unwrap();
        queue.ack(claimed.id).await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.delivering, 0);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dead, 0);
    }
}
