//! Durable notification queue implementation.
//!
//! Messages are rows in `email_notification`: published as `pending`,
//! claimed into `delivering` with `FOR UPDATE SKIP LOCKED`, and either
//! acknowledged (`delivered`) or negative-acknowledged back to `pending`
//! for redelivery. A message that exhausts its attempt budget parks as
//! `dead` instead of looping forever. Rows survive process and database
//! restarts until acknowledged, which is what gives the pipeline its
//! at-least-once guarantee.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use carnet_core::{
    defaults, new_v7, Error, MessageStatus, NotificationMessage, NotificationQueue, QueueStats,
    QueuedMessage, Result,
};

/// PostgreSQL implementation of NotificationQueue.
#[derive(Clone)]
pub struct PgNotificationQueue {
    pool: Pool<Postgres>,
    max_attempts: i32,
}

impl PgNotificationQueue {
    /// Create a queue handle with the default attempt budget.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            max_attempts: defaults::NOTIFY_MAX_ATTEMPTS,
        }
    }

    /// Override the attempt budget applied to newly published messages.
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn parse_message_row(row: sqlx::postgres::PgRow) -> Result<QueuedMessage> {
        let payload: serde_json::Value = row.get("payload");
        let message: NotificationMessage = serde_json::from_value(payload)?;
        let status: String = row.get("status");

        Ok(QueuedMessage {
            id: row.get("id"),
            message,
            status: status
                .parse::<MessageStatus>()
                .map_err(Error::Serialization)?,
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            last_error: row.get("last_error"),
            created_at: row.get("created_at"),
            claimed_at: row.get("claimed_at"),
        })
    }
}

#[async_trait]
impl NotificationQueue for PgNotificationQueue {
    async fn publish(&self, message: &NotificationMessage) -> Result<Uuid> {
        let id = new_v7();
        let payload = serde_json::to_value(message)?;

        sqlx::query(
            "INSERT INTO email_notification (id, payload, status, max_attempts, created_at)
             VALUES ($1, $2, 'pending', $3, $4)",
        )
        .bind(id)
        .bind(&payload)
        .bind(self.max_attempts)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<QueuedMessage>> {
        // SKIP LOCKED keeps concurrent worker instances from claiming the
        // same row; the broker-side distribution the original design
        // delegated to the queue server happens here instead.
        let row = sqlx::query(
            "UPDATE email_notification
             SET status = 'delivering', claimed_at = $1
             WHERE id = (
                 SELECT id FROM email_notification
                 WHERE status = 'pending'
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, payload, status, attempts, max_attempts, last_error,
                       created_at, claimed_at",
        )
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_message_row).transpose()
    }

    async fn ack(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE email_notification
             SET status = 'delivered', delivered_at = $2
             WHERE id = $1 AND status = 'delivering'",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Queue(format!(
                "ack for message {id} not in delivering state"
            )));
        }
        Ok(())
    }

    async fn nack(&self, id: Uuid, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE email_notification
             SET attempts = attempts + 1,
                 last_error = $2,
                 claimed_at = NULL,
                 status = CASE
                     WHEN attempts + 1 >= max_attempts THEN 'dead'
                     ELSE 'pending'
                 END
             WHERE id = $1 AND status = 'delivering'",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Queue(format!(
                "nack for message {id} not in delivering state"
            )));
        }
        Ok(())
    }

    async fn requeue_stuck(&self, older_than: Duration) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_default();

        let result = sqlx::query(
            "UPDATE email_notification
             SET status = 'pending', claimed_at = NULL
             WHERE status = 'delivering' AND claimed_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM email_notification WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(count.0)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM email_notification GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut stats = QueueStats::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            match status.as_str() {
                "pending" => stats.pending = n,
                "delivering" => stats.delivering = n,
                "delivered" => stats.delivered = n,
                "dead" => stats.dead = n,
                _ => {}
            }
        }
        Ok(stats)
    }
}
