//! # carnet-db
//!
//! PostgreSQL database layer for carnet.
//!
//! This crate provides:
//! - Connection pool management
//! - Note repository with the canonical view queries
//! - Label repository with idempotent, owner-scoped name resolution
//! - Durable email notification queue (at-least-once, explicit ack)
//!
//! ## Example
//!
//! ```rust,ignore
//! use carnet_db::Database;
//! use carnet_core::NoteRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/carnet").await?;
//!
//!     let owner = uuid::Uuid::now_v7();
//!     let note_id = db.notes.insert(owner, "groceries", "milk, eggs", &[]).await?;
//!
//!     println!("Created note: {}", note_id);
//!     Ok(())
//! }
//! ```

pub mod labels;
pub mod notes;
pub mod pool;
pub mod queue;

// Re-export core types
pub use carnet_core::*;

pub use labels::{validate_label_name, PgLabelRepository};
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use queue::PgNotificationQueue;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository for CRUD and view queries.
    pub notes: PgNoteRepository,
    /// Label repository for resolution and management.
    pub labels: PgLabelRepository,
    /// Durable email notification queue.
    pub queue: PgNotificationQueue,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            labels: PgLabelRepository::new(pool.clone()),
            queue: PgNotificationQueue::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create a new Database instance with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending schema migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
