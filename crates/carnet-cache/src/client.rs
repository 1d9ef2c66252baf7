//! Fail-safe Redis client.
//!
//! The cache is a pure performance layer: every backend failure (connect
//! refused, timeout, protocol error, serde) is caught here and converted to
//! a miss or a no-op, never an error. The system must stay correct, if
//! slower, with Redis entirely absent.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_ENABLED`: Set to "false" to disable caching (default: true)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)
//!
//! ## Connection lifecycle
//!
//! The connection is a process-scoped singleton established lazily on first
//! use and shared by clone. `ConnectionManager` redials dropped connections
//! itself with capped exponential backoff; if even the initial dial fails,
//! the slot stays empty and the next call retries it.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Minimum wait between dial attempts when the backend is unreachable.
/// `ConnectionManager` only backs off on reconnects after a successful
/// first dial; this covers the cold-start case so a blackholed backend
/// cannot add a connect timeout to every request.
const DIAL_COOLDOWN: Duration = Duration::from_secs(5);

/// Shared, cloneable cache client.
#[derive(Clone)]
pub struct CacheClient {
    inner: Arc<CacheClientInner>,
}

#[derive(Default)]
struct ConnectionSlot {
    /// Lazily established connection manager (None until first use, or
    /// when disabled / unreachable).
    manager: Option<ConnectionManager>,
    /// Set after a failed dial; no redial happens before this instant.
    retry_at: Option<Instant>,
}

struct CacheClientInner {
    connection: RwLock<ConnectionSlot>,
    /// Redis URL; None means the client is permanently disabled.
    url: Option<String>,
}

impl CacheClient {
    /// Create a client from environment configuration. Does not connect;
    /// the first cache call does.
    pub fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        if enabled {
            Self::new(&url)
        } else {
            info!(
                subsystem = "cache",
                component = "client",
                "Cache disabled via REDIS_ENABLED=false"
            );
            Self::disabled()
        }
    }

    /// Create a client for a specific Redis URL.
    pub fn new(url: &str) -> Self {
        Self {
            inner: Arc::new(CacheClientInner {
                connection: RwLock::new(ConnectionSlot::default()),
                url: Some(url.to_string()),
            }),
        }
    }

    /// Create a permanently disabled client: every get is a miss, every
    /// write a no-op. Used in tests and in deployments without Redis.
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(CacheClientInner {
                connection: RwLock::new(ConnectionSlot::default()),
                url: None,
            }),
        }
    }

    /// Whether this client can ever connect.
    pub fn is_enabled(&self) -> bool {
        self.inner.url.is_some()
    }

    /// Whether a live connection currently exists.
    pub async fn is_connected(&self) -> bool {
        self.inner.connection.read().await.manager.is_some()
    }

    /// Get the shared connection, dialing it on first use. A failed dial
    /// starts a short cooldown during which calls miss without redialing.
    async fn conn(&self) -> Option<ConnectionManager> {
        {
            let slot = self.inner.connection.read().await;
            if let Some(conn) = slot.manager.as_ref() {
                return Some(conn.clone());
            }
            if slot.retry_at.is_some_and(|at| Instant::now() < at) {
                return None;
            }
        }

        let url = self.inner.url.as_deref()?;

        let mut guard = self.inner.connection.write().await;
        // Another caller may have connected (or failed) while we waited
        // for the lock.
        if let Some(conn) = guard.manager.as_ref() {
            return Some(conn.clone());
        }
        if guard.retry_at.is_some_and(|at| Instant::now() < at) {
            return None;
        }

        match redis::Client::open(url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    info!(
                        subsystem = "cache",
                        component = "client",
                        op = "connect",
                        "Cache connected"
                    );
                    guard.manager = Some(conn.clone());
                    guard.retry_at = None;
                    Some(conn)
                }
                Err(e) => {
                    warn!(
                        subsystem = "cache",
                        component = "client",
                        error = %e,
                        "Cache unreachable, continuing without it"
                    );
                    guard.retry_at = Some(Instant::now() + DIAL_COOLDOWN);
                    None
                }
            },
            Err(e) => {
                warn!(
                    subsystem = "cache",
                    component = "client",
                    error = %e,
                    "Invalid Redis URL, cache disabled"
                );
                guard.retry_at = Some(Instant::now() + DIAL_COOLDOWN);
                None
            }
        }
    }

    /// Get a cached value. Any failure is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn().await?;

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(value) => {
                    debug!(subsystem = "cache", cache_key = key, "Cache HIT");
                    Some(value)
                }
                Err(e) => {
                    warn!(
                        subsystem = "cache",
                        cache_key = key,
                        error = %e,
                        "Cache deserialization error"
                    );
                    None
                }
            },
            Ok(None) => {
                debug!(subsystem = "cache", cache_key = key, "Cache MISS");
                None
            }
            Err(e) => {
                error!(subsystem = "cache", cache_key = key, error = %e, "Redis GET error");
                None
            }
        }
    }

    /// Store a value with a TTL in seconds. Any failure is a no-op.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };

        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                error!(subsystem = "cache", cache_key = key, error = %e, "Cache serialization error");
                return false;
            }
        };

        match conn.set_ex::<_, _, ()>(key, serialized, ttl_secs).await {
            Ok(_) => {
                debug!(
                    subsystem = "cache",
                    cache_key = key,
                    ttl_secs,
                    "Cache SET"
                );
                true
            }
            Err(e) => {
                error!(subsystem = "cache", cache_key = key, error = %e, "Redis SET error");
                false
            }
        }
    }

    /// Delete a single key.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };

        match conn.del::<_, ()>(key).await {
            Ok(_) => {
                debug!(subsystem = "cache", cache_key = key, "Cache DEL");
                true
            }
            Err(e) => {
                error!(subsystem = "cache", cache_key = key, error = %e, "Redis DEL error");
                false
            }
        }
    }

    /// Delete every key sharing a prefix. Deleting a prefix with no keys
    /// behind it succeeds as a no-op.
    pub async fn delete_prefix(&self, prefix: &str) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };

        let pattern = format!("{prefix}*");

        match redis::cmd("KEYS")
            .arg(&pattern)
            .query_async::<Vec<String>>(&mut conn)
            .await
        {
            Ok(keys) if !keys.is_empty() => match conn.del::<_, ()>(&keys[..]).await {
                Ok(_) => {
                    debug!(
                        subsystem = "cache",
                        prefix,
                        removed = keys.len(),
                        "Cache prefix invalidation"
                    );
                    true
                }
                Err(e) => {
                    error!(subsystem = "cache", prefix, error = %e, "Redis DEL error");
                    false
                }
            },
            Ok(_) => {
                debug!(subsystem = "cache", prefix, "Cache prefix invalidation: no keys");
                true
            }
            Err(e) => {
                error!(subsystem = "cache", prefix, error = %e, "Redis KEYS error");
                false
            }
        }
    }

    /// Clear the whole cache.
    pub async fn flush_all(&self) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };

        match redis::cmd("FLUSHALL").query_async::<()>(&mut conn).await {
            Ok(_) => {
                info!(subsystem = "cache", op = "flush_all", "Cache flushed");
                true
            }
            Err(e) => {
                error!(subsystem = "cache", error = %e, "Redis FLUSHALL error");
                false
            }
        }
    }

    /// Drop the shared connection. Later calls re-establish it.
    pub async fn close(&self) {
        let mut guard = self.inner.connection.write().await;
        guard.retry_at = None;
        if guard.manager.take().is_some() {
            info!(subsystem = "cache", component = "client", op = "close", "Cache connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_client_misses() {
        let client = CacheClient::disabled();
        assert!(!client.is_enabled());

        let value: Option<String> = client.get("notes:any:all").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_disabled_client_writes_are_noops() {
        let client = CacheClient::disabled();
        assert!(!client.set("k", &"v", 60).await);
        assert!(!client.delete("k").await);
        assert!(!client.delete_prefix("notes:").await);
        assert!(!client.flush_all().await);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_miss_not_an_error() {
        // Nothing listens on this port; every call must degrade silently.
        let client = CacheClient::new("redis://127.0.0.1:1");
        let value: Option<String> = client.get("notes:any:all").await;
        assert!(value.is_none());
        assert!(!client.set("k", &"v", 60).await);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_failed_dial_starts_cooldown() {
        let client = CacheClient::new("redis://127.0.0.1:1");
        assert!(client.get::<String>("k").await.is_none());

        // The failed dial is remembered; calls inside the cooldown miss
        // without attempting another connect.
        {
            let slot = client.inner.connection.read().await;
            assert!(slot.manager.is_none());
            assert!(slot.retry_at.is_some_and(|at| at > Instant::now()));
        }
        assert!(client.get::<String>("k").await.is_none());
        assert!(!client.is_connected().await);

        // An expired cooldown permits a redial.
        {
            let mut slot = client.inner.connection.write().await;
            slot.retry_at = Some(Instant::now());
        }
        assert!(client.get::<String>("k").await.is_none());
        let slot = client.inner.connection.read().await;
        assert!(slot.retry_at.is_some_and(|at| at > Instant::now()));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let client = CacheClient::disabled();
        client.close().await;
        client.close().await;
    }
}
