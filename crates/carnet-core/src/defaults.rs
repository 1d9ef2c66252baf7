//! Centralized default constants for the carnet system.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// CACHE
// =============================================================================

/// Key namespace for cached note views. Every key for one owner shares the
/// prefix `notes:<owner_id>:`, which is what per-owner bulk invalidation
/// deletes against.
pub const CACHE_NAMESPACE: &str = "notes";

/// TTL in seconds for cached listing views (active, archived, trash,
/// pinned, by-label).
pub const VIEW_TTL_SECS: u64 = 3600;

/// TTL in seconds for cached full-text search views. Shorter than listing
/// views because query result sets churn faster.
pub const SEARCH_TTL_SECS: u64 = 1800;

// =============================================================================
// VIEW QUERIES
// =============================================================================

/// Result cap for listing views.
pub const VIEW_LIMIT: i64 = 20;

/// Result cap for search views.
pub const SEARCH_LIMIT: i64 = 50;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Name of the durable email notification queue.
pub const NOTIFY_QUEUE: &str = "email_notifications";

/// Maximum delivery attempts before a message is dead-lettered.
pub const NOTIFY_MAX_ATTEMPTS: i32 = 5;

/// Polling interval for the notification worker when the queue is empty
/// (milliseconds).
pub const NOTIFY_POLL_INTERVAL_MS: u64 = 500;

/// Age after which a message stuck in `delivering` (worker crashed between
/// claim and ack) is returned to `pending` for redelivery.
pub const NOTIFY_STUCK_AFTER_SECS: u64 = 300;

/// Capacity of the worker event broadcast channel.
pub const WORKER_EVENT_CAPACITY: usize = 256;

// =============================================================================
// LABELS
// =============================================================================

/// Maximum length of a label name after normalization.
pub const LABEL_MAX_LEN: usize = 100;
