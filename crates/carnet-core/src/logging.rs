//! Structured logging schema and field name constants for carnet.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied (cache miss-through, publish dropped) |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, cache hit/miss, intermediate values |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "cache", "db", "notify", "service"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "client", "views", "producer", "worker", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "get", "set", "invalidate_owner", "publish", "claim_next"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Owner UUID whose data is being operated on.
pub const OWNER_ID: &str = "owner_id";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Queued notification message UUID.
pub const MESSAGE_ID: &str = "message_id";

/// Cache key affected by an operation.
pub const CACHE_KEY: &str = "cache_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a view or search query.
pub const RESULT_COUNT: &str = "result_count";

/// Delivery attempt number for a notification message.
pub const ATTEMPT: &str = "attempt";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
