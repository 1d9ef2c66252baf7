//! Error types for carnet.

use thiserror::Error;

/// Result type alias using carnet's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for carnet operations.
///
/// The taxonomy deliberately separates "must surface" failures (database,
/// ownership misses, invalid input) from "safe to swallow" ones. `Cache`,
/// `Queue`, and `Delivery` exist for the internals of those layers; their
/// public surfaces convert them to a miss, a `false`, or a negative
/// acknowledgment before a caller ever sees them.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found or not owned by the caller
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Label not found or not owned by the caller
    #[error("Label not found: {0}")]
    LabelNotFound(uuid::Uuid),

    /// Cache backend failure (never propagated past the cache layer)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Notification queue failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// Email delivery failure
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_note_not_found() {
        let id = Uuid::nil();
        let err = Error::NoteNotFound(id);
        assert_eq!(err.to_string(), format!("Note not found: {}", id));
    }

    #[test]
    fn test_error_display_label_not_found() {
        let id = Uuid::new_v4();
        let err = Error::LabelNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_cache() {
        let err = Error::Cache("connection refused".to_string());
        assert_eq!(err.to_string(), "Cache error: connection refused");
    }

    #[test]
    fn test_error_display_queue() {
        let err = Error::Queue("insert failed".to_string());
        assert_eq!(err.to_string(), "Queue error: insert failed");
    }

    #[test]
    fn test_error_display_delivery() {
        let err = Error::Delivery("relay returned 502".to_string());
        assert_eq!(err.to_string(), "Delivery error: relay returned 502");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty label name".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty label name");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing DATABASE_URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing DATABASE_URL");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
