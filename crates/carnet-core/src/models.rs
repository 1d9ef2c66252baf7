//! Core data models for carnet.
//!
//! These types are shared across all carnet crates and represent the core
//! domain entities: notes, labels, and the notification message format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note as returned from view queries and single-note reads.
///
/// Labels are carried by id; the stored normalized names can be fetched from
/// the label repository when a caller needs them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_archived: bool,
    pub is_trashed: bool,
    pub is_pinned: bool,
    #[serde(default)]
    pub labels: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new note.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    /// Raw label names; resolved (trim + lowercase, create-if-absent)
    /// before the note is written.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Partial update of a note's user-editable fields.
///
/// `None` fields are left untouched. Labels, when present, replace the
/// note's full label set.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub labels: Option<Vec<String>>,
}

// =============================================================================
// LABEL TYPES
// =============================================================================

/// A label scoped to one owner.
///
/// `name` is always stored normalized (trimmed, lower-cased); `(owner_id,
/// name)` is unique at the database level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Label {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Normalize a raw label name: trim surrounding whitespace and lowercase.
///
/// Names are never stored with original casing or whitespace; equality and
/// the uniqueness constraint both operate on this normalized form.
pub fn normalize_label(name: &str) -> String {
    name.trim().to_lowercase()
}

// =============================================================================
// NOTIFICATION TYPES
// =============================================================================

/// Payload of a collaboration-invite email, as serialized into the durable
/// queue. Once published it survives restarts until acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub note_id: Uuid,
    pub shared_by: String,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle status of a queued notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Waiting to be claimed by a worker.
    Pending,
    /// Claimed; delivery in progress.
    Delivering,
    /// Acknowledged after a successful delivery.
    Delivered,
    /// Exceeded the attempt budget; parked for operator inspection.
    Dead,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Delivering => "delivering",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Dead => "dead",
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MessageStatus::Pending),
            "delivering" => Ok(MessageStatus::Delivering),
            "delivered" => Ok(MessageStatus::Delivered),
            "dead" => Ok(MessageStatus::Dead),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

/// A message as claimed from the queue: payload plus delivery bookkeeping.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub message: NotificationMessage,
    pub status: MessageStatus,
    /// Completed delivery attempts so far (0 on first claim).
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

/// Outcome of a share request. The request itself succeeds either way;
/// `queued = false` means the invite email was dropped best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareOutcome {
    pub note_id: Uuid,
    pub recipient: String,
    pub queued: bool,
}

/// Queue depth counters for health reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub delivering: i64,
    pub delivered: i64,
    pub dead: i64,
}

// =============================================================================
// DELIVERY TYPES
// =============================================================================

/// Which transport produced a delivery receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Actual transport was attempted.
    Real,
    /// No credentials configured; content was logged and reported success.
    Mock,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Real => write!(f, "real"),
            DeliveryMode::Mock => write!(f, "mock"),
        }
    }
}

/// Receipt returned by a successful `EmailDelivery::send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub mode: DeliveryMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label_trims_and_lowercases() {
        assert_eq!(normalize_label("  TODOS  "), "todos");
        assert_eq!(normalize_label("Important"), "important");
        assert_eq!(normalize_label("work"), "work");
    }

    #[test]
    fn test_normalize_label_whitespace_only() {
        assert_eq!(normalize_label("   "), "");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_message_status_round_trip() {
        for status in [
            MessageStatus::Pending,
            MessageStatus::Delivering,
            MessageStatus::Delivered,
            MessageStatus::Dead,
        ] {
            let parsed: MessageStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_message_status_unknown() {
        assert!("exploded".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn test_notification_message_json_shape() {
        let msg = NotificationMessage {
            to: "friend@example.com".to_string(),
            subject: "Note shared with you".to_string(),
            body: "Check this out".to_string(),
            note_id: Uuid::nil(),
            shared_by: "owner@example.com".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["to"], "friend@example.com");
        assert_eq!(json["shared_by"], "owner@example.com");
        assert!(json["timestamp"].is_string());

        let back: NotificationMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_delivery_mode_display() {
        assert_eq!(DeliveryMode::Real.to_string(), "real");
        assert_eq!(DeliveryMode::Mock.to_string(), "mock");
    }

    #[test]
    fn test_create_note_request_default_labels() {
        let req: CreateNoteRequest = serde_json::from_str(
            r#"{"title": "t", "content": "c"}"#,
        )
        .unwrap();
        assert!(req.labels.is_empty());
    }
}
