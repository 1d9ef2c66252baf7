//! Repository and queue trait definitions.
//!
//! These traits are the seams between the orchestration layer and the
//! Postgres implementations in `carnet-db`, and they let the notification
//! worker run against an in-memory queue in tests.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Label, Note, NotificationMessage, QueueStats, QueuedMessage};
use crate::views::View;

/// Note persistence. All operations are scoped by `owner_id`; a note that
/// exists but belongs to someone else behaves exactly like a missing note.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note with an already-resolved label id set.
    async fn insert(
        &self,
        owner_id: Uuid,
        title: &str,
        content: &str,
        label_ids: &[Uuid],
    ) -> Result<Uuid>;

    /// Fetch one note. `Error::NoteNotFound` if absent or foreign-owned.
    async fn get(&self, owner_id: Uuid, note_id: Uuid) -> Result<Note>;

    /// Partial update. `labels`, when present, replaces the full label set.
    /// Bumps `updated_at`.
    async fn update(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
        label_ids: Option<&[Uuid]>,
    ) -> Result<Note>;

    /// Set or clear the archived flag.
    async fn set_archived(&self, owner_id: Uuid, note_id: Uuid, archived: bool) -> Result<()>;

    /// Move to or restore from trash. Trashing also clears the pin.
    async fn set_trashed(&self, owner_id: Uuid, note_id: Uuid, trashed: bool) -> Result<()>;

    /// Pin or unpin.
    async fn set_pinned(&self, owner_id: Uuid, note_id: Uuid, pinned: bool) -> Result<()>;

    /// Permanently delete the note and its label links.
    async fn delete(&self, owner_id: Uuid, note_id: Uuid) -> Result<()>;

    /// Run the canonical query for a view: filter per variant, pinned
    /// first, most recently updated first, capped at `view.limit()`.
    async fn list_view(&self, owner_id: Uuid, view: &View) -> Result<Vec<Note>>;
}

/// Label persistence and idempotent name resolution.
#[async_trait]
pub trait LabelRepository: Send + Sync {
    /// Resolve raw names to label ids, creating missing labels.
    ///
    /// Names are normalized (trim + lowercase) before lookup. Output
    /// preserves input order and multiplicity. A concurrent create racing
    /// on the same `(owner, name)` resolves to the winning row instead of
    /// failing.
    async fn resolve(&self, owner_id: Uuid, names: &[String]) -> Result<Vec<Uuid>>;

    /// All labels for one owner, newest first.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Label>>;

    /// Fetch one label. `Error::LabelNotFound` if absent or foreign-owned.
    async fn get(&self, owner_id: Uuid, label_id: Uuid) -> Result<Label>;

    /// Rename a label (normalized). `Error::InvalidInput` when the new
    /// name collides with another of the owner's labels.
    async fn rename(&self, owner_id: Uuid, label_id: Uuid, name: &str) -> Result<Label>;

    /// Delete a label, detaching it from every note first.
    async fn delete(&self, owner_id: Uuid, label_id: Uuid) -> Result<()>;
}

/// Durable at-least-once notification queue.
///
/// A published message survives restarts until a consumer acknowledges it.
/// Claims are exclusive while held; a claim that is never acked or nacked
/// (crashed worker) becomes eligible again via [`requeue_stuck`].
///
/// [`requeue_stuck`]: NotificationQueue::requeue_stuck
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Durably enqueue a message; returns its queue id.
    async fn publish(&self, message: &NotificationMessage) -> Result<Uuid>;

    /// Atomically claim the oldest pending message, if any.
    async fn claim_next(&self) -> Result<Option<QueuedMessage>>;

    /// Acknowledge a successful delivery; the message is permanently done.
    async fn ack(&self, id: Uuid) -> Result<()>;

    /// Negative-acknowledge a failed delivery. The message returns to
    /// pending for redelivery, or moves to dead once its attempt budget is
    /// exhausted.
    async fn nack(&self, id: Uuid, error: &str) -> Result<()>;

    /// Return messages stuck in `delivering` longer than `older_than` to
    /// pending. Run at worker startup to recover from crashes.
    async fn requeue_stuck(&self, older_than: Duration) -> Result<u64>;

    /// Number of messages waiting to be claimed.
    async fn pending_count(&self) -> Result<i64>;

    /// Full per-status depth counters.
    async fn stats(&self) -> Result<QueueStats>;
}
