//! Note orchestration: cache-aside reads, invalidate-on-write, sharing.
//!
//! Every view read goes cache first, database on miss, repopulate before
//! returning. Every mutation invalidates the owner's whole cached view
//! set before the call returns, so a subsequent read can never observe a
//! pre-mutation snapshot past its own request boundary.

use tracing::{debug, warn};
use uuid::Uuid;

use carnet_cache::ViewCache;
use carnet_core::{
    CreateNoteRequest, Label, LabelRepository, Note, NoteRepository, Result, ShareOutcome,
    UpdateNoteRequest, View,
};
use carnet_db::Database;
use carnet_notify::NotificationProducer;

/// Orchestration layer over notes, labels, cached views, and share
/// notifications.
#[derive(Clone)]
pub struct NoteService {
    db: Database,
    views: ViewCache,
    producer: NotificationProducer,
}

impl NoteService {
    /// Create a new note service.
    pub fn new(db: Database, views: ViewCache, producer: NotificationProducer) -> Self {
        Self {
            db,
            views,
            producer,
        }
    }

    // -------------------------------------------------------------------
    // Mutations. Each one invalidates the owner's cached views before
    // returning; correctness never depends on the invalidation reaching
    // the cache (it is a fail-safe no-op when it does not).
    // -------------------------------------------------------------------

    /// Create a note, resolving raw label names to ids first.
    pub async fn create_note(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        let label_ids = self.db.labels.resolve(owner_id, &req.labels).await?;
        let note_id = self
            .db
            .notes
            .insert(owner_id, &req.title, &req.content, &label_ids)
            .await?;
        self.invalidate(owner_id).await;
        self.db.notes.get(owner_id, note_id).await
    }

    /// Partially update a note. A present `labels` list replaces the
    /// note's full label set.
    pub async fn update_note(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        req: UpdateNoteRequest,
    ) -> Result<Note> {
        let label_ids = match &req.labels {
            Some(names) => Some(self.db.labels.resolve(owner_id, names).await?),
            None => None,
        };
        let note = self
            .db
            .notes
            .update(
                owner_id,
                note_id,
                req.title.as_deref(),
                req.content.as_deref(),
                label_ids.as_deref(),
            )
            .await?;
        self.invalidate(owner_id).await;
        Ok(note)
    }

    /// Archive or unarchive a note.
    pub async fn set_archived(&self, owner_id: Uuid, note_id: Uuid, archived: bool) -> Result<()> {
        self.db.notes.set_archived(owner_id, note_id, archived).await?;
        self.invalidate(owner_id).await;
        Ok(())
    }

    /// Trash or restore a note. Trashing also unpins it.
    pub async fn set_trashed(&self, owner_id: Uuid, note_id: Uuid, trashed: bool) -> Result<()> {
        self.db.notes.set_trashed(owner_id, note_id, trashed).await?;
        self.invalidate(owner_id).await;
        Ok(())
    }

    /// Pin or unpin a note.
    pub async fn set_pinned(&self, owner_id: Uuid, note_id: Uuid, pinned: bool) -> Result<()> {
        self.db.notes.set_pinned(owner_id, note_id, pinned).await?;
        self.invalidate(owner_id).await;
        Ok(())
    }

    /// Permanently delete a note.
    pub async fn delete_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<()> {
        self.db.notes.delete(owner_id, note_id).await?;
        self.invalidate(owner_id).await;
        Ok(())
    }

    /// Fetch one note directly (uncached).
    pub async fn get_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<Note> {
        self.db.notes.get(owner_id, note_id).await
    }

    // -------------------------------------------------------------------
    // Views (cache-aside).
    // -------------------------------------------------------------------

    /// All non-trashed notes, pinned first.
    pub async fn active_notes(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        self.view_notes(owner_id, View::Active).await
    }

    /// Archived notes.
    pub async fn archived_notes(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        self.view_notes(owner_id, View::Archived).await
    }

    /// Trashed notes.
    pub async fn trashed_notes(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        self.view_notes(owner_id, View::Trashed).await
    }

    /// Pinned, non-archived, non-trashed notes.
    pub async fn pinned_notes(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        self.view_notes(owner_id, View::Pinned).await
    }

    /// Non-trashed notes carrying a specific label.
    pub async fn notes_with_label(&self, owner_id: Uuid, label_id: Uuid) -> Result<Vec<Note>> {
        self.view_notes(owner_id, View::ByLabel(label_id)).await
    }

    /// Case-insensitive substring search over titles and contents.
    /// A blank query matches nothing.
    pub async fn search_notes(&self, owner_id: Uuid, query: &str) -> Result<Vec<Note>> {
        let view = View::search(query);
        if matches!(&view, View::Search(q) if q.is_empty()) {
            return Ok(Vec::new());
        }
        self.view_notes(owner_id, view).await
    }

    async fn view_notes(&self, owner_id: Uuid, view: View) -> Result<Vec<Note>> {
        if let Some(notes) = self.views.get::<Vec<Note>>(owner_id, &view).await {
            debug!(owner_id = %owner_id, view = view.name(), "View cache hit");
            return Ok(notes);
        }

        let notes = self.db.notes.list_view(owner_id, &view).await?;
        self.views.store(owner_id, &view, &notes).await;
        debug!(
            owner_id = %owner_id,
            view = view.name(),
            count = notes.len(),
            "View cache miss, repopulated"
        );
        Ok(notes)
    }

    // -------------------------------------------------------------------
    // Labels.
    // -------------------------------------------------------------------

    /// All labels for one owner, newest first.
    pub async fn labels(&self, owner_id: Uuid) -> Result<Vec<Label>> {
        self.db.labels.list(owner_id).await
    }

    /// Rename a label. Invalidates views because label listings embed
    /// label ids whose meaning just changed for readers resolving names.
    pub async fn rename_label(&self, owner_id: Uuid, label_id: Uuid, name: &str) -> Result<Label> {
        let label = self.db.labels.rename(owner_id, label_id, name).await?;
        self.invalidate(owner_id).await;
        Ok(label)
    }

    /// Delete a label, detaching it from every note.
    pub async fn delete_label(&self, owner_id: Uuid, label_id: Uuid) -> Result<()> {
        self.db.labels.delete(owner_id, label_id).await?;
        self.invalidate(owner_id).await;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Sharing.
    // -------------------------------------------------------------------

    /// Share a note with a recipient by email, with an optional personal
    /// message folded into the invite body.
    ///
    /// Ownership is verified first: sharing a missing or foreign note is
    /// a user-visible `NoteNotFound`. The notification itself is best
    /// effort; `ShareOutcome::queued` reports whether the email was
    /// durably queued, and the share succeeds either way.
    pub async fn share_note(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        recipient: &str,
        shared_by: &str,
        message: Option<&str>,
    ) -> Result<ShareOutcome> {
        let note = self.db.notes.get(owner_id, note_id).await?;

        let subject = format!("Note shared with you: {}", note.title);
        let personal = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|m| format!("\n\nMessage from {shared_by}: {m}"))
            .unwrap_or_default();
        let body = format!(
            "{shared_by} shared the note \"{}\" with you.{personal}\n\n{}",
            note.title, note.content
        );

        let queued = self
            .producer
            .publish(recipient, &subject, &body, note_id, shared_by)
            .await;

        Ok(ShareOutcome {
            note_id,
            recipient: recipient.to_string(),
            queued,
        })
    }

    /// Drop every cached view for one owner. Runs synchronously before
    /// the mutation's result is returned.
    async fn invalidate(&self, owner_id: Uuid) {
        if !self.views.invalidate_owner(owner_id).await && self.views.client().is_enabled() {
            warn!(owner_id = %owner_id, "View invalidation did not reach the cache");
        }
    }
}
