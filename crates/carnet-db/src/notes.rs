//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use carnet_core::{new_v7, Error, Note, NoteRepository, Result, View};

use crate::escape_like;

/// Columns selected for every note read, with the label id set aggregated
/// in a single query to avoid per-row label lookups.
const NOTE_SELECT: &str = r#"
    SELECT n.id, n.owner_id, n.title, n.content,
           n.is_archived, n.is_trashed, n.is_pinned,
           n.created_at, n.updated_at,
           COALESCE(
               array_agg(nl.label_id) FILTER (WHERE nl.label_id IS NOT NULL),
               '{}'
           ) AS labels
    FROM note n
    LEFT JOIN note_label nl ON nl.note_id = n.id
"#;

/// Build the WHERE fragment for a view. The owner filter is always `$1`;
/// views with a parameter bind it as `$2`.
fn view_filter_clause(view: &View) -> &'static str {
    match view {
        View::Active => "AND n.is_trashed = FALSE",
        View::Archived => "AND n.is_archived = TRUE AND n.is_trashed = FALSE",
        View::Trashed => "AND n.is_trashed = TRUE",
        View::Pinned => {
            "AND n.is_pinned = TRUE AND n.is_archived = FALSE AND n.is_trashed = FALSE"
        }
        View::ByLabel(_) => {
            "AND n.is_trashed = FALSE AND EXISTS (
                 SELECT 1 FROM note_label x
                 WHERE x.note_id = n.id AND x.label_id = $2
             )"
        }
        View::Search(_) => {
            "AND n.is_trashed = FALSE
             AND (n.title ILIKE $2 ESCAPE '\\' OR n.content ILIKE $2 ESCAPE '\\')"
        }
    }
}

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_note_row(row: sqlx::postgres::PgRow) -> Note {
        Note {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            content: row.get("content"),
            is_archived: row.get("is_archived"),
            is_trashed: row.get("is_trashed"),
            is_pinned: row.get("is_pinned"),
            labels: row.get("labels"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Replace the full label set of a note inside an open transaction.
    async fn replace_labels(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        note_id: Uuid,
        label_ids: &[Uuid],
    ) -> Result<()> {
        sqlx::query("DELETE FROM note_label WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        for label_id in label_ids {
            // Repeated input labels collapse here; the note-label link is a set.
            sqlx::query(
                "INSERT INTO note_label (note_id, label_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(note_id)
            .bind(label_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }

        Ok(())
    }

    /// Flip a single boolean flag, verifying ownership via rows affected.
    async fn set_flag(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        set_clause: &str,
        value: bool,
    ) -> Result<()> {
        let query = format!(
            "UPDATE note SET {set_clause}, updated_at = $3
             WHERE id = $1 AND owner_id = $2"
        );
        let result = sqlx::query(&query)
            .bind(note_id)
            .bind(owner_id)
            .bind(Utc::now())
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(note_id));
        }
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(
        &self,
        owner_id: Uuid,
        title: &str,
        content: &str,
        label_ids: &[Uuid],
    ) -> Result<Uuid> {
        let note_id = new_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO note (id, owner_id, title, content, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(note_id)
        .bind(owner_id)
        .bind(title)
        .bind(content)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        Self::replace_labels(&mut tx, note_id, label_ids).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(note_id)
    }

    async fn get(&self, owner_id: Uuid, note_id: Uuid) -> Result<Note> {
        let query = format!("{NOTE_SELECT} WHERE n.id = $1 AND n.owner_id = $2 GROUP BY n.id");
        let row = sqlx::query(&query)
            .bind(note_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_note_row)
            .ok_or(Error::NoteNotFound(note_id))
    }

    async fn update(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
        label_ids: Option<&[Uuid]>,
    ) -> Result<Note> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let result = sqlx::query(
            "UPDATE note
             SET title = COALESCE($3, title),
                 content = COALESCE($4, content),
                 updated_at = $5
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(note_id)
        .bind(owner_id)
        .bind(title)
        .bind(content)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(note_id));
        }

        if let Some(label_ids) = label_ids {
            Self::replace_labels(&mut tx, note_id, label_ids).await?;
        }

        tx.commit().await.map_err(Error::Database)?;

        self.get(owner_id, note_id).await
    }

    async fn set_archived(&self, owner_id: Uuid, note_id: Uuid, archived: bool) -> Result<()> {
        self.set_flag(owner_id, note_id, "is_archived = $4", archived)
            .await
    }

    async fn set_trashed(&self, owner_id: Uuid, note_id: Uuid, trashed: bool) -> Result<()> {
        // Trashing drops the pin; restoring does not re-pin.
        let set_clause = if trashed {
            "is_trashed = $4, is_pinned = FALSE"
        } else {
            "is_trashed = $4"
        };
        self.set_flag(owner_id, note_id, set_clause, trashed).await
    }

    async fn set_pinned(&self, owner_id: Uuid, note_id: Uuid, pinned: bool) -> Result<()> {
        self.set_flag(owner_id, note_id, "is_pinned = $4", pinned)
            .await
    }

    async fn delete(&self, owner_id: Uuid, note_id: Uuid) -> Result<()> {
        // note_label rows cascade.
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND owner_id = $2")
            .bind(note_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(note_id));
        }
        Ok(())
    }

    async fn list_view(&self, owner_id: Uuid, view: &View) -> Result<Vec<Note>> {
        let query = format!(
            "{NOTE_SELECT}
             WHERE n.owner_id = $1 {filter}
             GROUP BY n.id
             ORDER BY n.is_pinned DESC, n.updated_at DESC
             LIMIT {limit}",
            filter = view_filter_clause(view),
            limit = view.limit(),
        );

        let mut q = sqlx::query(&query).bind(owner_id);
        q = match view {
            View::ByLabel(label_id) => q.bind(*label_id),
            View::Search(needle) => q.bind(format!("%{}%", escape_like(needle))),
            _ => q,
        };

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        Ok(rows.into_iter().map(Self::parse_note_row).collect())
    }
}
