//! Label repository implementation with idempotent name resolution.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use carnet_core::{
    defaults, models::normalize_label, new_v7, Error, Label, LabelRepository, Result,
};

/// Validate a label name after normalization.
///
/// Rules:
/// - Not empty (a name that normalizes to "" was all whitespace)
/// - At most 100 characters
pub fn validate_label_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Label name cannot be empty".to_string());
    }
    if name.len() > defaults::LABEL_MAX_LEN {
        return Err(format!(
            "Label name must be {} characters or less",
            defaults::LABEL_MAX_LEN
        ));
    }
    Ok(())
}

/// PostgreSQL implementation of LabelRepository.
#[derive(Clone)]
pub struct PgLabelRepository {
    pool: Pool<Postgres>,
}

impl PgLabelRepository {
    /// Create a new PgLabelRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_label_row(row: sqlx::postgres::PgRow) -> Label {
        Label {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        }
    }

    /// Resolve one normalized name to its label id, creating it if absent.
    ///
    /// Two concurrent resolutions of the same new name can both observe
    /// "absent"; the `(owner_id, name)` constraint makes one insert lose,
    /// and the loser re-fetches the winning row instead of failing.
    async fn resolve_one(&self, owner_id: Uuid, name: &str) -> Result<Uuid> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM label WHERE owner_id = $1 AND name = $2")
                .bind(owner_id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let inserted: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO label (id, owner_id, name, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (owner_id, name) DO NOTHING
             RETURNING id",
        )
        .bind(new_v7())
        .bind(owner_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(id) = inserted {
            return Ok(id);
        }

        // Lost the race; the winner's row is committed by now.
        sqlx::query_scalar("SELECT id FROM label WHERE owner_id = $1 AND name = $2")
            .bind(owner_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| {
                Error::Internal(format!(
                    "label '{name}' vanished between conflicting insert and re-fetch"
                ))
            })
    }
}

#[async_trait]
impl LabelRepository for PgLabelRepository {
    async fn resolve(&self, owner_id: Uuid, names: &[String]) -> Result<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(names.len());

        for raw in names {
            let name = normalize_label(raw);
            validate_label_name(&name).map_err(Error::InvalidInput)?;
            // Repeated input names yield repeated ids; output order and
            // multiplicity mirror the input.
            ids.push(self.resolve_one(owner_id, &name).await?);
        }

        Ok(ids)
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<Label>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, created_at
             FROM label WHERE owner_id = $1
             ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_label_row).collect())
    }

    async fn get(&self, owner_id: Uuid, label_id: Uuid) -> Result<Label> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, created_at
             FROM label WHERE id = $1 AND owner_id = $2",
        )
        .bind(label_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_label_row)
            .ok_or(Error::LabelNotFound(label_id))
    }

    async fn rename(&self, owner_id: Uuid, label_id: Uuid, name: &str) -> Result<Label> {
        let name = normalize_label(name);
        validate_label_name(&name).map_err(Error::InvalidInput)?;

        let result = sqlx::query(
            "UPDATE label SET name = $3 WHERE id = $1 AND owner_id = $2",
        )
        .bind(label_id)
        .bind(owner_id)
        .bind(&name)
        .execute(&self.pool)
        .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => Err(Error::LabelNotFound(label_id)),
            Ok(_) => self.get(owner_id, label_id).await,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::InvalidInput(
                format!("Label name '{name}' already exists"),
            )),
            Err(e) => Err(Error::Database(e)),
        }
    }

    async fn delete(&self, owner_id: Uuid, label_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Detach from all notes first, then drop the label itself.
        sqlx::query(
            "DELETE FROM note_label
             WHERE label_id = $1
               AND EXISTS (SELECT 1 FROM label WHERE id = $1 AND owner_id = $2)",
        )
        .bind(label_id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM label WHERE id = $1 AND owner_id = $2")
            .bind(label_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::LabelNotFound(label_id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_label_name_ok() {
        assert!(validate_label_name("todos").is_ok());
        assert!(validate_label_name("work-2026").is_ok());
    }

    #[test]
    fn test_validate_label_name_empty() {
        assert!(validate_label_name("").is_err());
    }

    #[test]
    fn test_validate_label_name_too_long() {
        let long = "a".repeat(defaults::LABEL_MAX_LEN + 1);
        assert!(validate_label_name(&long).is_err());
    }
}
