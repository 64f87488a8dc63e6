//! Draft storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::model::{DraftId, DraftResponse, NewDraft, ResponseTone};
use crate::Result;
use crate::review::ReviewId;

/// Repository for draft storage and retrieval.
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS draft_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                review_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                tone TEXT NOT NULL,
                variant_number INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_drafts_review
            ON draft_responses(review_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace all drafts for a review with a new set.
    ///
    /// Delete-then-insert in one transaction: regeneration never merges
    /// with prior variants.
    ///
    /// # Errors
    ///
    /// Returns an error if the database transaction fails.
    pub async fn replace_for_review(
        &self,
        review: ReviewId,
        drafts: &[NewDraft],
    ) -> Result<Vec<DraftResponse>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM draft_responses WHERE review_id = ?")
            .bind(review.0)
            .execute(&mut *tx)
            .await?;

        for draft in drafts {
            sqlx::query(
                r"
                INSERT INTO draft_responses (review_id, content, tone, variant_number)
                VALUES (?, ?, ?, ?)
                ",
            )
            .bind(review.0)
            .bind(&draft.content)
            .bind(draft.tone.as_str())
            .bind(i64::from(draft.variant_number))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Stored {} drafts for review {review}", drafts.len());

        self.list_for_review(review).await
    }

    /// Get all drafts for a review, ordered by variant number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_review(&self, review: ReviewId) -> Result<Vec<DraftResponse>> {
        let rows = sqlx::query(
            "SELECT * FROM draft_responses WHERE review_id = ? ORDER BY variant_number ASC",
        )
        .bind(review.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_draft).collect())
    }

    /// Delete all drafts for a review (account cascade path).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_for_review(&self, review: ReviewId) -> Result<()> {
        sqlx::query("DELETE FROM draft_responses WHERE review_id = ?")
            .bind(review.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn row_to_draft(row: &sqlx::sqlite::SqliteRow) -> DraftResponse {
    DraftResponse {
        id: DraftId::new(row.get("id")),
        review_id: ReviewId::new(row.get("review_id")),
        content: row.get("content"),
        tone: ResponseTone::parse(row.get("tone")),
        variant_number: row.get::<i64, _>("variant_number") as u32,
        created_at: row
            .get::<Option<String>, _>("created_at")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc)),
    }
}
