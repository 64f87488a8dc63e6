//! Review storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::model::{AnalysisUpdate, NewReview, Priority, Review, ReviewId, Sentiment};
use crate::Result;
use crate::account::AccountId;

/// Bound on the failure note stored after retry exhaustion.
const FAILURE_NOTE_MAX: usize = 200;

/// Repository for review storage and retrieval.
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
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
    ///
    /// The unique (account, message) index is the sole concurrency guard
    /// against duplicate ingestion: no lock is taken anywhere else.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                sender_email TEXT NOT NULL,
                sender_name TEXT,
                subject TEXT NOT NULL,
                received_at TEXT NOT NULL,
                sentiment TEXT,
                priority TEXT,
                summary TEXT,
                problems TEXT,
                suggestions TEXT,
                is_processed INTEGER NOT NULL DEFAULT 0,
                processed_at TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(account_id, message_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_reviews_unprocessed
            ON reviews(account_id, is_processed)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a review unless its (account, message) pair already exists.
    ///
    /// Returns `None` on the duplicate path — the unique-constraint
    /// violation is the expected signal under concurrent or re-run
    /// ingestion, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error for database failures other than the unique
    /// violation.
    pub async fn insert_if_new(&self, new: NewReview) -> Result<Option<Review>> {
        let result = sqlx::query(
            r"
            INSERT INTO reviews (
                account_id, message_id, sender_email, sender_name,
                subject, received_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(new.account_id.0)
        .bind(&new.message_id)
        .bind(&new.sender_email)
        .bind(&new.sender_name)
        .bind(&new.subject)
        .bind(new.received_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = ReviewId::new(done.last_insert_rowid());
                debug!("Created review {id} for message {}", new.message_id);
                self.get(id).await
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Message {} already ingested, skipping", new.message_id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get review by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_review).transpose()
    }

    /// Get all reviews for an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_account(&self, account: AccountId) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT * FROM reviews WHERE account_id = ? ORDER BY received_at DESC",
        )
        .bind(account.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_review).collect()
    }

    /// Apply analysis results and mark the review processed.
    ///
    /// Idempotent by construction: the analyze task checks the processed
    /// flag before re-running, and a second application simply overwrites
    /// the same fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn store_analysis(&self, id: ReviewId, update: &AnalysisUpdate) -> Result<()> {
        sqlx::query(
            r"
            UPDATE reviews SET
                sentiment = ?, priority = ?, summary = ?,
                problems = ?, suggestions = ?,
                is_processed = 1, processed_at = ?
            WHERE id = ?
            ",
        )
        .bind(update.sentiment.as_str())
        .bind(update.priority.as_str())
        .bind(&update.summary)
        .bind(serde_json::to_string(&update.problems)?)
        .bind(serde_json::to_string(&update.suggestions)?)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a review processed with a failure note after retry exhaustion.
    ///
    /// An unprocessed-forever review would silently stall downstream
    /// notification, so terminal failures still flip the flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_failed(&self, id: ReviewId, reason: &str) -> Result<()> {
        let mut note = reason.to_string();
        if note.len() > FAILURE_NOTE_MAX {
            let mut end = FAILURE_NOTE_MAX;
            while !note.is_char_boundary(end) {
                end -= 1;
            }
            note.truncate(end);
        }

        sqlx::query(
            r"
            UPDATE reviews SET
                summary = ?, is_processed = 1, processed_at = ?
            WHERE id = ?
            ",
        )
        .bind(format!("[analysis failed: {note}]"))
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count reviews for an account (test and diagnostics helper).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_for_account(&self, account: AccountId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM reviews WHERE account_id = ?")
            .bind(account.0)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("n"))
    }
}

fn row_to_review(row: &sqlx::sqlite::SqliteRow) -> Result<Review> {
    let problems: Vec<String> = parse_json_list(row.get("problems"))?;
    let suggestions: Vec<String> = parse_json_list(row.get("suggestions"))?;

    Ok(Review {
        id: ReviewId::new(row.get("id")),
        account_id: AccountId::new(row.get("account_id")),
        message_id: row.get("message_id"),
        sender_email: row.get("sender_email"),
        sender_name: row.get("sender_name"),
        subject: row.get("subject"),
        received_at: parse_timestamp(row.get("received_at")).unwrap_or_else(Utc::now),
        sentiment: row
            .get::<Option<String>, _>("sentiment")
            .map(|s| Sentiment::parse(&s)),
        priority: row
            .get::<Option<String>, _>("priority")
            .map(|s| Priority::parse(&s)),
        summary: row.get("summary"),
        problems,
        suggestions,
        is_processed: row.get::<i64, _>("is_processed") != 0,
        processed_at: row
            .get::<Option<String>, _>("processed_at")
            .and_then(parse_timestamp),
        created_at: row
            .get::<Option<String>, _>("created_at")
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
    })
}

fn parse_json_list(raw: Option<String>) -> Result<Vec<String>> {
    raw.map_or_else(|| Ok(Vec::new()), |s| Ok(serde_json::from_str(&s)?))
}

fn parse_timestamp(raw: String) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_review(account: i64, message_id: &str) -> NewReview {
        NewReview {
            account_id: AccountId::new(account),
            message_id: message_id.to_string(),
            sender_email: "customer@example.com".to_string(),
            sender_name: Some("A Customer".to_string()),
            subject: "Order #1042".to_string(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let review = repo.insert_if_new(new_review(1, "m1")).await.unwrap().unwrap();

        assert!(!review.is_processed);
        assert!(review.sentiment.is_none());
        assert_eq!(review.message_id, "m1");
        assert_eq!(review.subject, "Order #1042");
    }

    #[tokio::test]
    async fn duplicate_message_is_skipped() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let first = repo.insert_if_new(new_review(1, "m1")).await.unwrap();
        assert!(first.is_some());

        let duplicate = repo.insert_if_new(new_review(1, "m1")).await.unwrap();
        assert!(duplicate.is_none());
        assert_eq!(repo.count_for_account(AccountId::new(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_message_id_across_accounts_is_distinct() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        assert!(repo.insert_if_new(new_review(1, "m1")).await.unwrap().is_some());
        assert!(repo.insert_if_new(new_review(2, "m1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn analysis_marks_processed() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let review = repo.insert_if_new(new_review(1, "m1")).await.unwrap().unwrap();

        let update = AnalysisUpdate {
            sentiment: Sentiment::Negative,
            priority: Priority::Important,
            summary: "Delivery arrived late and damaged.".to_string(),
            problems: vec!["late delivery".to_string(), "damaged box".to_string()],
            suggestions: vec![],
        };
        repo.store_analysis(review.id, &update).await.unwrap();

        let stored = repo.get(review.id).await.unwrap().unwrap();
        assert!(stored.is_processed);
        assert!(stored.processed_at.is_some());
        assert_eq!(stored.sentiment, Some(Sentiment::Negative));
        assert_eq!(stored.priority, Some(Priority::Important));
        assert_eq!(stored.problems.len(), 2);
    }

    #[tokio::test]
    async fn failure_note_is_bounded_and_processes() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let review = repo.insert_if_new(new_review(1, "m1")).await.unwrap().unwrap();

        let long_reason = "x".repeat(1000);
        repo.mark_failed(review.id, &long_reason).await.unwrap();

        let stored = repo.get(review.id).await.unwrap().unwrap();
        assert!(stored.is_processed);
        let summary = stored.summary.unwrap();
        assert!(summary.starts_with("[analysis failed:"));
        assert!(summary.len() < 250);
    }

    #[tokio::test]
    async fn list_newest_first() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let mut older = new_review(1, "m1");
        older.received_at = Utc::now() - chrono::Duration::hours(2);
        repo.insert_if_new(older).await.unwrap();
        repo.insert_if_new(new_review(1, "m2")).await.unwrap();

        let listed = repo.list_for_account(AccountId::new(1)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].message_id, "m2");
    }
}
