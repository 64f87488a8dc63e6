//! Subscriber storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{Plan, Subscriber, SubscriberId};
use crate::Result;

/// Repository for subscriber storage and retrieval.
pub struct SubscriberRepository {
    pool: SqlitePool,
}

impl SubscriberRepository {
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
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                plan TEXT NOT NULL DEFAULT 'free',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a subscriber, returning the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn create(&self, email: &str, plan: Plan) -> Result<Subscriber> {
        let result = sqlx::query("INSERT INTO subscribers (email, plan) VALUES (?, ?)")
            .bind(email)
            .bind(plan.as_str())
            .execute(&self.pool)
            .await?;

        Ok(Subscriber {
            id: SubscriberId::new(result.last_insert_rowid()),
            email: email.to_string(),
            plan,
            is_active: true,
        })
    }

    /// Get subscriber by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: SubscriberId) -> Result<Option<Subscriber>> {
        let row = sqlx::query("SELECT id, email, plan, is_active FROM subscribers WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_subscriber))
    }

    /// Update a subscriber's plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn set_plan(&self, id: SubscriberId, plan: Plan) -> Result<()> {
        sqlx::query("UPDATE subscribers SET plan = ? WHERE id = ?")
            .bind(plan.as_str())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_subscriber(row: &sqlx::sqlite::SqliteRow) -> Subscriber {
    Subscriber {
        id: SubscriberId::new(row.get("id")),
        email: row.get("email"),
        plan: Plan::parse(row.get("plan")),
        is_active: row.get::<i64, _>("is_active") != 0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_retrieve() {
        let repo = SubscriberRepository::in_memory().await.unwrap();
        let created = repo.create("owner@example.com", Plan::Starter).await.unwrap();

        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "owner@example.com");
        assert_eq!(fetched.plan, Plan::Starter);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn plan_updates_persist() {
        let repo = SubscriberRepository::in_memory().await.unwrap();
        let created = repo.create("owner@example.com", Plan::Free).await.unwrap();

        repo.set_plan(created.id, Plan::Professional).await.unwrap();
        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.plan, Plan::Professional);
    }

    #[tokio::test]
    async fn missing_subscriber_is_none() {
        let repo = SubscriberRepository::in_memory().await.unwrap();
        assert!(repo.get(SubscriberId::new(99)).await.unwrap().is_none());
    }
}
