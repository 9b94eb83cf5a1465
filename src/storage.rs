use crate::types::savings_entry::{NewSavingsEntry, SavingsEntry};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("entry {0} not found")]
    NotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[allow(async_fn_in_trait)]
pub trait Storage {
    async fn init(&self) -> Result<(), StorageError>;

    /// All entries, newest first.
    async fn list_entries(&self) -> Result<Vec<SavingsEntry>, StorageError>;

    /// Inserts the batch all-or-nothing and returns every entry, newest first.
    async fn create_entries(
        &self,
        batch: Vec<NewSavingsEntry>,
    ) -> Result<Vec<SavingsEntry>, StorageError>;

    async fn delete_entry(&self, id: i64) -> Result<(), StorageError>;
}

// implementations

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS savings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        amount TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

const SELECT_ENTRIES: &str = r#"
    SELECT id, name, amount, created_at
    FROM savings
    ORDER BY created_at DESC, id DESC
"#;

#[derive(FromRow)]
struct SavingsRow {
    id: i64,
    name: String,
    // decimal text, kept exact
    amount: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SavingsRow> for SavingsEntry {
    type Error = StorageError;

    fn try_from(row: SavingsRow) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(&row.amount).map_err(|e| {
            StorageError::Corrupt(format!("amount {:?} of entry {}: {}", row.amount, row.id, e))
        })?;
        Ok(SavingsEntry {
            id: row.id,
            name: row.name,
            amount,
            created_at: row.created_at,
        })
    }
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> SqliteStorage {
        SqliteStorage { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<SqliteStorage, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        tracing::info!("connected to {}", url);
        let storage = SqliteStorage::new(pool);
        storage.init().await?;
        Ok(storage)
    }

    /// Single-connection in-memory database. Every pooled connection to
    /// `sqlite::memory:` is a separate database, so the pool is pinned to one
    /// connection that is never recycled.
    #[cfg(test)]
    pub async fn in_memory() -> Result<SqliteStorage, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let storage = SqliteStorage::new(pool);
        storage.init().await?;
        Ok(storage)
    }
}

impl Storage for SqliteStorage {
    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<SavingsEntry>, StorageError> {
        sqlx::query_as::<_, SavingsRow>(SELECT_ENTRIES)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(SavingsEntry::try_from)
            .collect()
    }

    async fn create_entries(
        &self,
        batch: Vec<NewSavingsEntry>,
    ) -> Result<Vec<SavingsEntry>, StorageError> {
        let created_at = Utc::now();
        // rolled back on drop if any insert fails
        let mut tx = self.pool.begin().await?;
        for entry in &batch {
            sqlx::query("INSERT INTO savings (name, amount, created_at) VALUES (?, ?, ?)")
                .bind(entry.name())
                .bind(entry.amount().to_string())
                .bind(created_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        tracing::info!("stored {} savings entries", batch.len());
        self.list_entries().await
    }

    async fn delete_entry(&self, id: i64) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM savings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }
        tracing::info!("deleted savings entry {}", id);
        Ok(())
    }
}
