//! SQLite storage shared by the deck store and the narration cache.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};

use crate::core::errors::{AppError, AppResult};

pub mod repositories;

static MIGRATOR: Migrator = sqlx::migrate!("./src/db/migrations");

const DATABASE_FILE: &str = "slidevoice.sqlite";
const DATA_DIR_NAME: &str = ".slidevoice";
const POOL_SIZE: u32 = 10;
// Writers wait this long on a locked database before reporting it unavailable.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens `slidevoice.sqlite` under `data_dir`, creating both if missing.
    pub async fn new(data_dir: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(DATABASE_FILE);
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let db = Self::open(SqlitePoolOptions::new().max_connections(POOL_SIZE), options).await?;
        tracing::info!(path = %path.display(), "database ready");
        Ok(db)
    }

    /// Private database on a single connection that is never recycled,
    /// since closing it would discard the data.
    pub async fn in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|err| AppError::Database(err.to_string()))?;
        let pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        Self::open(pool_options, options).await
    }

    async fn open(pool_options: SqlitePoolOptions, options: SqliteConnectOptions) -> AppResult<Self> {
        let pool = pool_options.connect_with(options).await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `.slidevoice` under the working directory.
pub fn default_data_dir() -> AppResult<PathBuf> {
    Ok(std::env::current_dir()?.join(DATA_DIR_NAME))
}
