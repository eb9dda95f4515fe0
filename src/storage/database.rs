//! Read-only SQLite corpus store
//!
//! Provides pooled connections to the filing corpus. Nothing in this crate
//! writes to the store; connections are opened with `SQLITE_OPEN_READ_ONLY`.

use crate::config::StorageConfig;
use crate::embedding::register_distance_function;
use crate::error::{FinsearchError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use serde::Serialize;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Tables counted by [`Database::stats`]
const STAT_TABLES: &[&str] = &[
    "company_tickers_exchange",
    "documents",
    "sections",
    "chunks",
    "embeddings",
];

/// Read-only corpus handle, safe to share across request threads
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open the corpus store described by `config`
    pub fn open(config: &StorageConfig) -> Result<Self> {
        Self::open_path(
            &config.database_path,
            config.pool_size,
            config.register_distance_function,
        )
    }

    /// Open a corpus file with an explicit pool size
    pub fn open_path(db_path: &Path, pool_size: u32, register_distance: bool) -> Result<Self> {
        // A read-only open of a missing file would otherwise stall in the pool builder.
        if !db_path.exists() {
            return Err(FinsearchError::DatabaseNotFound {
                path: db_path.to_path_buf(),
            });
        }

        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_init(move |conn| {
                conn.execute_batch("PRAGMA query_only = ON;")?;
                if register_distance {
                    register_distance_function(conn)?;
                }
                Ok(())
            });

        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        tracing::info!(
            path = %db_path.display(),
            pool_size,
            register_distance,
            "Corpus store opened read-only"
        );

        Ok(Self { pool })
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Number of text chunks in the corpus
    pub fn count_chunks(&self) -> Result<usize> {
        self.count_table("chunks")
    }

    /// Number of stored embedding vectors
    pub fn count_embeddings(&self) -> Result<usize> {
        self.count_table("embeddings")
    }

    fn count_table(&self, table: &str) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count.max(0) as usize)
    }

    /// Get corpus statistics; a table that cannot be counted reports 0
    pub fn stats(&self) -> DbStats {
        let mut counts = STAT_TABLES.iter().map(|table| {
            self.count_table(table).unwrap_or_else(|e| {
                tracing::debug!(table, error = %e, "Table count unavailable");
                0
            })
        });

        DbStats {
            company_count: counts.next().unwrap_or(0),
            document_count: counts.next().unwrap_or(0),
            section_count: counts.next().unwrap_or(0),
            chunk_count: counts.next().unwrap_or(0),
            embedding_count: counts.next().unwrap_or(0),
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub company_count: usize,
    pub document_count: usize,
    pub section_count: usize,
    pub chunk_count: usize,
    pub embedding_count: usize,
}
