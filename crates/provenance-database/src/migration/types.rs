use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} failed: {message}")]
    ExecutionFailed { version: i64, message: String },

    #[error("Migration checksum mismatch for version {0}")]
    ChecksumMismatch(i64),

    #[error("Database has migration {0} applied, which this build does not know")]
    UnknownApplied(i64),

    #[error("Duplicate migration version {0}")]
    DuplicateVersion(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One forward-only schema step.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub sql: String,
    /// SHA-256 of `sql`, lowercase hex
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let checksum = Self::compute_checksum(&sql);
        Self {
            version,
            name: name.into(),
            sql,
            checksum,
        }
    }

    pub fn compute_checksum(sql: &str) -> String {
        hex::encode(Sha256::digest(sql.as_bytes()))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
    pub execution_time_ms: i64,
}

#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub version: i64,
    pub name: String,
    pub execution_time_ms: i64,
}
