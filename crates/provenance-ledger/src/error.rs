//! Ledger error taxonomy.
//!
//! Verification outcomes are values, not errors. Everything here is either
//! a provisioning failure, a persistence failure, or a caller mistake.

use provenance_common_core::{FileId, RecordId};
use provenance_database::DatabaseError;
use std::path::PathBuf;
use thiserror::Error;

/// The secret or the system identity could not be provisioned.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("cannot access key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret key file {path} holds {actual} bytes, expected {expected}")]
    WrongLength {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("system identity file {path} is empty")]
    EmptyIdentity { path: PathBuf },

    #[error("secret key rejected: {0}")]
    InvalidKey(String),

    #[error("system entropy source failed: {0}")]
    Entropy(String),
}

impl KeyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Canonical encoding failed.
#[derive(Debug, Error)]
#[error("canonical encoding failed: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Persistence read/write failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database setup failed: {0}")]
    Setup(#[from] DatabaseError),

    #[error("cannot decode {table} row {id}: {message}")]
    Decode {
        table: &'static str,
        id: i64,
        message: String,
    },

    #[error("file {0} does not exist")]
    MissingFile(FileId),

    #[error("gave up appending to file {file_id} after {attempts} concurrent-write retries")]
    Contention { file_id: FileId, attempts: u32 },

    #[error(transparent)]
    Seal(#[from] EncodeError),
}

/// Top-level ledger error.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger keys unavailable: {0}")]
    KeyUnavailable(#[from] KeyError),

    #[error("storage failure: {0}")]
    Storage(StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encoding(#[from] EncodeError),

    #[error("record {record_id} cannot be decoded: {detail}")]
    CorruptRecord { record_id: RecordId, detail: String },

    #[error("file {0} not found")]
    FileNotFound(FileId),

    #[error("'{0}' is not a lowercase hex SHA-256 digest")]
    InvalidDigest(String),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingFile(id) => Self::FileNotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.into())
    }
}

impl From<DatabaseError> for LedgerError {
    fn from(err: DatabaseError) -> Self {
        Self::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
