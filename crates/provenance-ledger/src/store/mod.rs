//! Persistence interface consumed by the ledger.
//!
//! The trait offers inserts and reads only. Nothing reachable from the
//! ledger can update or delete a provenance row.

mod memory;
mod sqlite;

pub use memory::MemoryLedgerStore;
pub use sqlite::SqliteLedgerStore;

use crate::error::{EncodeError, StorageError};
use crate::record::{FileRecord, NewFile, NewRecord, ProvenanceRecord, RecordRow};
use async_trait::async_trait;
use provenance_common_core::{FileId, RecordId};

/// Builds the next record for a file given its current latest row.
///
/// Stores may call this more than once for one append if a concurrent
/// writer got in first; each call must seal against the row it is given.
pub type SealFn<'a> = dyn Fn(FileId, Option<&RecordRow>) -> Result<NewRecord, EncodeError> + Send + Sync + 'a;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a file row and its first record atomically.
    async fn insert_file_with_record(
        &self,
        file: NewFile,
        seal: &SealFn<'_>,
    ) -> Result<(FileRecord, ProvenanceRecord), StorageError>;

    /// Append the record produced by `seal` to the file's chain. The
    /// latest row handed to `seal` is guaranteed to still be the latest
    /// when the new row is written.
    async fn append_record(
        &self,
        file_id: FileId,
        seal: &SealFn<'_>,
    ) -> Result<ProvenanceRecord, StorageError>;

    /// Insert `record` only if the file's latest record id is still
    /// `expected_head`. Returns `None`, writing nothing, when another writer
    /// moved the head first.
    async fn append_if_head(
        &self,
        record: &NewRecord,
        expected_head: i64,
    ) -> Result<Option<RecordId>, StorageError>;

    async fn file_exists(&self, file_id: FileId) -> Result<bool, StorageError>;

    async fn file_by_id(&self, file_id: FileId) -> Result<Option<FileRecord>, StorageError>;

    /// Id of the most recent file with this name, without decoding its row.
    async fn latest_file_id_by_name(&self, filename: &str)
        -> Result<Option<FileId>, StorageError>;

    /// Newest first.
    async fn recent_files(&self, limit: u32) -> Result<Vec<FileRecord>, StorageError>;

    /// All records for a file in insertion order.
    async fn records_for_file(&self, file_id: FileId) -> Result<Vec<RecordRow>, StorageError>;

    async fn latest_record(&self, file_id: FileId) -> Result<Option<RecordRow>, StorageError>;
}
