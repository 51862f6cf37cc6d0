//! The operations the upload layer consumes.

use crate::error::Result;
use crate::hasher::ContentHasher;
use crate::keys::LedgerKeys;
use crate::ledger::Ledger;
use crate::record::{FileRecord, ProvenanceRecord, RecordRow};
use crate::store::{LedgerStore, SqliteLedgerStore};
use crate::verifier::{verify_chain, ChainStatus, VerificationReport, Verifier};
use crate::LedgerError;
use provenance_common_config::LedgerConfig;
use provenance_common_core::FileId;
use provenance_database::{open_ledger_database, DatabaseError, DatabasePool, PoolConfig};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A file's stored history together with an integrity check of it.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub file: FileRecord,
    /// Rows as stored; they may not decode if the chain was tampered with.
    pub records: Vec<RecordRow>,
    pub chain: ChainStatus,
}

/// A fully wired ledger: keys, store, ledger and verifier.
pub struct ProvenanceService {
    ledger: Arc<Ledger>,
    verifier: Verifier,
    database: Option<DatabasePool>,
}

impl ProvenanceService {
    /// Provision keys and open the SQLite ledger described by `config`.
    pub async fn open(config: &LedgerConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;
        let keys = LedgerKeys::provision(config.secret_key_path(), config.system_id_path())?;

        let pool_config = PoolConfig::builder()
            .database_path(config.database_path())
            .max_connections(config.database.max_connections)
            .wal_mode(config.database.wal_mode)
            .busy_timeout(Duration::from_millis(config.database.busy_timeout_ms))
            .build()
            .map_err(DatabaseError::from)?;
        let database = open_ledger_database(pool_config).await?;
        debug!(path = %config.database_path().display(), "Ledger database open");

        let store = Arc::new(SqliteLedgerStore::new(database.pool().clone()));
        let mut service = Self::with_store(store, keys)?;
        service.database = Some(database);
        Ok(service)
    }

    /// Wire a service over an arbitrary store.
    pub fn with_store(store: Arc<dyn LedgerStore>, keys: LedgerKeys) -> Result<Self> {
        let ledger = Arc::new(Ledger::new(store, keys)?);
        Ok(Self {
            verifier: Verifier::new(Arc::clone(&ledger)),
            ledger,
            database: None,
        })
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// The SQLite pool, when opened from configuration.
    pub fn database(&self) -> Option<&DatabasePool> {
        self.database.as_ref()
    }

    /// Hash `bytes` and register them as a new file.
    pub async fn create_file_record(
        &self,
        filename: &str,
        stored_path: &str,
        bytes: &[u8],
    ) -> Result<(FileRecord, ProvenanceRecord)> {
        let hash = ContentHasher::hash_bytes(bytes);
        self.ledger.create_file(filename, stored_path, &hash).await
    }

    /// Register a file already written to disk, hashing it in chunks.
    pub async fn register_upload(
        &self,
        filename: &str,
        stored_path: impl AsRef<Path>,
    ) -> Result<(FileRecord, ProvenanceRecord)> {
        let stored_path = stored_path.as_ref();
        let hash = ContentHasher::hash_file_async(stored_path).await?;
        self.ledger
            .create_file(filename, &stored_path.to_string_lossy(), &hash)
            .await
    }

    pub async fn verify_upload(&self, filename: &str, bytes: &[u8]) -> Result<VerificationReport> {
        self.verifier.check(filename, bytes).await
    }

    pub async fn verify_upload_by_id(
        &self,
        file_id: FileId,
        bytes: &[u8],
    ) -> Result<VerificationReport> {
        self.verifier.check_by_id(file_id, bytes).await
    }

    /// Like [`verify_upload`](Self::verify_upload) for content on disk.
    pub async fn verify_file(
        &self,
        filename: &str,
        path: impl AsRef<Path>,
    ) -> Result<VerificationReport> {
        let hash = ContentHasher::hash_file_async(path).await?;
        self.verifier.check_hash(filename, &hash).await
    }

    pub async fn verify_file_by_id(
        &self,
        file_id: FileId,
        path: impl AsRef<Path>,
    ) -> Result<VerificationReport> {
        let hash = ContentHasher::hash_file_async(path).await?;
        self.verifier.check_hash_by_id(file_id, &hash).await
    }

    /// Records in insertion order.
    pub async fn get_history(&self, file_id: FileId) -> Result<Vec<ProvenanceRecord>> {
        self.ledger.history(file_id).await
    }

    pub async fn history_with_status(&self, file_id: FileId) -> Result<HistoryView> {
        let file = self
            .ledger
            .file(file_id)
            .await?
            .ok_or(LedgerError::FileNotFound(file_id))?;
        let records = self.ledger.chain_rows(file_id).await?;
        let chain = ChainStatus {
            file_id,
            length: records.len(),
            violation: verify_chain(&records, self.ledger.signer()).err(),
        };
        Ok(HistoryView {
            file,
            records,
            chain,
        })
    }

    pub async fn check_chain(&self, file_id: FileId) -> Result<ChainStatus> {
        self.verifier.chain_status(file_id).await
    }

    /// Newest first.
    pub async fn recent_files(&self, limit: u32) -> Result<Vec<FileRecord>> {
        self.ledger.recent_files(limit).await
    }

    pub async fn file(&self, file_id: FileId) -> Result<Option<FileRecord>> {
        self.ledger.file(file_id).await
    }

    pub async fn close(&self) {
        if let Some(database) = &self.database {
            database.close().await;
        }
        info!("Provenance service closed");
    }
}
