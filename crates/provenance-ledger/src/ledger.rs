//! Chained, signed record construction.

use crate::canonical::CanonicalEncoder;
use crate::error::{EncodeError, LedgerError, Result};
use crate::hasher::ContentHasher;
use crate::keys::{LedgerKeys, SystemIdentity};
use crate::locks::{FileGuard, FileLocks};
use crate::record::{
    Action, FileRecord, NewFile, NewRecord, ProvenanceRecord, RecordCore, RecordRow,
    GENESIS_PREV_HASH,
};
use crate::signer::Signer;
use crate::store::LedgerStore;
use provenance_common_core::{FileId, RecordId, Timestamp};
use std::sync::Arc;
use tracing::{info, instrument};

/// Builds and appends records, and answers read-only chain queries.
///
/// All appends for one file are serialized through a per-file lock; the
/// store additionally refuses a write whose predecessor is no longer the
/// chain head.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    signer: Signer,
    identity: SystemIdentity,
    locks: FileLocks,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, keys: LedgerKeys) -> Result<Self> {
        let signer = Signer::new(&keys.secret)?;
        info!(
            system_id = %keys.identity,
            key = signer.key_fingerprint(),
            "Ledger initialized"
        );
        Ok(Self {
            store,
            signer,
            identity: keys.identity,
            locks: FileLocks::new(),
        })
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn identity(&self) -> &SystemIdentity {
        &self.identity
    }

    /// Hash and sign core fields.
    pub fn seal(&self, core: RecordCore) -> std::result::Result<NewRecord, EncodeError> {
        let curr_hash = CanonicalEncoder::link_hash(&core)?;
        let record_hmac = self.signer.sign(&curr_hash);
        Ok(NewRecord {
            core,
            curr_hash,
            record_hmac,
        })
    }

    fn next_core(
        &self,
        file_id: FileId,
        action: Action,
        observed_hash: &str,
        latest: Option<&RecordRow>,
    ) -> RecordCore {
        let prev_hash = latest
            .map(|row| row.curr_hash.clone())
            .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());
        RecordCore {
            file_id,
            action,
            file_hash: observed_hash.to_string(),
            prev_hash,
            timestamp: Timestamp::now(),
            system_id: self.identity.as_str().to_string(),
        }
    }

    /// Take the file's append lock.
    pub async fn lock(&self, file_id: FileId) -> FileGuard {
        self.locks.lock(file_id).await
    }

    /// Append a record to an existing file's chain.
    #[instrument(skip(self))]
    pub async fn append(
        &self,
        file_id: FileId,
        action: Action,
        observed_hash: &str,
    ) -> Result<ProvenanceRecord> {
        ensure_digest(observed_hash)?;
        let _guard = self.lock(file_id).await;
        let record = self
            .store
            .append_record(file_id, &|file_id, latest: Option<&RecordRow>| {
                self.seal(self.next_core(file_id, action, observed_hash, latest))
            })
            .await?;

        info!(
            record_id = %record.id,
            action = %record.action(),
            "Provenance record appended"
        );
        Ok(record)
    }

    /// Append directly after `head`, which the caller has already checked.
    /// Returns `None`, writing nothing, if `head` is no longer the latest
    /// record of its file.
    #[instrument(skip(self, guard, head), fields(file_id = %guard.file_id(), head = head.id))]
    pub(crate) async fn append_after(
        &self,
        guard: &FileGuard,
        head: &RecordRow,
        action: Action,
        observed_hash: &str,
    ) -> Result<Option<ProvenanceRecord>> {
        ensure_digest(observed_hash)?;
        let sealed = self.seal(self.next_core(guard.file_id(), action, observed_hash, Some(head)))?;
        let Some(record_id) = self.store.append_if_head(&sealed, head.id).await? else {
            return Ok(None);
        };

        let record = sealed.into_record(record_id);
        info!(
            record_id = %record.id,
            action = %record.action(),
            "Provenance record appended"
        );
        Ok(Some(record))
    }

    /// Register a new file together with its CREATE record.
    #[instrument(skip(self, stored_path, content_hash))]
    pub async fn create_file(
        &self,
        filename: &str,
        stored_path: &str,
        content_hash: &str,
    ) -> Result<(FileRecord, ProvenanceRecord)> {
        ensure_digest(content_hash)?;
        let file = NewFile {
            filename: filename.to_string(),
            stored_path: stored_path.to_string(),
            original_hash: content_hash.to_string(),
            upload_time: Timestamp::now(),
            system_id: self.identity.as_str().to_string(),
        };

        let (file, record) = self
            .store
            .insert_file_with_record(file, &|file_id, latest: Option<&RecordRow>| {
                self.seal(self.next_core(file_id, Action::Create, content_hash, latest))
            })
            .await?;

        info!(file_id = %file.id, record_id = %record.id, "File registered");
        Ok((file, record))
    }

    /// Decoded history in insertion order.
    pub async fn history(&self, file_id: FileId) -> Result<Vec<ProvenanceRecord>> {
        if !self.file_exists(file_id).await? {
            return Err(LedgerError::FileNotFound(file_id));
        }
        self.chain_rows(file_id)
            .await?
            .into_iter()
            .map(|row| {
                ProvenanceRecord::try_from(row).map_err(|e| LedgerError::CorruptRecord {
                    record_id: RecordId::new(e.record_id),
                    detail: e.detail,
                })
            })
            .collect()
    }

    /// Stored rows in insertion order, undecoded.
    pub async fn chain_rows(&self, file_id: FileId) -> Result<Vec<RecordRow>> {
        Ok(self.store.records_for_file(file_id).await?)
    }

    pub async fn file_exists(&self, file_id: FileId) -> Result<bool> {
        Ok(self.store.file_exists(file_id).await?)
    }

    pub async fn file(&self, file_id: FileId) -> Result<Option<FileRecord>> {
        Ok(self.store.file_by_id(file_id).await?)
    }

    /// Id of the most recently registered file with this name. The file row
    /// itself is not decoded.
    pub async fn file_id_by_name(&self, filename: &str) -> Result<Option<FileId>> {
        Ok(self.store.latest_file_id_by_name(filename).await?)
    }

    pub async fn recent_files(&self, limit: u32) -> Result<Vec<FileRecord>> {
        Ok(self.store.recent_files(limit).await?)
    }
}

fn ensure_digest(hash: &str) -> Result<()> {
    if ContentHasher::is_digest(hash) {
        Ok(())
    } else {
        Err(LedgerError::InvalidDigest(hash.to_string()))
    }
}
