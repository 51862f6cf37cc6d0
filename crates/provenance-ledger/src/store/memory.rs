use super::{LedgerStore, SealFn};
use crate::error::StorageError;
use crate::record::{FileRecord, NewFile, NewRecord, ProvenanceRecord, RecordRow};
use async_trait::async_trait;
use parking_lot::Mutex;
use provenance_common_core::{FileId, RecordId};

#[derive(Default)]
struct State {
    files: Vec<FileRecord>,
    records: Vec<RecordRow>,
}

/// In-process [`LedgerStore`]. Every operation runs under one lock, which
/// trivially serializes appends.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_file_with_record(
        &self,
        file: NewFile,
        seal: &SealFn<'_>,
    ) -> Result<(FileRecord, ProvenanceRecord), StorageError> {
        let mut state = self.state.lock();
        let file_id = FileId::new(state.files.len() as i64 + 1);
        let sealed = seal(file_id, None)?;

        let record_id = state.records.len() as i64 + 1;
        let file = file.into_record(file_id);
        state.files.push(file.clone());
        state.records.push(RecordRow::from_new(record_id, &sealed));
        Ok((file, sealed.into_record(RecordId::new(record_id))))
    }

    async fn append_record(
        &self,
        file_id: FileId,
        seal: &SealFn<'_>,
    ) -> Result<ProvenanceRecord, StorageError> {
        let mut state = self.state.lock();
        if !state.files.iter().any(|f| f.id == file_id) {
            return Err(StorageError::MissingFile(file_id));
        }
        let latest = state
            .records
            .iter()
            .rev()
            .find(|r| r.file_id == file_id.get());
        let sealed = seal(file_id, latest)?;

        let record_id = state.records.len() as i64 + 1;
        state.records.push(RecordRow::from_new(record_id, &sealed));
        Ok(sealed.into_record(RecordId::new(record_id)))
    }

    async fn append_if_head(
        &self,
        record: &NewRecord,
        expected_head: i64,
    ) -> Result<Option<RecordId>, StorageError> {
        let file_id = record.core.file_id;
        let mut state = self.state.lock();
        if !state.files.iter().any(|f| f.id == file_id) {
            return Err(StorageError::MissingFile(file_id));
        }
        let head = state
            .records
            .iter()
            .rev()
            .find(|r| r.file_id == file_id.get())
            .map_or(0, |r| r.id);
        if head != expected_head {
            return Ok(None);
        }

        let record_id = state.records.len() as i64 + 1;
        state.records.push(RecordRow::from_new(record_id, record));
        Ok(Some(RecordId::new(record_id)))
    }

    async fn file_exists(&self, file_id: FileId) -> Result<bool, StorageError> {
        Ok(self.state.lock().files.iter().any(|f| f.id == file_id))
    }

    async fn file_by_id(&self, file_id: FileId) -> Result<Option<FileRecord>, StorageError> {
        Ok(self
            .state
            .lock()
            .files
            .iter()
            .find(|f| f.id == file_id)
            .cloned())
    }

    async fn latest_file_id_by_name(
        &self,
        filename: &str,
    ) -> Result<Option<FileId>, StorageError> {
        Ok(self
            .state
            .lock()
            .files
            .iter()
            .rev()
            .find(|f| f.filename == filename)
            .map(|f| f.id))
    }

    async fn recent_files(&self, limit: u32) -> Result<Vec<FileRecord>, StorageError> {
        Ok(self
            .state
            .lock()
            .files
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn records_for_file(&self, file_id: FileId) -> Result<Vec<RecordRow>, StorageError> {
        Ok(self
            .state
            .lock()
            .records
            .iter()
            .filter(|r| r.file_id == file_id.get())
            .cloned()
            .collect())
    }

    async fn latest_record(&self, file_id: FileId) -> Result<Option<RecordRow>, StorageError> {
        Ok(self
            .state
            .lock()
            .records
            .iter()
            .rev()
            .find(|r| r.file_id == file_id.get())
            .cloned())
    }
}
