use super::{LedgerStore, SealFn};
use crate::error::StorageError;
use crate::record::{
    FileRecord, FileRow, NewFile, NewRecord, ProvenanceRecord, RawRecordRow, RecordRow,
};
use async_trait::async_trait;
use provenance_common_core::{FileId, RecordId};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

const DEFAULT_MAX_ATTEMPTS: u32 = 16;

// Text columns are read as blobs so a tampered value of any storage class
// still reaches the chain walk.
const RECORD_COLUMNS: &str = "id, CAST(file_id AS INTEGER) AS file_id,
     CAST(action AS BLOB) AS action, CAST(file_hash AS BLOB) AS file_hash,
     CAST(prev_hash AS BLOB) AS prev_hash, CAST(curr_hash AS BLOB) AS curr_hash,
     CAST(timestamp AS BLOB) AS timestamp, CAST(system_id AS BLOB) AS system_id,
     CAST(record_hmac AS BLOB) AS record_hmac";

const FILE_COLUMNS: &str = "id, CAST(filename AS BLOB) AS filename,
     CAST(stored_path AS BLOB) AS stored_path, CAST(original_hash AS BLOB) AS original_hash,
     CAST(upload_time AS BLOB) AS upload_time, CAST(system_id AS BLOB) AS system_id";

const INSERT_RECORD: &str = "INSERT INTO provenance
     (file_id, action, file_hash, prev_hash, curr_hash, timestamp, system_id, record_hmac)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

// Inserts only if the file's latest record id is still the one the new
// record was sealed against (0 when the chain was empty).
const INSERT_RECORD_IF_LATEST: &str = "INSERT INTO provenance
     (file_id, action, file_hash, prev_hash, curr_hash, timestamp, system_id, record_hmac)
     SELECT ?, ?, ?, ?, ?, ?, ?, ?
     WHERE COALESCE(
         (SELECT id FROM provenance WHERE file_id = ? ORDER BY id DESC LIMIT 1), 0
     ) = ?";

/// [`LedgerStore`] over the SQLite ledger schema.
///
/// Appends are compare-and-swap inserts keyed on the latest record id, so
/// writers in other processes sharing the same database file cannot fork a
/// chain either.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    max_attempts: u32,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert_record(
        conn: &mut SqliteConnection,
        record: &NewRecord,
    ) -> Result<i64, StorageError> {
        let core = &record.core;
        let result = sqlx::query(INSERT_RECORD)
            .bind(core.file_id.get())
            .bind(core.action.as_ref())
            .bind(&core.file_hash)
            .bind(&core.prev_hash)
            .bind(&record.curr_hash)
            .bind(core.timestamp.to_canonical())
            .bind(&core.system_id)
            .bind(&record.record_hmac)
            .execute(conn)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

fn decode_file(row: FileRow) -> Result<FileRecord, StorageError> {
    let id = row.id;
    FileRecord::try_from(row).map_err(|e| StorageError::Decode {
        table: "files",
        id,
        message: e.detail,
    })
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    #[instrument(skip(self, file, seal), fields(filename = %file.filename))]
    async fn insert_file_with_record(
        &self,
        file: NewFile,
        seal: &SealFn<'_>,
    ) -> Result<(FileRecord, ProvenanceRecord), StorageError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO files (filename, stored_path, original_hash, upload_time, system_id)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&file.filename)
        .bind(&file.stored_path)
        .bind(&file.original_hash)
        .bind(file.upload_time.to_canonical())
        .bind(&file.system_id)
        .execute(&mut *tx)
        .await?;
        let file_id = FileId::new(result.last_insert_rowid());

        let sealed = seal(file_id, None)?;
        let record_id = Self::insert_record(&mut tx, &sealed).await?;
        tx.commit().await?;

        debug!(file_id = %file_id, record_id, "File and CREATE record committed");
        Ok((
            file.into_record(file_id),
            sealed.into_record(RecordId::new(record_id)),
        ))
    }

    #[instrument(skip(self, seal))]
    async fn append_record(
        &self,
        file_id: FileId,
        seal: &SealFn<'_>,
    ) -> Result<ProvenanceRecord, StorageError> {
        for attempt in 1..=self.max_attempts {
            let latest = self.latest_record(file_id).await?;
            let expected_head = match &latest {
                Some(row) if !row.is_readable() => {
                    return Err(StorageError::Decode {
                        table: "provenance",
                        id: row.id,
                        message: "chain head is not valid text".to_string(),
                    });
                }
                Some(row) => row.id,
                None => {
                    if !self.file_exists(file_id).await? {
                        return Err(StorageError::MissingFile(file_id));
                    }
                    0
                }
            };

            let sealed = seal(file_id, latest.as_ref())?;
            if let Some(record_id) = self.append_if_head(&sealed, expected_head).await? {
                return Ok(sealed.into_record(record_id));
            }
            debug!(attempt, "Chain head moved during append, resealing");
        }

        Err(StorageError::Contention {
            file_id,
            attempts: self.max_attempts,
        })
    }

    async fn append_if_head(
        &self,
        record: &NewRecord,
        expected_head: i64,
    ) -> Result<Option<RecordId>, StorageError> {
        let core = &record.core;
        let result = sqlx::query(INSERT_RECORD_IF_LATEST)
            .bind(core.file_id.get())
            .bind(core.action.as_ref())
            .bind(&core.file_hash)
            .bind(&core.prev_hash)
            .bind(&record.curr_hash)
            .bind(core.timestamp.to_canonical())
            .bind(&core.system_id)
            .bind(&record.record_hmac)
            .bind(core.file_id.get())
            .bind(expected_head)
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() == 1).then(|| RecordId::new(result.last_insert_rowid())))
    }

    async fn file_exists(&self, file_id: FileId) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM files WHERE id = ?)")
            .bind(file_id.get())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn file_by_id(&self, file_id: FileId) -> Result<Option<FileRecord>, StorageError> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(file_id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(decode_file).transpose()
    }

    async fn latest_file_id_by_name(
        &self,
        filename: &str,
    ) -> Result<Option<FileId>, StorageError> {
        let id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM files WHERE filename = ? ORDER BY id DESC LIMIT 1")
                .bind(filename)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id.map(FileId::new))
    }

    async fn recent_files(&self, limit: u32) -> Result<Vec<FileRecord>, StorageError> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files ORDER BY id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode_file).collect()
    }

    async fn records_for_file(&self, file_id: FileId) -> Result<Vec<RecordRow>, StorageError> {
        let rows = sqlx::query_as::<_, RawRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM provenance WHERE file_id = ? ORDER BY id ASC"
        ))
        .bind(file_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RecordRow::from).collect())
    }

    async fn latest_record(&self, file_id: FileId) -> Result<Option<RecordRow>, StorageError> {
        let row = sqlx::query_as::<_, RawRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM provenance WHERE file_id = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(file_id.get())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RecordRow::from))
    }
}
