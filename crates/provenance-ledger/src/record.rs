//! Ledger data model.

use provenance_common_core::{FileId, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// `prev_hash` of the first record of every chain.
pub const GENESIS_PREV_HASH: &str = "GENESIS";

/// What a ledger entry records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// First record for a newly registered file.
    Create,
    /// A re-verification whose chain passed integrity checks.
    Verify,
}

/// Fields covered by a record's link hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCore {
    pub file_id: FileId,
    pub action: Action,
    /// Content hash observed at the time of the event.
    pub file_hash: String,
    pub prev_hash: String,
    pub timestamp: Timestamp,
    pub system_id: String,
}

/// A persisted, decoded ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub core: RecordCore,
    pub curr_hash: String,
    pub record_hmac: String,
}

impl ProvenanceRecord {
    pub fn file_id(&self) -> FileId {
        self.core.file_id
    }

    pub fn action(&self) -> Action {
        self.core.action
    }

    pub fn file_hash(&self) -> &str {
        &self.core.file_hash
    }

    pub fn prev_hash(&self) -> &str {
        &self.core.prev_hash
    }
}

/// A sealed record waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub core: RecordCore,
    pub curr_hash: String,
    pub record_hmac: String,
}

impl NewRecord {
    pub(crate) fn into_record(self, id: RecordId) -> ProvenanceRecord {
        ProvenanceRecord {
            id,
            core: self.core,
            curr_hash: self.curr_hash,
            record_hmac: self.record_hmac,
        }
    }
}

/// A `provenance` row exactly as stored. Nothing is trusted until it has
/// been decoded and checked against the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRow {
    pub id: i64,
    pub file_id: i64,
    pub action: String,
    pub file_hash: String,
    pub prev_hash: String,
    pub curr_hash: String,
    pub timestamp: String,
    pub system_id: String,
    pub record_hmac: String,
    /// Set when a stored column was not valid UTF-8; the text fields then
    /// hold a lossy rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) unreadable: Option<String>,
}

/// A stored row whose core fields cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {record_id}: {detail}")]
pub struct MalformedRecord {
    pub record_id: i64,
    pub detail: String,
}

impl RecordRow {
    /// Decode the hashed fields. Strict: the action must be one of the
    /// known names and the timestamp must be in canonical form.
    pub fn core(&self) -> Result<RecordCore, MalformedRecord> {
        let malformed = |detail: String| MalformedRecord {
            record_id: self.id,
            detail,
        };

        if let Some(detail) = &self.unreadable {
            return Err(malformed(detail.clone()));
        }
        let action = Action::from_str(&self.action)
            .map_err(|_| malformed(format!("unknown action '{}'", self.action)))?;
        let timestamp = Timestamp::parse_canonical(&self.timestamp)
            .map_err(|e| malformed(e.to_string()))?;
        if self.file_id <= 0 {
            return Err(malformed(format!("invalid file id {}", self.file_id)));
        }

        Ok(RecordCore {
            file_id: FileId::new(self.file_id),
            action,
            file_hash: self.file_hash.clone(),
            prev_hash: self.prev_hash.clone(),
            timestamp,
            system_id: self.system_id.clone(),
        })
    }

    pub(crate) fn from_new(id: i64, record: &NewRecord) -> Self {
        Self {
            id,
            file_id: record.core.file_id.get(),
            action: record.core.action.to_string(),
            file_hash: record.core.file_hash.clone(),
            prev_hash: record.core.prev_hash.clone(),
            curr_hash: record.curr_hash.clone(),
            timestamp: record.core.timestamp.to_canonical(),
            system_id: record.core.system_id.clone(),
            record_hmac: record.record_hmac.clone(),
            unreadable: None,
        }
    }

    /// Whether every stored column decoded as text.
    pub fn is_readable(&self) -> bool {
        self.unreadable.is_none()
    }
}

/// A `provenance` row fetched as raw bytes, so no stored value can fail the
/// read itself.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RawRecordRow {
    pub id: i64,
    pub file_id: i64,
    pub action: Vec<u8>,
    pub file_hash: Vec<u8>,
    pub prev_hash: Vec<u8>,
    pub curr_hash: Vec<u8>,
    pub timestamp: Vec<u8>,
    pub system_id: Vec<u8>,
    pub record_hmac: Vec<u8>,
}

impl From<RawRecordRow> for RecordRow {
    fn from(raw: RawRecordRow) -> Self {
        let mut unreadable = None;
        let mut text = |column: &str, bytes: Vec<u8>| match String::from_utf8(bytes) {
            Ok(value) => value,
            Err(e) => {
                unreadable.get_or_insert_with(|| format!("{column} is not valid UTF-8"));
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let action = text("action", raw.action);
        let file_hash = text("file_hash", raw.file_hash);
        let prev_hash = text("prev_hash", raw.prev_hash);
        let curr_hash = text("curr_hash", raw.curr_hash);
        let timestamp = text("timestamp", raw.timestamp);
        let system_id = text("system_id", raw.system_id);
        let record_hmac = text("record_hmac", raw.record_hmac);

        Self {
            id: raw.id,
            file_id: raw.file_id,
            action,
            file_hash,
            prev_hash,
            curr_hash,
            timestamp,
            system_id,
            record_hmac,
            unreadable,
        }
    }
}

impl TryFrom<RecordRow> for ProvenanceRecord {
    type Error = MalformedRecord;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let core = row.core()?;
        Ok(Self {
            id: RecordId::new(row.id),
            core,
            curr_hash: row.curr_hash,
            record_hmac: row.record_hmac,
        })
    }
}

/// One uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub filename: String,
    pub stored_path: String,
    pub original_hash: String,
    pub upload_time: Timestamp,
    pub system_id: String,
}

/// A file row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub filename: String,
    pub stored_path: String,
    pub original_hash: String,
    pub upload_time: Timestamp,
    pub system_id: String,
}

impl NewFile {
    pub(crate) fn into_record(self, id: FileId) -> FileRecord {
        FileRecord {
            id,
            filename: self.filename,
            stored_path: self.stored_path,
            original_hash: self.original_hash,
            upload_time: self.upload_time,
            system_id: self.system_id,
        }
    }
}

/// A `files` row as stored, fetched as raw bytes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FileRow {
    pub id: i64,
    pub filename: Vec<u8>,
    pub stored_path: Vec<u8>,
    pub original_hash: Vec<u8>,
    pub upload_time: Vec<u8>,
    pub system_id: Vec<u8>,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = MalformedRecord;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let text = |column: &str, bytes: Vec<u8>| {
            String::from_utf8(bytes).map_err(|_| MalformedRecord {
                record_id: id,
                detail: format!("{column} is not valid UTF-8"),
            })
        };

        let upload_time = text("upload_time", row.upload_time)?;
        let upload_time =
            Timestamp::parse_canonical(&upload_time).map_err(|e| MalformedRecord {
                record_id: id,
                detail: e.to_string(),
            })?;
        Ok(Self {
            id: FileId::new(id),
            filename: text("filename", row.filename)?,
            stored_path: text("stored_path", row.stored_path)?,
            original_hash: text("original_hash", row.original_hash)?,
            upload_time,
            system_id: text("system_id", row.system_id)?,
        })
    }
}
