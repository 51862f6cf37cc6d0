//! Configuration types.

use provenance_common_log::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default upload size limit (10 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding the database, key files and uploads.
    pub data_dir: PathBuf,
    /// Database configuration.
    pub database: DatabaseSection,
    /// Key file locations.
    pub keys: KeysSection,
    /// Upload storage.
    pub uploads: UploadsSection,
    /// Logging.
    pub log: LogConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database: DatabaseSection::default(),
            keys: KeysSection::default(),
            uploads: UploadsSection::default(),
            log: LogConfig::default(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file, relative to `data_dir` unless absolute.
    pub path: PathBuf,
    /// Pool size.
    pub max_connections: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout_ms: u64,
    /// Use write-ahead logging.
    pub wal_mode: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("provenance.db"),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            wal_mode: true,
        }
    }
}

/// Key file locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeysSection {
    /// 32-byte HMAC secret.
    pub secret_key_file: PathBuf,
    /// Text file holding this ledger's system identity.
    pub system_id_file: PathBuf,
}

impl Default for KeysSection {
    fn default() -> Self {
        Self {
            secret_key_file: PathBuf::from("hmac_secret.key"),
            system_id_file: PathBuf::from("system_id.txt"),
        }
    }
}

/// Upload storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UploadsSection {
    /// Directory stored uploads are written to.
    pub dir: PathBuf,
    /// Largest accepted upload.
    pub max_bytes: u64,
}

impl Default for UploadsSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }
}

impl LedgerConfig {
    /// Config rooted at `data_dir`, everything else default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Resolved SQLite file.
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database.path)
    }

    /// Resolved secret key file.
    pub fn secret_key_path(&self) -> PathBuf {
        self.resolve(&self.keys.secret_key_file)
    }

    /// Resolved system identity file.
    pub fn system_id_path(&self) -> PathBuf {
        self.resolve(&self.keys.system_id_file)
    }

    /// Resolved upload directory.
    pub fn upload_dir(&self) -> PathBuf {
        self.resolve(&self.uploads.dir)
    }
}
