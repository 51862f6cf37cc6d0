//! Test utilities for provenance crates.

use provenance_common_config::LedgerConfig;
use provenance_ledger::ProvenanceService;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a temporary file with given content.
pub fn temp_file(content: &[u8]) -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let path = dir.path().join("test_file");
    std::fs::write(&path, content).expect("Failed to write temp file");
    (dir, path)
}

/// A SQLite-backed ledger living in its own temp directory.
pub struct TestLedger {
    dir: TempDir,
    config: LedgerConfig,
    service: ProvenanceService,
}

impl TestLedger {
    pub async fn new() -> Self {
        let dir = temp_dir();
        let config = LedgerConfig::with_data_dir(dir.path().join("data"));
        let service = ProvenanceService::open(&config)
            .await
            .expect("Failed to open test ledger");
        Self {
            dir,
            config,
            service,
        }
    }

    /// A second service over the same data directory, as another process
    /// would open it.
    pub async fn reopen(&self) -> ProvenanceService {
        ProvenanceService::open(&self.config)
            .await
            .expect("Failed to reopen test ledger")
    }

    pub fn service(&self) -> &ProvenanceService {
        &self.service
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Raw pool, for editing rows behind the ledger's back.
    pub fn pool(&self) -> &SqlitePool {
        self.service
            .database()
            .expect("Test ledger is SQLite-backed")
            .pool()
    }

    /// Run a statement directly against the ledger database.
    pub async fn tamper(&self, sql: &str) -> u64 {
        sqlx::query(sql)
            .execute(self.pool())
            .await
            .expect("Tamper statement failed")
            .rows_affected()
    }

    /// Write `bytes` to a file under the temp directory.
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join("incoming").join(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .expect("Failed to create incoming dir");
        }
        tokio::fs::write(&path, bytes)
            .await
            .expect("Failed to write incoming file");
        path
    }
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
        assert!(dir.path().is_dir());
    }

    #[tokio::test]
    async fn test_ledger_fixture_provisions_data_dir() {
        let ledger = TestLedger::new().await;
        let config = ledger.config();
        assert!(config.secret_key_path().exists());
        assert!(config.system_id_path().exists());
        assert!(config.database_path().exists());
    }

    #[test]
    fn test_assert_macros() {
        let ok: Result<u8, String> = Ok(3);
        assert_eq!(assert_ok!(ok), 3);
        let err: Result<u8, String> = Err("nope".into());
        assert_eq!(assert_err!(err), "nope");
    }

    proptest! {
        #[test]
        fn test_temp_file_content_roundtrip(content in prop::collection::vec(any::<u8>(), 0..512)) {
            let (_dir, path) = temp_file(&content);
            prop_assert_eq!(std::fs::read(&path).unwrap(), content);
        }
    }
}
