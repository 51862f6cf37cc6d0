//! Common test utilities for CLI testing.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

/// A project directory whose ledger lives under `data/`.
pub struct TestContext {
    pub temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a provenance.yaml into the project directory.
    pub fn with_config(self, yaml: &str) -> Self {
        std::fs::write(self.path().join("provenance.yaml"), yaml).expect("Failed to write config");
        self
    }

    /// Write a file outside the data directory.
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path().join("incoming").join(name);
        std::fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
        std::fs::write(&path, bytes).expect("Failed to write file");
        path
    }

    pub fn database(&self) -> PathBuf {
        self.path().join("data").join("provenance.db")
    }

    /// A `provenance` command pointed at this project.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("provenance").expect("Binary not found");
        cmd.current_dir(self.path())
            .env("PROVENANCE_CONFIG", self.path())
            .env_remove("PROV_DATA_DIR")
            .env_remove("PROV_DB_PATH")
            .env_remove("PROVENANCE_UPLOAD_MAX_BYTES")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }

    /// Run a command with `--format json` and parse stdout.
    pub fn json(&self, args: &[&str]) -> (i32, serde_json::Value) {
        let output = self
            .command()
            .args(args)
            .args(["--format", "json"])
            .output()
            .expect("Failed to run");
        let value = serde_json::from_slice(&output.stdout).unwrap_or(serde_json::Value::Null);
        (output.status.code().unwrap_or(-1), value)
    }
}
