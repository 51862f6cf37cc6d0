//! Ledger schema.
//!
//! Both tables use `AUTOINCREMENT` ids so insertion order equals id order
//! and ids are never reused.

use crate::migration::Migration;

pub const FILES_TABLE: &str = "files";
pub const PROVENANCE_TABLE: &str = "provenance";

/// Ordered ledger migrations.
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "create_files",
            r#"CREATE TABLE files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                stored_path TEXT NOT NULL,
                original_hash TEXT NOT NULL,
                upload_time TEXT NOT NULL,
                system_id TEXT NOT NULL
            )"#,
        ),
        Migration::new(
            2,
            "create_provenance",
            r#"CREATE TABLE provenance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id INTEGER NOT NULL REFERENCES files(id),
                action TEXT NOT NULL,
                file_hash TEXT NOT NULL,
                prev_hash TEXT NOT NULL,
                curr_hash TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                system_id TEXT NOT NULL,
                record_hmac TEXT NOT NULL
            )"#,
        ),
        Migration::new(
            3,
            "index_files_filename",
            "CREATE INDEX idx_files_filename ON files(filename, id)",
        ),
        Migration::new(
            4,
            "index_provenance_file_id",
            "CREATE INDEX idx_provenance_file_id ON provenance(file_id, id)",
        ),
    ]
}
