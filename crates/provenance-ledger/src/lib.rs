//! Tamper-evident provenance ledger.
//!
//! Every event on an uploaded file (its creation, each later
//! re-verification) is stored as a record whose `curr_hash` is the SHA-256
//! of its canonically encoded core fields, whose `prev_hash` is the previous
//! record's `curr_hash`, and whose `curr_hash` is HMAC-signed with a
//! per-deployment secret. Editing any stored record, or the file content,
//! is then detectable.
//!
//! ```no_run
//! # async fn demo() -> provenance_ledger::Result<()> {
//! use provenance_common_config::LedgerConfig;
//! use provenance_ledger::{Outcome, ProvenanceService};
//!
//! let service = ProvenanceService::open(&LedgerConfig::with_data_dir("data")).await?;
//! service.create_file_record("doc.pdf", "a1b2__doc.pdf", b"%PDF-1.7").await?;
//! let report = service.verify_upload("doc.pdf", b"%PDF-1.7").await?;
//! assert_eq!(report.outcome, Outcome::Valid);
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod error;
pub mod hasher;
pub mod keys;
pub mod ledger;
pub mod locks;
pub mod record;
pub mod service;
pub mod signer;
pub mod store;
pub mod verifier;

pub use canonical::CanonicalEncoder;
pub use error::{EncodeError, KeyError, LedgerError, Result, StorageError};
pub use hasher::ContentHasher;
pub use keys::{LedgerKeys, SecretStore, SystemIdentity, SECRET_LEN};
pub use ledger::Ledger;
pub use locks::{FileGuard, FileLocks};
pub use record::{
    Action, FileRecord, NewFile, NewRecord, ProvenanceRecord, RecordCore, RecordRow,
    GENESIS_PREV_HASH,
};
pub use service::{HistoryView, ProvenanceService};
pub use signer::Signer;
pub use store::{LedgerStore, MemoryLedgerStore, SqliteLedgerStore};
pub use verifier::{
    verify_chain, ChainStatus, ChainViolation, Outcome, VerificationReport, Verifier,
    ViolationKind,
};
