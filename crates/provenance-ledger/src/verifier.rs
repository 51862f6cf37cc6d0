//! Chain integrity checks and re-submission classification.

use crate::canonical::CanonicalEncoder;
use crate::error::{LedgerError, Result, StorageError};
use crate::hasher::ContentHasher;
use crate::ledger::Ledger;
use crate::record::{Action, ProvenanceRecord, RecordRow, GENESIS_PREV_HASH};
use crate::signer::Signer;
use provenance_common_core::{FileId, RecordId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Why a chain walk stopped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationKind {
    /// The chain is empty, or its first record does not start at GENESIS.
    MissingGenesis,
    /// `prev_hash` differs from the preceding record's `curr_hash`.
    BrokenLink,
    /// The stored `curr_hash` is not the hash of the record's core fields.
    HashMismatch,
    SignatureMismatch,
    /// The stored core fields cannot be decoded.
    Malformed,
}

/// The first failing record of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainViolation {
    /// Position in the chain, 0-based.
    pub index: usize,
    /// `None` when the failure is not tied to a record: the chain is empty
    /// or the file row itself does not decode.
    pub record_id: Option<RecordId>,
    pub kind: ViolationKind,
    pub detail: String,
}

impl fmt::Display for ChainViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_id {
            Some(id) => write!(
                f,
                "{} at position {} (record {}): {}",
                self.kind, self.index, id, self.detail
            ),
            None => write!(f, "{}: {}", self.kind, self.detail),
        }
    }
}

/// Walk `rows` from GENESIS, checking link, hash and signature of every
/// record. Stops at the first failure. On success returns the chain head.
pub fn verify_chain<'a>(
    rows: &'a [RecordRow],
    signer: &Signer,
) -> std::result::Result<&'a RecordRow, ChainViolation> {
    let mut expected_prev: &str = GENESIS_PREV_HASH;

    for (index, row) in rows.iter().enumerate() {
        let violation = |kind, detail: String| ChainViolation {
            index,
            record_id: Some(RecordId::new(row.id)),
            kind,
            detail,
        };

        let core = row
            .core()
            .map_err(|e| violation(ViolationKind::Malformed, e.detail))?;

        if core.prev_hash != expected_prev {
            let kind = if index == 0 {
                ViolationKind::MissingGenesis
            } else {
                ViolationKind::BrokenLink
            };
            return Err(violation(
                kind,
                format!("prev_hash {} does not follow {}", core.prev_hash, expected_prev),
            ));
        }

        let recomputed = CanonicalEncoder::link_hash(&core)
            .map_err(|e| violation(ViolationKind::Malformed, e.to_string()))?;
        if recomputed != row.curr_hash {
            return Err(violation(
                ViolationKind::HashMismatch,
                format!("stored {} but fields hash to {}", row.curr_hash, recomputed),
            ));
        }

        if !signer.verify(&row.curr_hash, &row.record_hmac) {
            return Err(violation(
                ViolationKind::SignatureMismatch,
                "record_hmac does not match curr_hash".to_string(),
            ));
        }

        expected_prev = row.curr_hash.as_str();
    }

    debug!(length = rows.len(), "Chain walk complete");
    rows.last().ok_or_else(|| ChainViolation {
        index: 0,
        record_id: None,
        kind: ViolationKind::MissingGenesis,
        detail: "chain has no records".to_string(),
    })
}

/// Result of a non-appending integrity walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub file_id: FileId,
    pub length: usize,
    pub violation: Option<ChainViolation>,
}

impl ChainStatus {
    pub fn is_intact(&self) -> bool {
        self.violation.is_none()
    }
}

/// Classification of a re-submitted file.
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
pub enum Outcome {
    Valid,
    TamperedFile,
    TamperedDb,
    Unknown,
}

/// Everything learned while classifying one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub outcome: Outcome,
    pub reason: String,
    pub file_id: Option<FileId>,
    /// Latest recorded hash, only when the chain was trusted.
    pub expected_hash: Option<String>,
    pub observed_hash: String,
    /// The VERIFY record written by this check.
    pub appended: Option<ProvenanceRecord>,
    pub violation: Option<ChainViolation>,
}

impl VerificationReport {
    fn unknown(observed_hash: String, reason: String) -> Self {
        Self {
            outcome: Outcome::Unknown,
            reason,
            file_id: None,
            expected_hash: None,
            observed_hash,
            appended: None,
            violation: None,
        }
    }

    fn tampered_db(file_id: FileId, observed_hash: String, violation: ChainViolation) -> Self {
        warn!(%file_id, %violation, "Verification outcome TAMPERED_DB");
        Self {
            outcome: Outcome::TamperedDb,
            reason: format!("ledger chain failed integrity check: {violation}"),
            file_id: Some(file_id),
            expected_hash: None,
            observed_hash,
            appended: None,
            violation: Some(violation),
        }
    }
}

/// Lookup key for a submission.
enum Target<'a> {
    Name(&'a str),
    Id(FileId),
}

/// How many times a verification re-walks the chain when another writer
/// moves its head between the walk and the VERIFY insert.
const MAX_VERIFY_ATTEMPTS: u32 = 16;

/// Classifies re-submitted content against a file's chain.
#[derive(Clone)]
pub struct Verifier {
    ledger: Arc<Ledger>,
}

impl Verifier {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Classify `bytes` against the most recent file named `filename`.
    pub async fn check(&self, filename: &str, bytes: &[u8]) -> Result<VerificationReport> {
        self.check_hash(filename, &ContentHasher::hash_bytes(bytes))
            .await
    }

    /// Classify `bytes` against an explicit file id.
    pub async fn check_by_id(&self, file_id: FileId, bytes: &[u8]) -> Result<VerificationReport> {
        self.check_hash_by_id(file_id, &ContentHasher::hash_bytes(bytes))
            .await
    }

    /// Classify an already computed content hash.
    pub async fn check_hash(&self, filename: &str, observed: &str) -> Result<VerificationReport> {
        self.classify(Target::Name(filename), observed).await
    }

    pub async fn check_hash_by_id(
        &self,
        file_id: FileId,
        observed: &str,
    ) -> Result<VerificationReport> {
        self.classify(Target::Id(file_id), observed).await
    }

    async fn resolve(&self, target: &Target<'_>) -> Result<Option<FileId>> {
        match target {
            Target::Name(name) => self.ledger.file_id_by_name(name).await,
            Target::Id(id) => Ok(self.ledger.file_exists(*id).await?.then_some(*id)),
        }
    }

    /// The `files` row is not chained, but a row that no longer decodes
    /// has been written to outside the ledger.
    async fn file_row_violation(&self, file_id: FileId) -> Result<Option<ChainViolation>> {
        match self.ledger.file(file_id).await {
            Ok(_) => Ok(None),
            Err(LedgerError::Storage(StorageError::Decode { message, .. })) => {
                Ok(Some(ChainViolation {
                    index: 0,
                    record_id: None,
                    kind: ViolationKind::Malformed,
                    detail: format!("file row {file_id}: {message}"),
                }))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, target))]
    async fn classify(&self, target: Target<'_>, observed: &str) -> Result<VerificationReport> {
        if !ContentHasher::is_digest(observed) {
            return Err(LedgerError::InvalidDigest(observed.to_string()));
        }
        let observed = observed.to_string();

        let Some(file_id) = self.resolve(&target).await? else {
            let reason = match target {
                Target::Name(name) => format!("no file named '{name}' is registered"),
                Target::Id(id) => format!("no file with id {id} is registered"),
            };
            info!(%reason, "Verification outcome UNKNOWN");
            return Ok(VerificationReport::unknown(observed, reason));
        };

        if let Some(violation) = self.file_row_violation(file_id).await? {
            return Ok(VerificationReport::tampered_db(file_id, observed, violation));
        }

        // Held from the chain read until the VERIFY record is written. The
        // insert itself is conditional on the walked head, which covers
        // writers in other processes.
        let guard = self.ledger.lock(file_id).await;
        for attempt in 1..=MAX_VERIFY_ATTEMPTS {
            let rows = self.ledger.chain_rows(file_id).await?;
            let head = match verify_chain(&rows, self.ledger.signer()) {
                Ok(head) => head,
                Err(violation) => {
                    return Ok(VerificationReport::tampered_db(file_id, observed, violation));
                }
            };

            if head.system_id != self.ledger.identity().as_str() {
                warn!(
                    %file_id,
                    recorded = %head.system_id,
                    local = %self.ledger.identity(),
                    "Chain head was written by another system"
                );
            }
            let expected = head.file_hash.clone();

            let Some(appended) = self
                .ledger
                .append_after(&guard, head, Action::Verify, &observed)
                .await?
            else {
                debug!(attempt, "Chain head moved during verification, re-walking");
                continue;
            };
            drop(guard);

            let (outcome, reason) = if observed == expected {
                (
                    Outcome::Valid,
                    "content matches the latest recorded hash".to_string(),
                )
            } else {
                (
                    Outcome::TamperedFile,
                    "content differs from the latest recorded hash".to_string(),
                )
            };

            if outcome == Outcome::Valid {
                info!(%file_id, "Verification outcome VALID");
            } else {
                warn!(%file_id, %expected, %observed, "Verification outcome TAMPERED_FILE");
            }

            return Ok(VerificationReport {
                outcome,
                reason,
                file_id: Some(file_id),
                expected_hash: Some(expected),
                observed_hash: observed,
                appended: Some(appended),
                violation: None,
            });
        }

        Err(StorageError::Contention {
            file_id,
            attempts: MAX_VERIFY_ATTEMPTS,
        }
        .into())
    }

    /// Integrity walk without appending anything.
    pub async fn chain_status(&self, file_id: FileId) -> Result<ChainStatus> {
        if !self.ledger.file_exists(file_id).await? {
            return Err(LedgerError::FileNotFound(file_id));
        }
        let rows = self.ledger.chain_rows(file_id).await?;
        let violation = verify_chain(&rows, self.ledger.signer()).err();
        Ok(ChainStatus {
            file_id,
            length: rows.len(),
            violation,
        })
    }
}
