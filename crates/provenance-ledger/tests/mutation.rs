//! A single-byte edit to a stored link hash or signature is caught at
//! exactly the edited record.

use proptest::prelude::*;
use provenance_ledger::{
    verify_chain, LedgerKeys, MemoryLedgerStore, ProvenanceService, RecordRow,
    ViolationKind,
};
use std::sync::Arc;

const CHAIN_LEN: usize = 6;

fn sample_chain() -> (ProvenanceService, Vec<RecordRow>) {
    tokio_test::block_on(async {
        let svc = ProvenanceService::with_store(
            Arc::new(MemoryLedgerStore::new()),
            LedgerKeys::ephemeral().unwrap(),
        )
        .unwrap();
        let (file, _) = svc.create_file_record("p.bin", "s__p.bin", b"0").await.unwrap();
        for i in 1..CHAIN_LEN {
            svc.verify_upload("p.bin", format!("{i}").as_bytes())
                .await
                .unwrap();
        }
        let rows = svc.ledger().chain_rows(file.id).await.unwrap();
        (svc, rows)
    })
}

fn flip_hex_char(value: &mut String, pos: usize, delta: u8) {
    let digits = b"0123456789abcdef";
    let mut bytes = value.clone().into_bytes();
    let current = digits.iter().position(|d| *d == bytes[pos]).unwrap();
    let replacement = (current + 1 + (delta as usize % 15)) % 16;
    bytes[pos] = digits[replacement];
    *value = String::from_utf8(bytes).unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_curr_hash_mutation_fails_at_that_record(
        index in 0..CHAIN_LEN,
        pos in 0usize..64,
        delta in any::<u8>(),
    ) {
        let (svc, mut rows) = sample_chain();
        flip_hex_char(&mut rows[index].curr_hash, pos, delta);

        let violation = verify_chain(&rows, svc.ledger().signer()).unwrap_err();
        prop_assert_eq!(violation.index, index);
        prop_assert_eq!(violation.kind, ViolationKind::HashMismatch);
    }

    #[test]
    fn test_hmac_mutation_fails_at_that_record(
        index in 0..CHAIN_LEN,
        pos in 0usize..64,
        delta in any::<u8>(),
    ) {
        let (svc, mut rows) = sample_chain();
        flip_hex_char(&mut rows[index].record_hmac, pos, delta);

        let violation = verify_chain(&rows, svc.ledger().signer()).unwrap_err();
        prop_assert_eq!(violation.index, index);
        prop_assert_eq!(violation.kind, ViolationKind::SignatureMismatch);
    }
}

#[test]
fn test_untouched_chain_verifies() {
    let (svc, rows) = sample_chain();
    assert_eq!(rows.len(), CHAIN_LEN);
    assert!(verify_chain(&rows, svc.ledger().signer()).is_ok());
}
