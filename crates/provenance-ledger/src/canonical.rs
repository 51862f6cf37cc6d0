//! Canonical record encoding.
//!
//! The writer and the verifier both hash the output of [`CanonicalEncoder`];
//! it is the only place core fields are turned into bytes.
//!
//! Layout: a compact JSON object with keys in lexicographic order
//! (`action`, `file_hash`, `file_id`, `prev_hash`, `system_id`,
//! `timestamp`), `file_id` as an integer and every other value as a string.

use crate::error::EncodeError;
use crate::hasher::ContentHasher;
use crate::record::RecordCore;
use serde::Serialize;

/// Field order here is the wire order.
#[derive(Serialize)]
struct CanonicalCore<'a> {
    action: &'a str,
    file_hash: &'a str,
    file_id: i64,
    prev_hash: &'a str,
    system_id: &'a str,
    timestamp: String,
}

pub struct CanonicalEncoder;

impl CanonicalEncoder {
    pub fn encode(core: &RecordCore) -> Result<Vec<u8>, EncodeError> {
        let canonical = CanonicalCore {
            action: core.action.as_ref(),
            file_hash: &core.file_hash,
            file_id: core.file_id.get(),
            prev_hash: &core.prev_hash,
            system_id: &core.system_id,
            timestamp: core.timestamp.to_canonical(),
        };
        Ok(serde_json::to_vec(&canonical)?)
    }

    /// SHA-256 of the canonical encoding: a record's `curr_hash`.
    pub fn link_hash(core: &RecordCore) -> Result<String, EncodeError> {
        Ok(ContentHasher::hash_bytes(&Self::encode(core)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Action, GENESIS_PREV_HASH};
    use proptest::prelude::*;
    use provenance_common_core::{FileId, Timestamp};

    fn core() -> RecordCore {
        RecordCore {
            file_id: FileId::new(3),
            action: Action::Create,
            file_hash: "ab".repeat(32),
            prev_hash: GENESIS_PREV_HASH.to_string(),
            timestamp: Timestamp::parse_canonical("2024-01-02T03:04:05.000006Z").unwrap(),
            system_id: "host-a1b2c3d4e5f60718".to_string(),
        }
    }

    #[test]
    fn test_exact_layout() {
        let encoded = String::from_utf8(CanonicalEncoder::encode(&core()).unwrap()).unwrap();
        let expected = format!(
            concat!(
                r#"{{"action":"CREATE","file_hash":"{}","file_id":3,"#,
                r#""prev_hash":"GENESIS","system_id":"host-a1b2c3d4e5f60718","#,
                r#""timestamp":"2024-01-02T03:04:05.000006Z"}}"#
            ),
            "ab".repeat(32)
        );
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_every_field_is_covered() {
        let base = CanonicalEncoder::link_hash(&core()).unwrap();

        let mut c = core();
        c.file_id = FileId::new(4);
        assert_ne!(CanonicalEncoder::link_hash(&c).unwrap(), base);

        let mut c = core();
        c.action = Action::Verify;
        assert_ne!(CanonicalEncoder::link_hash(&c).unwrap(), base);

        let mut c = core();
        c.file_hash = "cd".repeat(32);
        assert_ne!(CanonicalEncoder::link_hash(&c).unwrap(), base);

        let mut c = core();
        c.prev_hash = "ef".repeat(32);
        assert_ne!(CanonicalEncoder::link_hash(&c).unwrap(), base);

        let mut c = core();
        c.system_id = "host-other".to_string();
        assert_ne!(CanonicalEncoder::link_hash(&c).unwrap(), base);

        let mut c = core();
        c.timestamp = Timestamp::parse_canonical("2024-01-02T03:04:05.000007Z").unwrap();
        assert_ne!(CanonicalEncoder::link_hash(&c).unwrap(), base);
    }

    #[test]
    fn test_strings_are_escaped() {
        let mut c = core();
        c.system_id = "host-\"quoted\"\n".to_string();
        let encoded = CanonicalEncoder::encode(&c).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(parsed["system_id"], "host-\"quoted\"\n");
    }

    proptest! {
        #[test]
        fn test_encoding_is_deterministic(
            file_id in 1i64..i64::MAX,
            file_hash in "[0-9a-f]{64}",
            system_id in "\\PC{0,40}",
            verify in any::<bool>(),
        ) {
            let c = RecordCore {
                file_id: FileId::new(file_id),
                action: if verify { Action::Verify } else { Action::Create },
                file_hash,
                prev_hash: GENESIS_PREV_HASH.to_string(),
                timestamp: Timestamp::now(),
                system_id,
            };
            let copy = c.clone();
            prop_assert_eq!(
                CanonicalEncoder::encode(&c).unwrap(),
                CanonicalEncoder::encode(&copy).unwrap()
            );
            let decoded: serde_json::Value =
                serde_json::from_slice(&CanonicalEncoder::encode(&c).unwrap()).unwrap();
            prop_assert_eq!(decoded["file_id"].as_i64(), Some(file_id));
        }
    }
}
