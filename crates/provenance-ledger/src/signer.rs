//! HMAC-SHA256 record signatures.

use crate::error::KeyError;
use crate::keys::SecretStore;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signs and checks link hashes under the ledger secret.
pub struct Signer {
    mac: HmacSha256,
    fingerprint: String,
}

impl Signer {
    pub fn new(secret: &SecretStore) -> Result<Self, KeyError> {
        let mac = HmacSha256::new_from_slice(secret.key())
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self {
            mac,
            fingerprint: secret.fingerprint(),
        })
    }

    fn tag(&self, hash_hex: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(hash_hex.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// HMAC over the UTF-8 bytes of `hash_hex`, as lowercase hex.
    pub fn sign(&self, hash_hex: &str) -> String {
        hex::encode(self.tag(hash_hex))
    }

    /// Constant-time check of `hmac_hex` against a fresh signature. A value
    /// that is not valid hex, or has the wrong length, never matches.
    pub fn verify(&self, hash_hex: &str, hmac_hex: &str) -> bool {
        let Ok(stored) = hex::decode(hmac_hex) else {
            return false;
        };
        let expected = self.tag(hash_hex);
        if stored.len() != expected.len() {
            return false;
        }
        expected.ct_eq(stored.as_slice()).into()
    }

    /// Fingerprint of the key this signer uses.
    pub fn key_fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SECRET_LEN;
    use proptest::prelude::*;

    fn signer(byte: u8) -> Signer {
        Signer::new(&SecretStore::from_bytes(vec![byte; SECRET_LEN]).unwrap()).unwrap()
    }

    #[test]
    fn test_known_vector() {
        let s = signer(0x0b);
        let tag = s.sign("Hi There");
        assert_eq!(
            tag,
            "198a607eb44bfbc69903a0f1cf2bbdc5ba0aa3f3d9ae3c1c7a3b1696a0b68cf7"
        );
        assert!(s.verify("Hi There", &tag));
    }

    #[test]
    fn test_sign_is_deterministic_and_keyed() {
        let hash = "ab".repeat(32);
        assert_eq!(signer(1).sign(&hash), signer(1).sign(&hash));
        assert_ne!(signer(1).sign(&hash), signer(2).sign(&hash));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let hash = "ab".repeat(32);
        let tag = signer(1).sign(&hash);
        assert!(!signer(2).verify(&hash, &tag));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let s = signer(1);
        let hash = "ab".repeat(32);
        assert!(!s.verify(&hash, "not hex"));
        assert!(!s.verify(&hash, ""));
        assert!(!s.verify(&hash, &s.sign(&hash)[..62]));
    }

    #[test]
    fn test_uppercase_hex_still_matches() {
        let s = signer(1);
        let hash = "ab".repeat(32);
        assert!(s.verify(&hash, &s.sign(&hash).to_uppercase()));
    }

    proptest! {
        #[test]
        fn test_single_byte_mutation_fails(pos in 0usize..64, replacement in "[0-9a-f]") {
            let s = signer(7);
            let hash = "cd".repeat(32);
            let tag = s.sign(&hash);
            let mut mutated: Vec<char> = tag.chars().collect();
            let new_char = replacement.chars().next().unwrap();
            prop_assume!(mutated[pos] != new_char);
            mutated[pos] = new_char;
            let mutated: String = mutated.into_iter().collect();
            prop_assert!(!s.verify(&hash, &mutated));
        }
    }
}
