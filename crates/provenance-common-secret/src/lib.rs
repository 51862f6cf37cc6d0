//! Secure secret handling.
//!
//! Key material loaded by the ledger is wrapped in [`Secret`] so it is
//! redacted in logs and debug output and wiped from memory on drop.

use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret value that is redacted in logs and debug output.
///
/// # Example
///
/// ```rust
/// use provenance_common_secret::SecretBytes;
///
/// let key = SecretBytes::new(vec![7u8; 32]);
/// assert_eq!(format!("{}", key), "[REDACTED]");
/// assert_eq!(format!("{:?}", key), "Secret([REDACTED])");
/// assert_eq!(key.expose().len(), 32);
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Create a new secret.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the secret value.
    ///
    /// Use this method sparingly and only when necessary.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize + AsRef<[u8]>> Secret<T> {
    /// Short non-reversible tag identifying this key in logs.
    ///
    /// The first 8 bytes of SHA-256 over a domain prefix and the key,
    /// hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"provenance-key-fingerprint:");
        hasher.update(self.0.as_ref());
        hex::encode(&hasher.finalize()[..8])
    }

    /// Length of the secret in bytes.
    pub fn len(&self) -> usize {
        self.0.as_ref().len()
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.as_ref().is_empty()
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl<T: Zeroize> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Raw key bytes.
pub type SecretBytes = Secret<Vec<u8>>;
