//! SHA-256 content hashing.

use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read size for streamed hashing.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// SHA-256 over buffers and streams, rendered as lowercase hex.
pub struct ContentHasher;

impl ContentHasher {
    pub fn hash_bytes(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Hash a reader in fixed-size chunks.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn hash_file(path: impl AsRef<Path>) -> io::Result<String> {
        Self::hash_reader(std::fs::File::open(path)?)
    }

    pub async fn hash_async_reader<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Streamed hash of a file without blocking the runtime.
    pub async fn hash_file_async(path: impl AsRef<Path>) -> io::Result<String> {
        let file = tokio::fs::File::open(path).await?;
        Self::hash_async_reader(file).await
    }

    /// Whether `s` looks like a digest produced by this hasher.
    pub fn is_digest(s: &str) -> bool {
        s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}
