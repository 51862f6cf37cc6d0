//! Secret key and system identity provisioning.
//!
//! Both files are created once with create-if-absent semantics: content is
//! written to a private temp file in the target directory and then linked
//! into place without clobbering. Concurrent first starts therefore all
//! converge on whichever file landed first.

use crate::error::KeyError;
use provenance_common_secret::SecretBytes;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Length of the HMAC secret in bytes.
pub const SECRET_LEN: usize = 32;

const IDENTITY_PREFIX: &str = "host-";

fn random_bytes<const N: usize>() -> Result<[u8; N], KeyError> {
    let mut buf = [0u8; N];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| KeyError::Entropy(e.to_string()))?;
    Ok(buf)
}

/// Write `contents` to `path` unless it already exists.
///
/// Returns `true` if this call created the file.
fn create_if_absent(path: &Path, contents: &[u8]) -> Result<bool, KeyError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| KeyError::io(parent, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".provenance-")
        .tempfile_in(parent)
        .map_err(|e| KeyError::io(parent, e))?;
    restrict_permissions(tmp.path())?;
    tmp.write_all(contents).map_err(|e| KeyError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| KeyError::io(tmp.path().to_path_buf(), e))?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(KeyError::io(path, e.error)),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| KeyError::io(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), KeyError> {
    Ok(())
}

#[cfg(unix)]
fn warn_if_exposed(path: &Path, meta: &fs::Metadata) {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    if mode & 0o077 != 0 {
        warn!(path = %path.display(), mode = %format!("{:o}", mode & 0o777), "Secret key file is readable by other users");
    }
}

#[cfg(not(unix))]
fn warn_if_exposed(_path: &Path, _meta: &fs::Metadata) {}

/// Owns the long-lived HMAC secret.
pub struct SecretStore {
    key: SecretBytes,
    path: Option<PathBuf>,
}

impl SecretStore {
    /// Load the secret at `path`, generating it first if absent.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        if !path.exists() {
            let key = SecretBytes::new(random_bytes::<SECRET_LEN>()?.to_vec());
            if create_if_absent(path, key.expose())? {
                info!(path = %path.display(), fingerprint = %key.fingerprint(), "Generated ledger secret");
                return Ok(Self {
                    key,
                    path: Some(path.to_path_buf()),
                });
            }
        }
        Self::load(path)
    }

    /// Load an existing secret. It must be exactly [`SECRET_LEN`] bytes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| KeyError::io(path, e))?;
        if meta.len() != SECRET_LEN as u64 {
            return Err(KeyError::WrongLength {
                path: path.to_path_buf(),
                expected: SECRET_LEN,
                actual: meta.len() as usize,
            });
        }
        warn_if_exposed(path, &meta);

        let key = SecretBytes::new(fs::read(path).map_err(|e| KeyError::io(path, e))?);
        if key.len() != SECRET_LEN {
            return Err(KeyError::WrongLength {
                path: path.to_path_buf(),
                expected: SECRET_LEN,
                actual: key.len(),
            });
        }
        Ok(Self {
            key,
            path: Some(path.to_path_buf()),
        })
    }

    /// A secret held only in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyError> {
        let key = SecretBytes::new(bytes);
        if key.len() != SECRET_LEN {
            return Err(KeyError::InvalidKey(format!(
                "expected {} bytes, got {}",
                SECRET_LEN,
                key.len()
            )));
        }
        Ok(Self { key, path: None })
    }

    /// A fresh random in-memory secret.
    pub fn generate() -> Result<Self, KeyError> {
        Self::from_bytes(random_bytes::<SECRET_LEN>()?.to_vec())
    }

    pub(crate) fn key(&self) -> &[u8] {
        self.key.expose()
    }

    /// Non-reversible tag safe to log.
    pub fn fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("key", &self.key)
            .field("path", &self.path)
            .finish()
    }
}

/// Stable identifier of this ledger installation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SystemIdentity(String);

impl SystemIdentity {
    /// Load the identity at `path`, generating `host-<16 hex>` if absent.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        if !path.exists() {
            let generated = Self::generate()?;
            if create_if_absent(path, generated.0.as_bytes())? {
                info!(path = %path.display(), system_id = %generated, "Generated system identity");
                return Ok(generated);
            }
        }
        Self::load(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| KeyError::io(path, e))?;
        let id = raw.trim();
        if id.is_empty() {
            return Err(KeyError::EmptyIdentity {
                path: path.to_path_buf(),
            });
        }
        Ok(Self(id.to_string()))
    }

    pub fn generate() -> Result<Self, KeyError> {
        Ok(Self(format!(
            "{}{}",
            IDENTITY_PREFIX,
            hex::encode(random_bytes::<8>()?)
        )))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The process-wide key material a ledger is built from.
#[derive(Debug)]
pub struct LedgerKeys {
    pub secret: SecretStore,
    pub identity: SystemIdentity,
}

impl LedgerKeys {
    /// Load or create both files.
    pub fn provision(
        secret_path: impl AsRef<Path>,
        identity_path: impl AsRef<Path>,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            secret: SecretStore::load_or_create(secret_path)?,
            identity: SystemIdentity::load_or_create(identity_path)?,
        })
    }

    /// Random in-memory keys.
    pub fn ephemeral() -> Result<Self, KeyError> {
        Ok(Self {
            secret: SecretStore::generate()?,
            identity: SystemIdentity::generate()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_created_once_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys/hmac_secret.key");

        let first = SecretStore::load_or_create(&path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), SECRET_LEN as u64);
        let second = SecretStore::load_or_create(&path).unwrap();
        assert_eq!(first.key(), second.key());
    }

    #[cfg(unix)]
    #[test]
    fn test_secret_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hmac_secret.key");
        SecretStore::load_or_create(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_wrong_length_secret_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hmac_secret.key");
        fs::write(&path, [1u8; 16]).unwrap();

        match SecretStore::load_or_create(&path) {
            Err(KeyError::WrongLength { expected, actual, .. }) => {
                assert_eq!(expected, SECRET_LEN);
                assert_eq!(actual, 16);
            }
            other => panic!("expected WrongLength, got {:?}", other),
        }
    }

    #[test]
    fn test_existing_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_id.txt");
        fs::write(&path, "host-existing\n").unwrap();
        assert!(!create_if_absent(&path, b"host-other").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "host-existing\n");
    }

    #[test]
    fn test_concurrent_provisioning_converges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hmac_secret.key");

        let keys: Vec<Vec<u8>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| SecretStore::load_or_create(&path).unwrap().key().to_vec()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_identity_format_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_id.txt");

        let id = SystemIdentity::load_or_create(&path).unwrap();
        assert!(id.as_str().starts_with("host-"));
        assert_eq!(id.as_str().len(), "host-".len() + 16);
        assert_eq!(SystemIdentity::load_or_create(&path).unwrap(), id);
    }

    #[test]
    fn test_identity_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_id.txt");
        fs::write(&path, "  host-custom \n").unwrap();
        assert_eq!(SystemIdentity::load(&path).unwrap().as_str(), "host-custom");
    }

    #[test]
    fn test_empty_identity_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_id.txt");
        fs::write(&path, "\n").unwrap();
        assert!(matches!(
            SystemIdentity::load_or_create(&path),
            Err(KeyError::EmptyIdentity { .. })
        ));
    }

    #[test]
    fn test_debug_never_shows_key() {
        let store = SecretStore::from_bytes(vec![0x41; SECRET_LEN]).unwrap();
        let rendered = format!("{:?}", store);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("65, 65"));
    }

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(matches!(
            SecretStore::from_bytes(vec![0; 31]),
            Err(KeyError::InvalidKey(_))
        ));
    }
}
