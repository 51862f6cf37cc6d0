//! Copies incoming files into the uploads directory.

use std::path::{Path, PathBuf};

use provenance_common_config::LedgerConfig;
use rand::RngCore;
use tracing::debug;

use crate::error::CliError;

/// Reduce a user-supplied name to `[A-Za-z0-9._-]` with no leading dots.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// `<16 hex>__<name>`, unique per upload.
pub fn stored_name(sanitized: &str) -> String {
    let mut token = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut token);
    format!("{}__{}", hex::encode(token), sanitized)
}

/// Copy `source` into the configured uploads directory. Returns the
/// destination path.
pub async fn store_upload(
    config: &LedgerConfig,
    source: &Path,
    name: &str,
) -> Result<PathBuf, CliError> {
    let sanitized = sanitize_filename(name)
        .ok_or_else(|| CliError::validation(format!("'{name}' is not a usable file name")))?;

    let metadata = tokio::fs::metadata(source)
        .await
        .map_err(|e| CliError::io_with_path("Cannot read upload", e, source))?;
    if !metadata.is_file() {
        return Err(CliError::validation(format!(
            "{} is not a regular file",
            source.display()
        )));
    }
    if metadata.len() > config.uploads.max_bytes {
        return Err(CliError::validation(format!(
            "{} is {} bytes, the limit is {}",
            source.display(),
            metadata.len(),
            config.uploads.max_bytes
        )));
    }

    let dir = config.upload_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| CliError::io_with_path("Cannot create uploads directory", e, &dir))?;
    let dest = dir.join(stored_name(&sanitized));
    tokio::fs::copy(source, &dest)
        .await
        .map_err(|e| CliError::io_with_path("Cannot store upload", e, &dest))?;

    debug!(dest = %dest.display(), "Upload stored");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_filename("doc.pdf").as_deref(), Some("doc.pdf"));
        assert_eq!(
            sanitize_filename("my report (v2).pdf").as_deref(),
            Some("my_report__v2_.pdf")
        );
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename(".bashrc").as_deref(), Some("bashrc"));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename("???"), None);
    }

    #[test]
    fn test_stored_name_shape() {
        let name = stored_name("doc.pdf");
        let (token, rest) = name.split_once("__").unwrap();
        assert_eq!(token.len(), 16);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "doc.pdf");
        assert_ne!(stored_name("doc.pdf"), name);
    }

    #[tokio::test]
    async fn test_store_upload_enforces_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LedgerConfig::with_data_dir(dir.path().join("data"));
        config.uploads.max_bytes = 4;

        let source = dir.path().join("big.bin");
        std::fs::write(&source, b"12345").unwrap();
        let err = store_upload(&config, &source, "big.bin").await.unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));

        std::fs::write(&source, b"1234").unwrap();
        let dest = store_upload(&config, &source, "big.bin").await.unwrap();
        assert!(dest.starts_with(config.upload_dir()));
        assert_eq!(std::fs::read(dest).unwrap(), b"1234");
    }
}
