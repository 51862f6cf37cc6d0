//! Environment variable handling.

use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    /// Overrides `data_dir`.
    pub const PROV_DATA_DIR: &str = "PROV_DATA_DIR";
    /// Overrides `database.path`.
    pub const PROV_DB_PATH: &str = "PROV_DB_PATH";
    /// Overrides `uploads.max_bytes`.
    pub const PROVENANCE_UPLOAD_MAX_BYTES: &str = "PROVENANCE_UPLOAD_MAX_BYTES";
    /// Explicit config file path.
    pub const PROVENANCE_CONFIG: &str = "PROVENANCE_CONFIG";

    pub const PROVENANCE_LOG_LEVEL: &str = "PROVENANCE_LOG_LEVEL";
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from `.env` then `.env.local`.
    ///
    /// Missing files are ignored. Variables already set in the process
    /// environment are never overwritten.
    pub fn init() -> Result<Self, EnvError> {
        for name in [".env", ".env.local"] {
            match dotenvy::from_filename(name) {
                Ok(_) => {}
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self { _guard: () })
    }

    /// Get an optional, non-empty string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok().filter(|v| !v.is_empty())
    }

    /// Get a boolean variable.
    pub fn get_bool(var: &str) -> Option<bool> {
        Self::get(var).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match Self::get(var) {
            Some(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: format!("expected integer, got '{}'", v),
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ENV_LOCK;

    #[test]
    fn test_get_treats_empty_as_unset() {
        let _guard = ENV_LOCK.lock();
        env::set_var("PROVENANCE_TEST_EMPTY", "");
        assert_eq!(Environment::get("PROVENANCE_TEST_EMPTY"), None);
        env::remove_var("PROVENANCE_TEST_EMPTY");
    }

    #[test]
    fn test_bool_parsing() {
        let _guard = ENV_LOCK.lock();
        env::set_var("PROVENANCE_TEST_BOOL", "yes");
        assert_eq!(Environment::get_bool("PROVENANCE_TEST_BOOL"), Some(true));
        env::set_var("PROVENANCE_TEST_BOOL", "0");
        assert_eq!(Environment::get_bool("PROVENANCE_TEST_BOOL"), Some(false));
        env::remove_var("PROVENANCE_TEST_BOOL");
        assert_eq!(Environment::get_bool("PROVENANCE_TEST_BOOL"), None);
    }

    #[test]
    fn test_integer_parsing() {
        let _guard = ENV_LOCK.lock();
        env::set_var("PROVENANCE_TEST_INT", "42");
        let val: Option<u64> = Environment::get_int("PROVENANCE_TEST_INT").unwrap();
        assert_eq!(val, Some(42));

        env::set_var("PROVENANCE_TEST_INT", "lots");
        let err = Environment::get_int::<u64>("PROVENANCE_TEST_INT").unwrap_err();
        assert!(matches!(err, EnvError::InvalidValue { .. }));

        env::remove_var("PROVENANCE_TEST_INT");
        assert_eq!(Environment::get_int::<u64>("PROVENANCE_TEST_INT").unwrap(), None);
    }

    #[test]
    fn test_dotenv_file_loading() {
        let _guard = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "PROVENANCE_TEST_DOTENV=from_dotenv\n").unwrap();
        std::fs::write(dir.path().join(".env.local"), "PROVENANCE_TEST_LOCAL=from_local\n").unwrap();

        let original_dir = env::current_dir().unwrap();
        env::remove_var("PROVENANCE_TEST_DOTENV");
        env::remove_var("PROVENANCE_TEST_LOCAL");
        env::set_current_dir(dir.path()).unwrap();

        let result = Environment::init();
        env::set_current_dir(original_dir).unwrap();
        assert!(result.is_ok());

        assert_eq!(Environment::get("PROVENANCE_TEST_DOTENV").as_deref(), Some("from_dotenv"));
        assert_eq!(Environment::get("PROVENANCE_TEST_LOCAL").as_deref(), Some("from_local"));
        env::remove_var("PROVENANCE_TEST_DOTENV");
        env::remove_var("PROVENANCE_TEST_LOCAL");
    }
}
