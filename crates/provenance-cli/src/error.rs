//! CLI error handling.

use std::io;
use std::path::PathBuf;

use provenance_common_config::ConfigError;
use provenance_common_log::LogError;
use provenance_ledger::LedgerError;
use thiserror::Error;

use crate::cli::Exit;

/// CLI error type with context for the user
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound {
        message: String,
        resource_type: String,
        resource_name: String,
    },

    #[error("{message}")]
    Ledger {
        message: String,
        #[source]
        source: LedgerError,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E001",
            Self::Io { .. } => "E002",
            Self::Validation { .. } => "E004",
            Self::NotFound { .. } => "E005",
            Self::Ledger { .. } => "E011",
            Self::Other(_) => "E999",
        }
    }

    pub fn exit(&self) -> Exit {
        match self {
            Self::Config { .. } => Exit::ConfigError,
            Self::Io { .. } => Exit::IoError,
            Self::Validation { .. } => Exit::ValidationError,
            Self::NotFound { .. } => Exit::NotFound,
            Self::Ledger { .. } => Exit::LedgerError,
            Self::Other(_) => Exit::GeneralError,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    pub fn config_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
            hint: Some(hint.into()),
        }
    }

    pub fn io_with_path(
        message: impl Into<String>,
        source: io::Error,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source,
            path: Some(path.into()),
        }
    }

    pub fn not_found(resource_type: impl Into<String>, resource_name: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        let resource_name = resource_name.into();
        Self::NotFound {
            message: format!("{resource_type} not found: {resource_name}"),
            resource_type,
            resource_name,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            path: None,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(anyhow::anyhow!("JSON serialization failed: {err}"))
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: format!("Configuration error: {err}"),
            source: Some(Box::new(err)),
            hint: Some("Check provenance.yaml and the PROV_* environment variables".to_string()),
        }
    }
}

impl From<LogError> for CliError {
    fn from(err: LogError) -> Self {
        Self::Config {
            message: format!("Cannot initialize logging: {err}"),
            source: Some(Box::new(err)),
            hint: None,
        }
    }
}

impl From<LedgerError> for CliError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::FileNotFound(id) => Self::not_found("file", id.to_string()),
            LedgerError::KeyUnavailable(_) => Self::Config {
                message: err.to_string(),
                source: Some(Box::new(err)),
                hint: Some("Check permissions on the data directory".to_string()),
            },
            LedgerError::Io(source) => Self::Io {
                message: source.to_string(),
                source,
                path: None,
            },
            other => Self::Ledger {
                message: other.to_string(),
                source: other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_common_core::FileId;

    #[test]
    fn test_file_not_found_maps_to_not_found() {
        let err = CliError::from(LedgerError::FileNotFound(FileId::new(4)));
        assert_eq!(err.exit(), Exit::NotFound);
        assert_eq!(err.to_string(), "file not found: 4");
    }

    #[test]
    fn test_config_error_has_hint() {
        let err = CliError::from(ConfigError::ValidationError {
            message: "bad".into(),
        });
        assert_eq!(err.code(), "E001");
        assert!(err.hint().is_some());
    }
}
