//! Configuration file loading and parsing.

use crate::env::{vars, EnvError, Environment};
use crate::types::LedgerConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "provenance.yaml";

const ENV_REF_PATTERN: &str = r"\$\{([^}:]+)(?::-([^}]*))?\}";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the config file this loader reads by default.
    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_FILE_NAME)
    }

    /// Load `provenance.yaml` from the project directory.
    ///
    /// A missing file yields defaults. Environment overrides are applied
    /// either way, then the result is validated.
    pub fn load(&self) -> Result<LedgerConfig, ConfigError> {
        let config_path = self.config_path();
        let config = if config_path.exists() {
            self.parse_file(&config_path)?
        } else {
            LedgerConfig::default()
        };
        self.finish(config)
    }

    /// Load an explicit config file. Unlike [`load`](Self::load), the file
    /// must exist.
    pub fn load_from(&self, path: impl AsRef<Path>) -> Result<LedgerConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let config = self.parse_file(path)?;
        self.finish(config)
    }

    fn parse_file(&self, path: &Path) -> Result<LedgerConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&contents)?;

        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    }

    fn finish(&self, mut config: LedgerConfig) -> Result<LedgerConfig, ConfigError> {
        apply_env_overrides(&mut config)?;
        if config.data_dir.is_relative() {
            config.data_dir = self.base_path.join(&config.data_dir);
        }
        if let Some(file) = config.log.file.as_mut() {
            if file.is_relative() {
                *file = self.base_path.join(&*file);
            }
        }
        validate(&config)?;
        Ok(config)
    }

    /// Save configuration to `provenance.yaml`.
    pub fn save(&self, config: &LedgerConfig) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.base_path)?;

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(self.config_path(), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(ENV_REF_PATTERN).map_err(|e| ConfigError::ValidationError {
        message: e.to_string(),
    })?;

    let mut result = String::with_capacity(content.len());
    let mut last = 0;
    for cap in re.captures_iter(content) {
        let Some(whole) = cap.get(0) else { continue };
        let var_name = &cap[1];
        let value = match std::env::var(var_name) {
            Ok(v) => v,
            Err(_) => match cap.get(2) {
                Some(d) => d.as_str().to_string(),
                None => {
                    return Err(ConfigError::EnvVarNotFound {
                        var: var_name.to_string(),
                    })
                }
            },
        };
        result.push_str(&content[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&content[last..]);

    Ok(result)
}

/// Apply `PROV_DATA_DIR`, `PROV_DB_PATH` and `PROVENANCE_UPLOAD_MAX_BYTES`.
pub fn apply_env_overrides(config: &mut LedgerConfig) -> Result<(), ConfigError> {
    if let Some(dir) = Environment::get(vars::PROV_DATA_DIR) {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(db) = Environment::get(vars::PROV_DB_PATH) {
        config.database.path = PathBuf::from(db);
    }
    if let Some(max) = Environment::get_int::<u64>(vars::PROVENANCE_UPLOAD_MAX_BYTES)? {
        config.uploads.max_bytes = max;
    }
    config.log.apply_env();
    Ok(())
}

/// Validate configuration values.
pub fn validate(config: &LedgerConfig) -> Result<(), ConfigError> {
    let invalid = |message: &str| {
        Err(ConfigError::ValidationError {
            message: message.to_string(),
        })
    };

    if config.data_dir.as_os_str().is_empty() {
        return invalid("data_dir must not be empty");
    }
    if config.database.path.as_os_str().is_empty() {
        return invalid("database.path must not be empty");
    }
    if config.database.max_connections == 0 {
        return invalid("database.max_connections must be at least 1");
    }
    if config.keys.secret_key_file.as_os_str().is_empty() {
        return invalid("keys.secret_key_file must not be empty");
    }
    if config.keys.system_id_file.as_os_str().is_empty() {
        return invalid("keys.system_id_file must not be empty");
    }
    if config.uploads.dir.as_os_str().is_empty() {
        return invalid("uploads.dir must not be empty");
    }
    if config.uploads.max_bytes == 0 {
        return invalid("uploads.max_bytes must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{clear_overrides, ENV_LOCK};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_defaults_when_no_file() {
        let _guard = ENV_LOCK.lock();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(config.data_dir, dir.path().join("data"));
        assert_eq!(config.database_path(), dir.path().join("data/provenance.db"));
        assert_eq!(config.secret_key_path(), dir.path().join("data/hmac_secret.key"));
        assert_eq!(config.system_id_path(), dir.path().join("data/system_id.txt"));
        assert_eq!(config.upload_dir(), dir.path().join("data/uploads"));
        assert_eq!(config.uploads.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_config_from_yaml_file() {
        let _guard = ENV_LOCK.lock();
        clear_overrides();
        let dir = tempdir().unwrap();
        let content = r#"
data_dir: ledger
database:
  path: /var/lib/provenance/ledger.db
  max_connections: 2
uploads:
  max_bytes: 1024
log:
  level: debug
"#;
        fs::write(dir.path().join(CONFIG_FILE_NAME), content).unwrap();

        let config = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(config.data_dir, dir.path().join("ledger"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/provenance/ledger.db")
        );
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.uploads.max_bytes, 1024);
        assert_eq!(config.log.level, provenance_common_log::LogLevel::Debug);
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert!(config.database.wal_mode);
    }

    #[test]
    fn test_env_var_expansion() {
        let _guard = ENV_LOCK.lock();
        std::env::set_var("PROVENANCE_TEST_EXPAND", "value");
        assert_eq!(
            expand_env_vars("a: ${PROVENANCE_TEST_EXPAND}-${PROVENANCE_TEST_EXPAND}").unwrap(),
            "a: value-value"
        );
        std::env::remove_var("PROVENANCE_TEST_EXPAND");
    }

    #[test]
    fn test_env_var_default() {
        let _guard = ENV_LOCK.lock();
        let result = expand_env_vars("key: ${PROVENANCE_NONEXISTENT:-fallback}").unwrap();
        assert_eq!(result, "key: fallback");
    }

    #[test]
    fn test_env_var_missing_error() {
        let _guard = ENV_LOCK.lock();
        match expand_env_vars("key: ${PROVENANCE_MISSING_VAR}") {
            Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "PROVENANCE_MISSING_VAR"),
            other => panic!("expected EnvVarNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let _guard = ENV_LOCK.lock();
        clear_overrides();
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "data_dir: from_file\n").unwrap();

        let override_dir = dir.path().join("override");
        std::env::set_var(vars::PROV_DATA_DIR, &override_dir);
        std::env::set_var(vars::PROV_DB_PATH, "alt.db");
        std::env::set_var(vars::PROVENANCE_UPLOAD_MAX_BYTES, "2048");

        let result = ConfigLoader::new(dir.path()).load();
        clear_overrides();

        let config = result.unwrap();
        assert_eq!(config.data_dir, override_dir);
        assert_eq!(config.database_path(), override_dir.join("alt.db"));
        assert_eq!(config.uploads.max_bytes, 2048);
    }

    #[test]
    fn test_bad_upload_limit_override() {
        let _guard = ENV_LOCK.lock();
        clear_overrides();
        std::env::set_var(vars::PROVENANCE_UPLOAD_MAX_BYTES, "ten megs");
        let dir = tempdir().unwrap();
        let result = ConfigLoader::new(dir.path()).load();
        clear_overrides();
        assert!(matches!(result, Err(ConfigError::Env(EnvError::InvalidValue { .. }))));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = LedgerConfig::default();
        config.database.max_connections = 0;
        match validate(&config) {
            Err(ConfigError::ValidationError { message }) => {
                assert!(message.contains("max_connections"))
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }

        let mut config = LedgerConfig::default();
        config.uploads.max_bytes = 0;
        assert!(validate(&config).is_err());

        let mut config = LedgerConfig::default();
        config.keys.secret_key_file = PathBuf::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_parse_error_with_line_number() {
        let _guard = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "database:\n  path: x.db\n  max_connections: [unclosed\n",
        )
        .unwrap();

        match ConfigLoader::new(dir.path()).load() {
            Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            ConfigLoader::new(dir.path()).load_from(&missing),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_save_then_load() {
        let _guard = ENV_LOCK.lock();
        clear_overrides();
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path());

        let mut config = LedgerConfig::with_data_dir("store");
        config.uploads.max_bytes = 4096;
        loader.save(&config).unwrap();
        assert!(loader.config_path().exists());

        let loaded = loader.load().unwrap();
        assert_eq!(loaded.data_dir, dir.path().join("store"));
        assert_eq!(loaded.uploads.max_bytes, 4096);
    }
}
