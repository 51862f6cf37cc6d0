//! Configuration for the provenance ledger.
//!
//! Settings come from `provenance.yaml` in the project directory, with
//! `${VAR}` expansion inside the file and a handful of environment
//! overrides applied afterwards.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    pub(crate) fn clear_overrides() {
        for var in [
            vars::PROV_DATA_DIR,
            vars::PROV_DB_PATH,
            vars::PROVENANCE_UPLOAD_MAX_BYTES,
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_has_sensible_values() {
        let config = LedgerConfig::default();
        assert_eq!(config.data_dir, std::path::PathBuf::from("data"));
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.wal_mode);
        assert_eq!(config.uploads.max_bytes, DEFAULT_UPLOAD_MAX_BYTES);
    }

    #[test]
    fn test_partial_configs_merge_with_defaults() {
        let partial_yaml = r#"
keys:
  secret_key_file: /etc/provenance/secret.key
"#;
        let config: LedgerConfig = serde_yaml::from_str(partial_yaml).unwrap();
        assert_eq!(
            config.secret_key_path(),
            std::path::PathBuf::from("/etc/provenance/secret.key")
        );
        assert_eq!(config.system_id_path(), std::path::PathBuf::from("data/system_id.txt"));
        assert_eq!(config.database.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_config_serializes_to_yaml() {
        let yaml = serde_yaml::to_string(&LedgerConfig::default()).unwrap();
        assert!(yaml.contains("data_dir: data"));
        assert!(yaml.contains("database:"));
        assert!(yaml.contains("keys:"));
        assert!(yaml.contains("uploads:"));
        assert!(yaml.contains("max_bytes: 10485760"));
    }
}
