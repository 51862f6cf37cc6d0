use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to create connection pool: {0}")]
    Creation(#[from] sqlx::Error),

    #[error("Pool health check failed: {0}")]
    HealthCheck(String),

    #[error("Database file not found: {0}")]
    DatabaseNotFound(String),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Path to SQLite database file, or `:memory:`
    pub database_path: PathBuf,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// `None` keeps idle connections forever
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    /// Write-ahead logging
    pub wal_mode: bool,
    pub synchronous: SynchronousMode,
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
    /// Create the file (and its parent directory) if absent
    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynchronousMode {
    Off,
    Normal,
    #[default]
    Full,
    Extra,
}

impl From<SynchronousMode> for SqliteSynchronous {
    fn from(mode: SynchronousMode) -> Self {
        match mode {
            SynchronousMode::Off => SqliteSynchronous::Off,
            SynchronousMode::Normal => SqliteSynchronous::Normal,
            SynchronousMode::Full => SqliteSynchronous::Full,
            SynchronousMode::Extra => SqliteSynchronous::Extra,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("provenance.db"),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            wal_mode: true,
            synchronous: SynchronousMode::Full,
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// A single-connection private database. The connection is never
    /// recycled, since closing it would discard the data.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY),
            min_connections: 1,
            max_connections: 1,
            idle_timeout: None,
            max_lifetime: None,
            wal_mode: false,
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.min_connections > self.max_connections {
            return Err(PoolError::InvalidConfig(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(PoolError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.is_in_memory() && self.max_connections > 1 {
            return Err(PoolError::InvalidConfig(
                "an in-memory database cannot be shared across connections".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.config.min_connections = min;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.config.wal_mode = enabled;
        self
    }

    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.config.synchronous = mode;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.config.busy_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    pub fn build(self) -> Result<PoolConfig, PoolError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Database connection pool wrapper
pub struct DatabasePool {
    pool: SqlitePool,
    config: PoolConfig,
}

impl DatabasePool {
    #[instrument(skip(config), fields(path = %config.database_path.display()))]
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        if !config.is_in_memory() {
            if config.create_if_missing {
                if let Some(parent) = config
                    .database_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                {
                    std::fs::create_dir_all(parent)?;
                }
            } else if !config.database_path.exists() {
                return Err(PoolError::DatabaseNotFound(
                    config.database_path.display().to_string(),
                ));
            }
        }

        let connect_options = Self::build_connect_options(&config)?;

        let pool = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(connect_options)
            .await?;

        info!(
            max_connections = config.max_connections,
            wal = config.wal_mode,
            "Database pool created"
        );

        let db_pool = Self { pool, config };
        db_pool.health_check().await?;

        Ok(db_pool)
    }

    fn build_connect_options(config: &PoolConfig) -> Result<SqliteConnectOptions, PoolError> {
        let options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| PoolError::InvalidConfig(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(config.create_if_missing)
        };

        let journal = if config.wal_mode {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };

        Ok(options
            .journal_mode(journal)
            .synchronous(config.synchronous.into())
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout))
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), PoolError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PoolError::HealthCheck(e.to_string()))?;

        debug!("Database health check passed");
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max_connections: self.config.max_connections,
        }
    }

    /// Close the pool gracefully
    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
}

impl PoolStats {
    pub fn utilization(&self) -> f64 {
        if self.max_connections == 0 {
            return 0.0;
        }
        (self.size as f64 - self.idle as f64) / self.max_connections as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = DatabasePool::new(PoolConfig::in_memory()).await.unwrap();

        assert!(!pool.is_closed());
        pool.health_check().await.unwrap();
        assert!(pool.stats().utilization() <= 1.0);
        pool.close().await;
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn test_file_pool_applies_pragmas() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::builder()
            .database_path(dir.path().join("nested/ledger.db"))
            .max_connections(2)
            .build()
            .unwrap();
        let pool = DatabasePool::new(config).await.unwrap();

        let journal: String = sqlx::query("PRAGMA journal_mode")
            .fetch_one(pool.pool())
            .await
            .unwrap()
            .get(0);
        assert_eq!(journal.to_lowercase(), "wal");

        let fk: i64 = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(pool.pool())
            .await
            .unwrap()
            .get(0);
        assert_eq!(fk, 1);

        let sync: i64 = sqlx::query("PRAGMA synchronous")
            .fetch_one(pool.pool())
            .await
            .unwrap()
            .get(0);
        assert_eq!(sync, 2);

        assert!(dir.path().join("nested/ledger.db").exists());
        pool.close().await;
    }

    #[tokio::test]
    async fn test_missing_file_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::builder()
            .database_path(dir.path().join("absent.db"))
            .create_if_missing(false)
            .build()
            .unwrap();
        let result = DatabasePool::new(config).await;
        assert!(matches!(result, Err(PoolError::DatabaseNotFound(_))));
    }

    #[test]
    fn test_config_validation() {
        let result = PoolConfig::builder()
            .min_connections(10)
            .max_connections(5)
            .build();
        assert!(result.is_err());

        let result = PoolConfig::builder()
            .database_path(":memory:")
            .max_connections(4)
            .build();
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }
}
