use super::types::*;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

pub struct MigrationRunner {
    pool: SqlitePool,
    migrations: BTreeMap<i64, Migration>,
}

impl MigrationRunner {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            migrations: BTreeMap::new(),
        }
    }

    pub fn add_migration(&mut self, migration: Migration) -> Result<(), MigrationError> {
        if self.migrations.contains_key(&migration.version) {
            return Err(MigrationError::DuplicateVersion(migration.version));
        }
        self.migrations.insert(migration.version, migration);
        Ok(())
    }

    pub fn add_migrations(
        &mut self,
        migrations: impl IntoIterator<Item = Migration>,
    ) -> Result<(), MigrationError> {
        for migration in migrations {
            self.add_migration(migration)?;
        }
        Ok(())
    }

    /// Initialize the migration tracking table
    pub async fn init(&self) -> Result<(), MigrationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _provenance_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                checksum TEXT NOT NULL,
                applied_at DATETIME NOT NULL,
                execution_time_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Highest applied migration
    pub async fn current_version(&self) -> Result<Option<i64>, MigrationError> {
        self.init().await?;

        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM _provenance_migrations")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    pub async fn get_applied(&self) -> Result<Vec<AppliedMigration>, MigrationError> {
        self.init().await?;

        let applied = sqlx::query_as::<_, AppliedMigration>(
            "SELECT version, name, checksum, applied_at, execution_time_ms
             FROM _provenance_migrations
             ORDER BY version",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(applied)
    }

    pub async fn pending(&self) -> Result<Vec<Migration>, MigrationError> {
        let current = self.current_version().await?.unwrap_or(0);
        Ok(self
            .migrations
            .range(current + 1..)
            .map(|(_, m)| m.clone())
            .collect())
    }

    /// Check applied migrations against the known set. Any edit to an
    /// already-applied migration, or an applied version unknown to this
    /// build, is an error.
    pub async fn verify(&self) -> Result<(), MigrationError> {
        for applied in self.get_applied().await? {
            match self.migrations.get(&applied.version) {
                Some(known) if known.checksum == applied.checksum => {}
                Some(_) => return Err(MigrationError::ChecksumMismatch(applied.version)),
                None => return Err(MigrationError::UnknownApplied(applied.version)),
            }
        }
        Ok(())
    }

    /// Verify, then apply all pending migrations. Each migration runs in
    /// its own transaction together with its bookkeeping row.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<Vec<MigrationResult>, MigrationError> {
        self.verify().await?;
        let pending = self.pending().await?;
        if pending.is_empty() {
            debug!("Schema up to date");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(pending.len());
        for migration in pending {
            let start = std::time::Instant::now();
            info!(version = migration.version, name = %migration.name, "Applying migration");

            let mut tx = self.pool.begin().await?;
            sqlx::query(&migration.sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrationError::ExecutionFailed {
                    version: migration.version,
                    message: e.to_string(),
                })?;

            let elapsed = start.elapsed().as_millis() as i64;
            sqlx::query(
                "INSERT INTO _provenance_migrations
                 (version, name, checksum, applied_at, execution_time_ms)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(migration.version)
            .bind(&migration.name)
            .bind(&migration.checksum)
            .bind(Utc::now())
            .bind(elapsed)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            results.push(MigrationResult {
                version: migration.version,
                name: migration.name,
                execution_time_ms: elapsed,
            });
        }

        Ok(results)
    }
}
