//! SQLite persistence plumbing for the provenance ledger: a configured
//! connection pool, a checksum-tracked migration runner and the ledger
//! schema.

pub mod migration;
pub mod pool;
pub mod schema;

pub use migration::{Migration, MigrationError, MigrationRunner};
pub use pool::{DatabasePool, PoolConfig, PoolConfigBuilder, PoolError, PoolStats, SynchronousMode};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Open the pool and bring the ledger schema up to date.
pub async fn open_ledger_database(config: PoolConfig) -> Result<DatabasePool, DatabaseError> {
    let db = DatabasePool::new(config).await?;

    let mut runner = MigrationRunner::new(db.pool().clone());
    runner.add_migrations(schema::migrations())?;
    let applied = runner.run().await?;
    if !applied.is_empty() {
        info!(count = applied.len(), "Ledger schema migrated");
    }

    Ok(db)
}
