//! Embedded schema migrations applied at startup.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use super::pool::PoolError;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply pending migrations on a blocking thread.
///
/// Migrations need a synchronous connection, so the work runs on Tokio's
/// blocking pool rather than an async checkout.
///
/// # Errors
///
/// Returns [`PoolError::Build`] when the database is unreachable or a
/// migration fails.
pub async fn run_migrations(database_url: &str) -> Result<usize, PoolError> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url)
            .map_err(|err| PoolError::build(format!("connect for migrations: {err}")))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|err| PoolError::build(format!("migration failed: {err}")))
    })
    .await
    .map_err(|err| PoolError::build(format!("migration task panicked: {err}")))??;
    info!(applied, "database migrations complete");
    Ok(applied)
}
