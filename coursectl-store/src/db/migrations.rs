//! Schema migrations for the catalog tables and paged procedures

use tracing::info;

use super::ConnectionManager;
use crate::error::Result;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../migrations");

/// Apply pending migrations from `migrations/`.
pub async fn run_migrations(connections: &ConnectionManager) -> Result<()> {
    info!("Running catalog migrations...");
    MIGRATOR.run(connections.pool()).await?;
    info!("Catalog migrations complete");
    Ok(())
}
