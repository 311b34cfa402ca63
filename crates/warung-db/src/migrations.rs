//! # Database Migrations
//!
//! Embedded SQL migrations for warung-pos.
//!
//! The `sqlx::migrate!()` macro embeds every file from `migrations/sqlite`
//! into the binary at compile time; applied migrations are tracked in the
//! `_sqlx_migrations` table, so running them is idempotent.
//!
//! ## Adding New Migrations
//! 1. Create a file in `migrations/sqlite/` with the next sequence number
//!    (`NNN_description.sql`)
//! 2. Never modify an existing migration; always add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations, in filename order, each in its
/// own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("all migrations applied");
    Ok(())
}
