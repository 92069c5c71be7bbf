//! Database connection setup.

use std::path::Path;
use std::str::FromStr as _;
use std::time::Duration;

use anyhow::{Context as _, Result};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub(crate) mod util;

/// Embedded migrations
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Maximum number of pooled connections.
const MAX_CONNECTIONS: u32 = 10;

/// Opens (creating if missing) the SQLite database at `url` and applies all
/// pending migrations.
#[tracing::instrument(skip_all)]
pub async fn establish_pool(url: &str) -> Result<SqlitePool> {
    tracing::debug!("establishing database connection to {url}");

    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("failed to parse database url {url:?}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    // SQLite will not create the parent directory by itself.
    if let Some(parent) = Path::new(options.get_filename()).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .context("failed to connect to database")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("failed to apply migrations")?;

    Ok(pool)
}
