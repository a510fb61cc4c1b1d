pub mod call;
pub mod doctor;
pub mod purge;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;

use healthdb::config::HealthConfig;
use healthdb::health::retention;

/// Open the configured database and run the unconditional start-of-session
/// sweep, the same setup `serve` does.
pub fn open_session(config: &HealthConfig) -> Result<Connection> {
    let conn = healthdb::db::open_database(config.resolved_db_path())?;
    let purged = retention::purge_expired_now(&conn, &config.retention)
        .context("startup retention sweep failed")?;
    tracing::debug!(removed = purged.total(), "session retention sweep complete");
    Ok(conn)
}
