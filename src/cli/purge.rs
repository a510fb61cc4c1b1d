//! CLI `purge` command: run the retention sweep once.

use anyhow::{Context, Result};

use healthdb::config::HealthConfig;
use healthdb::health::retention;

/// Run the retention sweep once and print what was removed.
pub fn purge(config: &HealthConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = healthdb::db::open_database(&db_path)?;

    let result = retention::purge_expired_now(&conn, &config.retention)
        .context("retention sweep failed")?;

    println!("Retention sweep");
    println!("{}", "=".repeat(40));
    println!(
        "  medical_history:     {} removed (recovered > {} days)",
        result.medical_history_deleted, config.retention.recovered_grace_days
    );
    println!(
        "  food_24h:            {} removed (older than {} hours)",
        result.food_deleted, config.retention.food_window_hours
    );
    println!("  medication:          never purged by time");
    println!();
    println!("Total removed:         {}", result.total());

    Ok(())
}
