//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use healthdb::config::HealthConfig;
use healthdb::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &HealthConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `healthdb serve` or `healthdb schema` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("healthdb Health Report");
    println!("======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Retention:");
    println!("  Recovered grace: {} days", config.retention.recovered_grace_days);
    println!("  Food window:     {} hours", config.retention.food_window_hours);
    println!(
        "  Sweep mode:      {}",
        if config.retention.purge_on_each_call {
            "every call"
        } else {
            "startup only"
        }
    );
    println!();
    println!("Row counts:");
    println!("  medical_history: {}", report.medical_history_count);
    println!("  medication:      {}", report.medication_count);
    println!("  food_24h:        {}", report.food_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Stop any running `healthdb serve` process.");
        println!("  2. Restore from a backup: cp backup.db {}", db_path.display());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
