//! Retention sweeper.
//!
//! Two unconditional, table-scoped deletes evaluated against a caller-supplied
//! `now`:
//!
//! | Table | Rule |
//! |-------|------|
//! | `medical_history` | `status` starts with `recovered` and `updated_at <= now - grace` |
//! | `food_24h` | `taken_at < now - window` |
//!
//! `medication` is never swept; its rows outlive their condition with
//! `condition_id` nulled by the foreign key.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::config::RetentionConfig;
use crate::error::QueryResult;

/// When the sweeper runs besides process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeMode {
    /// Only the unconditional sweep at startup.
    StartupOnly,
    /// Also before every tool call, so no caller sees expired rows.
    EveryCall,
}

impl PurgeMode {
    pub fn from_config(config: &RetentionConfig) -> Self {
        if config.purge_on_each_call {
            Self::EveryCall
        } else {
            Self::StartupOnly
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeResult {
    pub medical_history_deleted: usize,
    pub food_deleted: usize,
}

impl PurgeResult {
    pub fn total(&self) -> usize {
        self.medical_history_deleted + self.food_deleted
    }
}

/// Delete every row past its retention window as of `now` (epoch seconds).
///
/// Both deletes commit together. Running it twice with no writes in between
/// deletes nothing the second time.
pub fn purge_expired(
    conn: &Connection,
    config: &RetentionConfig,
    now: i64,
) -> QueryResult<PurgeResult> {
    let recovered_cutoff = now.saturating_sub(config.recovered_grace_secs());
    let food_cutoff = now.saturating_sub(config.food_window_secs());

    let tx = conn.unchecked_transaction()?;
    // LIKE is ASCII case-insensitive, so "Recovered (fully)" counts too
    let medical_history_deleted = tx.execute(
        "DELETE FROM medical_history WHERE status LIKE 'recovered%' AND updated_at <= ?1",
        params![recovered_cutoff],
    )?;
    let food_deleted = tx.execute(
        "DELETE FROM food_24h WHERE taken_at < ?1",
        params![food_cutoff],
    )?;
    tx.commit()?;

    let result = PurgeResult {
        medical_history_deleted,
        food_deleted,
    };
    if result.total() > 0 {
        tracing::info!(
            medical_history = medical_history_deleted,
            food = food_deleted,
            "purged expired rows"
        );
    }
    Ok(result)
}

/// [`purge_expired`] at the current wall-clock time.
pub fn purge_expired_now(conn: &Connection, config: &RetentionConfig) -> QueryResult<PurgeResult> {
    purge_expired(conn, config, super::now_ts())
}

/// Light-touch sweep before a tool call. A no-op in [`PurgeMode::StartupOnly`].
pub fn touch_purge(
    conn: &Connection,
    config: &RetentionConfig,
) -> QueryResult<Option<PurgeResult>> {
    match PurgeMode::from_config(config) {
        PurgeMode::EveryCall => purge_expired_now(conn, config).map(Some),
        PurgeMode::StartupOnly => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    const NOW: i64 = 1_760_000_000;
    const DAY: i64 = 86_400;

    fn add_food(conn: &Connection, name: &str, taken_at: i64) {
        conn.execute(
            "INSERT INTO food_24h (name, taken_at, created_at) VALUES (?1, ?2, ?2)",
            params![name, taken_at],
        )
        .unwrap();
    }

    fn add_condition(conn: &Connection, status: &str, updated_at: i64) {
        conn.execute(
            "INSERT INTO medical_history (condition, status, created_at, updated_at) \
             VALUES ('flu', ?1, ?2, ?2)",
            params![status, updated_at],
        )
        .unwrap();
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn food_window_boundary() {
        let conn = open_memory_database().unwrap();
        let config = RetentionConfig::default();
        add_food(&conn, "stale", NOW - DAY - 1);
        add_food(&conn, "edge", NOW - DAY);
        add_food(&conn, "fresh", NOW - 60);

        let result = purge_expired(&conn, &config, NOW).unwrap();
        assert_eq!(result.food_deleted, 1);
        assert_eq!(count(&conn, "food_24h"), 2);
    }

    #[test]
    fn recovered_grace_boundary() {
        let conn = open_memory_database().unwrap();
        let config = RetentionConfig::default();
        add_condition(&conn, "recovered", NOW - 14 * DAY);
        add_condition(&conn, "recovered", NOW - 14 * DAY + 1);
        add_condition(&conn, "active", NOW - 100 * DAY);
        add_condition(&conn, "Recovered (fully)", NOW - 30 * DAY);

        let result = purge_expired(&conn, &config, NOW).unwrap();
        assert_eq!(result.medical_history_deleted, 2);
        assert_eq!(count(&conn, "medical_history"), 2);
    }

    #[test]
    fn medication_is_never_swept() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO medication (name, time_taken, created_at, updated_at) VALUES ('ibuprofen', 0, 0, 0)",
            [],
        )
        .unwrap();

        purge_expired(&conn, &RetentionConfig::default(), NOW).unwrap();
        assert_eq!(count(&conn, "medication"), 1);
    }

    #[test]
    fn startup_only_mode_skips_touch() {
        let conn = open_memory_database().unwrap();
        add_food(&conn, "ancient", 0);
        let config = RetentionConfig {
            purge_on_each_call: false,
            ..RetentionConfig::default()
        };

        assert_eq!(touch_purge(&conn, &config).unwrap(), None);
        assert_eq!(count(&conn, "food_24h"), 1);

        let eager = RetentionConfig::default();
        let result = touch_purge(&conn, &eager).unwrap().unwrap();
        assert_eq!(result.food_deleted, 1);
    }
}
