#![allow(dead_code)]

use healthdb::health::builder;
use healthdb::health::types::{InsertRequest, QueryRequest, Values};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

pub const HOUR: i64 = 3_600;
pub const DAY: i64 = 86_400;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    healthdb::db::open_memory_database().unwrap()
}

/// Unwrap a `json!({...})` literal into a column map.
pub fn values(v: Value) -> Values {
    v.as_object().cloned().unwrap()
}

/// Insert one row through the query builder. Returns the new row id.
pub fn insert_row(conn: &Connection, table: &str, v: Value) -> i64 {
    let result = builder::insert(
        conn,
        &InsertRequest {
            table: table.into(),
            values: values(v),
        },
    )
    .unwrap();
    result.last_row_id.unwrap()
}

/// Log a food entry eaten at `taken_at`.
pub fn insert_food(conn: &Connection, name: &str, taken_at: i64) -> i64 {
    insert_row(conn, "food_24h", json!({"name": name, "taken_at": taken_at}))
}

/// Record a condition whose status was last changed at `updated_at`.
pub fn insert_condition(conn: &Connection, condition: &str, status: &str, updated_at: i64) -> i64 {
    insert_row(
        conn,
        "medical_history",
        json!({
            "condition": condition,
            "status": status,
            "created_at": updated_at,
            "updated_at": updated_at,
        }),
    )
}

/// Every row in `table`, ordered by id.
pub fn all_rows(conn: &Connection, table: &str) -> Vec<Map<String, Value>> {
    let mut req = QueryRequest::new(table);
    req.order_by = Some(vec!["id".into()]);
    req.limit = Some(i64::MAX / 2);
    builder::query(conn, &req).unwrap().rows
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
        .unwrap()
}
