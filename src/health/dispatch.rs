//! One entry point per tool call: normalize, plan, sweep (when configured),
//! execute.
//!
//! Shared by the MCP tool handler and the `call` CLI command so both surfaces
//! take the same path.

use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use super::types::{MutateResult, SchemaDescription, SelectResult};
use super::{builder, normalize, retention};
use crate::config::RetentionConfig;
use crate::error::{QueryError, QueryResult};

/// The five operations exposed to callers, named as the MCP tools are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CheckSchema,
    Query,
    Insert,
    Update,
    Delete,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::CheckSchema,
        ToolKind::Query,
        ToolKind::Insert,
        ToolKind::Update,
        ToolKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckSchema => "check_schema",
            Self::Query => "table_query",
            Self::Insert => "table_insert",
            Self::Update => "table_update",
            Self::Delete => "table_delete",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown tool: {s}. expected one of: {}", names.join(", "))
            })
    }
}

/// Result of any tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Schema(SchemaDescription),
    Select(SelectResult),
    Mutate(MutateResult),
}

/// Run one tool call against `conn` with a raw, possibly malformed payload.
///
/// The payload is normalized and planned before the light-touch sweep, so a
/// call rejected for any parse, schema, validation or policy reason deletes
/// nothing.
pub fn execute(
    conn: &Connection,
    retention_config: &RetentionConfig,
    tool: ToolKind,
    raw: &Value,
    now: i64,
) -> QueryResult<ToolOutput> {
    let output = match tool {
        ToolKind::CheckSchema => {
            sweep(conn, retention_config)?;
            ToolOutput::Schema(builder::describe_schema(conn)?)
        }
        ToolKind::Query => {
            let req = normalize::normalize_query(raw, now)?;
            let plan = builder::plan_query(conn, &req)?;
            sweep(conn, retention_config)?;
            ToolOutput::Select(plan.execute(conn)?)
        }
        ToolKind::Insert => {
            let req = normalize::normalize_insert(raw)?;
            let plan = builder::plan_insert(conn, &req)?;
            sweep(conn, retention_config)?;
            ToolOutput::Mutate(plan.execute(conn)?)
        }
        ToolKind::Update => {
            let req = normalize::normalize_update(raw)?;
            let plan = builder::plan_update(conn, &req)?;
            sweep(conn, retention_config)?;
            ToolOutput::Mutate(plan.execute(conn)?)
        }
        ToolKind::Delete => {
            let req = normalize::normalize_delete(raw)?;
            let plan = builder::plan_delete(conn, &req)?;
            sweep(conn, retention_config)?;
            ToolOutput::Mutate(plan.execute(conn)?)
        }
    };
    Ok(output)
}

fn sweep(conn: &Connection, config: &RetentionConfig) -> QueryResult<()> {
    retention::touch_purge(conn, config)?;
    Ok(())
}

/// Render an error for an LLM caller: kind tag plus the message.
pub fn error_payload(err: &QueryError) -> Value {
    serde_json::json!({
        "error": err.kind(),
        "message": err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use serde_json::json;

    #[test]
    fn tool_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.as_str().parse::<ToolKind>().unwrap(), kind);
        }
        assert!("table_drop".parse::<ToolKind>().is_err());
    }

    #[test]
    fn insert_then_default_query() {
        let conn = open_memory_database().unwrap();
        let config = RetentionConfig::default();
        let now = crate::health::now_ts();

        let inserted = execute(
            &conn,
            &config,
            ToolKind::Insert,
            &json!({"table": "food_24h", "values": {"name": "oatmeal", "taken_at": now - 3600}}),
            now,
        )
        .unwrap();
        assert!(matches!(inserted, ToolOutput::Mutate(MutateResult { row_count: 1, .. })));

        let ToolOutput::Select(page) =
            execute(&conn, &config, ToolKind::Query, &json!("{\"table\": \"food_24h\"}"), now)
                .unwrap()
        else {
            panic!("expected a select result");
        };
        assert_eq!(page.row_count, 1);
        assert_eq!(page.rows[0]["name"], "oatmeal");
    }

    #[test]
    fn parse_failure_is_reported_before_storage() {
        let conn = open_memory_database().unwrap();
        let err = execute(
            &conn,
            &RetentionConfig::default(),
            ToolKind::Delete,
            &json!("delete everything"),
            0,
        )
        .unwrap_err();
        assert_eq!(error_payload(&err)["error"], "parse_error");
    }

    #[test]
    fn empty_where_delete_is_policy_error() {
        let conn = open_memory_database().unwrap();
        let err = execute(
            &conn,
            &RetentionConfig::default(),
            ToolKind::Delete,
            &json!({"table": "medication", "where": {}}),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Policy(_)));
    }

    #[test]
    fn schema_output_serializes_as_table_map() {
        let conn = open_memory_database().unwrap();
        let out = execute(
            &conn,
            &RetentionConfig::default(),
            ToolKind::CheckSchema,
            &Value::Null,
            0,
        )
        .unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert!(json["medication"].is_array());
        assert_eq!(json["food_24h"][0]["name"], "id");
        assert_eq!(json["food_24h"][0]["pk"], true);
    }
}
