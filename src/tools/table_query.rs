//! MCP `table_query` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters for the `table_query` MCP tool.
///
/// Fields are loosely typed on purpose: whatever shape the model sends is
/// handed to the normalizer instead of being rejected at the transport.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TableQueryParams {
    #[schemars(description = "Table to read: 'medical_history', 'medication', or 'food_24h'")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Value>,

    #[schemars(description = "Columns to return, e.g. [\"name\", \"taken_at\"]. Omit for all columns.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Value>,

    #[schemars(
        description = "Filter: {column: value} for equality or {column: {\"op\": \">=\", \"value\": 123}}. Operators: =, !=, >, >=, <, <=, LIKE, IN. Omit for sensible per-table defaults."
    )]
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[schemars(description = "LIST of columns to order by, e.g. [\"updated_at\"]")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Value>,

    #[schemars(description = "Maximum rows to return. Defaults to 50 for unfiltered reads, else 100.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,

    #[schemars(description = "Rows to skip; pass the previous nextOffset to page.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,

    /// Anything else the model sent, e.g. an `arguments` wrapper.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
