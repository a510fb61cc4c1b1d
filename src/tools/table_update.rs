//! MCP `table_update` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters for the `table_update` MCP tool. `where` is mandatory.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TableUpdateParams {
    #[schemars(description = "Table to update: 'medical_history', 'medication', or 'food_24h'")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Value>,

    #[schemars(description = "Columns to set, e.g. {\"status\": \"recovered\"}")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,

    #[schemars(
        description = "Required filter selecting the rows to change, e.g. {\"id\": 3}. Updates without a filter are refused."
    )]
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
