use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TableDeleteParams {
    #[schemars(description = "Table to delete from: 'medical_history', 'medication', or 'food_24h'")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Value>,

    #[schemars(
        description = "Required filter selecting the rows to delete, e.g. {\"id\": 3}. Deletes without a filter are refused."
    )]
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
