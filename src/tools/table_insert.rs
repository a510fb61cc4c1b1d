use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TableInsertParams {
    #[schemars(description = "Table to insert into: 'medical_history', 'medication', or 'food_24h'")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Value>,

    #[schemars(
        description = "Column values, e.g. {\"name\": \"rice\", \"taken_at\": 1760000000}. created_at/updated_at are filled in when omitted."
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
