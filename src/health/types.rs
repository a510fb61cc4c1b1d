//! Descriptor and result types for the structured-query core.
//!
//! [`Table`] is the closed allow-list of tables a caller may touch, [`Op`] the
//! closed set of predicate operators. Request descriptors keep `table` as a raw
//! string so the builder, not the deserializer, decides whether it is allowed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::QueryError;

/// The tables a caller may address. Nothing else is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    /// Conditions, with diagnosis date, severity and status.
    #[serde(rename = "medical_history")]
    MedicalHistory,
    /// Medications, optionally linked to a condition.
    #[serde(rename = "medication")]
    Medication,
    /// Food eaten in the last 24 hours.
    #[serde(rename = "food_24h")]
    Food24h,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::MedicalHistory, Table::Medication, Table::Food24h];

    /// SQL table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicalHistory => "medical_history",
            Self::Medication => "medication",
            Self::Food24h => "food_24h",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Table {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medical_history" => Ok(Self::MedicalHistory),
            "medication" => Ok(Self::Medication),
            "food_24h" => Ok(Self::Food24h),
            _ => Err(QueryError::Schema(format!(
                "unknown/blocked table: {s:?}. allowed: {}",
                Table::ALL.map(|t| t.as_str()).join(", ")
            ))),
        }
    }
}

/// Predicate operators accepted inside a `{op, value}` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    In,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
        }
    }
}

impl std::str::FromStr for Op {
    type Err = QueryError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "LIKE" => Ok(Self::Like),
            "IN" => Ok(Self::In),
            other => Err(QueryError::Validation(format!(
                "unsupported operator: {other:?}. allowed: =, !=, >, >=, <, <=, LIKE, IN"
            ))),
        }
    }
}

/// Column → literal (equality) or column → `{"op": .., "value": ..}`.
/// Keys are conjoined with AND.
pub type Predicate = Map<String, Value>;

/// Column → value for insert/update.
pub type Values = Map<String, Value>;

/// Canonical `table_query` descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl QueryRequest {
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }
}

/// Canonical `table_insert` descriptor. A missing `values` deserializes empty
/// and is rejected by the builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertRequest {
    pub table: String,
    #[serde(default)]
    pub values: Values,
}

/// Canonical `table_update` descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub table: String,
    #[serde(default)]
    pub values: Values,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Predicate>,
}

/// Canonical `table_delete` descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub table: String,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Predicate>,
}

/// Result of a query: one page of rows plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectResult {
    pub rows: Vec<Map<String, Value>>,
    /// Rows matching the predicate, ignoring limit/offset.
    pub row_count: i64,
    /// `offset + limit` while more rows remain, otherwise `None`.
    pub next_offset: Option<i64>,
}

/// Result of insert/update/delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateResult {
    pub row_count: usize,
    /// Only set by insert.
    pub last_row_id: Option<i64>,
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub decl_type: String,
    pub notnull: bool,
    pub default: Option<String>,
    pub pk: bool,
}

/// Table name → columns in declaration order.
pub type SchemaDescription = BTreeMap<String, Vec<ColumnInfo>>;
