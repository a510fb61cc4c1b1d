//! SQL text construction.
//!
//! This is the only module that turns caller-supplied names into SQL text.
//! Identifiers pass through [`quote_ident`]; values never appear in the text and
//! are always returned as bound parameters.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use super::types::{Op, Predicate, Table};
use crate::error::{QueryError, QueryResult};

/// Validate and double-quote an identifier.
///
/// Accepts ASCII letters, digits and underscore, with at least one letter or digit.
pub fn quote_ident(ident: &str) -> QueryResult<String> {
    let charset_ok = ident
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    let has_alnum = ident.chars().any(|c| c.is_ascii_alphanumeric());
    if !charset_ok || !has_alnum {
        return Err(QueryError::Schema(format!("invalid identifier: {ident:?}")));
    }
    Ok(format!("\"{ident}\""))
}

/// Quoted name of an allow-listed table.
pub fn quote_table(table: Table) -> String {
    format!("\"{}\"", table.as_str())
}

/// A compiled WHERE clause: text (empty, or starting with `" WHERE "`) plus its parameters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Compile a predicate mapping into a conjunctive WHERE clause.
///
/// A `{"op", "value"}` object is a structured condition; anything else is an
/// equality literal. `IN` with an empty sequence compiles to `1=0`.
pub fn build_where(filter: &Predicate) -> QueryResult<WhereClause> {
    if filter.is_empty() {
        return Ok(WhereClause::default());
    }

    let mut clauses = Vec::with_capacity(filter.len());
    let mut params = Vec::new();

    for (column, condition) in filter {
        let col = quote_ident(column)?;
        let (op, value) = match structured_condition(condition) {
            Some((Value::String(op), value)) => (op.parse::<Op>()?, value),
            Some((op, _)) => {
                return Err(QueryError::Validation(format!(
                    "unsupported operator: {op} on column {column:?}"
                )))
            }
            None => (Op::Eq, condition),
        };

        match op {
            Op::In => {
                let Value::Array(items) = value else {
                    return Err(QueryError::Validation(format!(
                        "IN on column {column:?} requires a sequence value"
                    )));
                };
                if items.is_empty() {
                    clauses.push("1=0".to_string());
                    continue;
                }
                let placeholders = vec!["?"; items.len()].join(", ");
                clauses.push(format!("{col} IN ({placeholders})"));
                for item in items {
                    params.push(to_sql_value(column, item)?);
                }
            }
            Op::Eq if value.is_null() => clauses.push(format!("{col} IS NULL")),
            Op::Ne if value.is_null() => clauses.push(format!("{col} IS NOT NULL")),
            _ => {
                clauses.push(format!("{col} {} ?", op.as_sql()));
                params.push(to_sql_value(column, value)?);
            }
        }
    }

    Ok(WhereClause {
        sql: format!(" WHERE {}", clauses.join(" AND ")),
        params,
    })
}

/// `Some((op, value))` when the condition is a `{"op": .., "value": ..}` object.
fn structured_condition(condition: &Value) -> Option<(&Value, &Value)> {
    let obj = condition.as_object()?;
    Some((obj.get("op")?, obj.get("value")?))
}

/// Convert a JSON scalar to a bindable SQLite value.
pub fn to_sql_value(column: &str, value: &Value) -> QueryResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real).ok_or_else(|| {
                QueryError::Validation(format!("number out of range for column {column:?}"))
            }),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(QueryError::Validation(format!(
            "value for column {column:?} must be a scalar, got {value}"
        ))),
    }
}

fn quote_list(names: &[String]) -> QueryResult<String> {
    Ok(names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<QueryResult<Vec<_>>>()?
        .join(", "))
}

/// `SELECT .. FROM .. [WHERE ..] [ORDER BY ..] LIMIT ? OFFSET ?`
pub fn select_sql(
    table: Table,
    columns: &[String],
    filter: &WhereClause,
    order_by: &[String],
) -> QueryResult<String> {
    let cols = if columns.is_empty() {
        "*".to_string()
    } else {
        quote_list(columns)?
    };
    let order = if order_by.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", quote_list(order_by)?)
    };
    Ok(format!(
        "SELECT {cols} FROM {}{}{order} LIMIT ? OFFSET ?",
        quote_table(table),
        filter.sql
    ))
}

/// `SELECT COUNT(*) FROM .. [WHERE ..]`
pub fn count_sql(table: Table, filter: &WhereClause) -> String {
    format!("SELECT COUNT(*) FROM {}{}", quote_table(table), filter.sql)
}

/// `INSERT INTO .. (cols) VALUES (?, ..)`
pub fn insert_sql(table: Table, columns: &[String]) -> QueryResult<String> {
    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_table(table),
        quote_list(columns)?
    ))
}

/// `UPDATE .. SET col=?, .. WHERE ..`; refuses an empty WHERE.
pub fn update_sql(table: Table, columns: &[String], filter: &WhereClause) -> QueryResult<String> {
    if filter.is_empty() {
        return Err(QueryError::Policy("refusing to update without WHERE".into()));
    }
    let set = columns
        .iter()
        .map(|c| quote_ident(c).map(|q| format!("{q}=?")))
        .collect::<QueryResult<Vec<_>>>()?
        .join(", ");
    Ok(format!("UPDATE {} SET {set}{}", quote_table(table), filter.sql))
}

/// `DELETE FROM .. WHERE ..`; refuses an empty WHERE.
pub fn delete_sql(table: Table, filter: &WhereClause) -> QueryResult<String> {
    if filter.is_empty() {
        return Err(QueryError::Policy("refusing to delete without WHERE".into()));
    }
    Ok(format!("DELETE FROM {}{}", quote_table(table), filter.sql))
}
