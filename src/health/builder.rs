//! Safe query builder: validates descriptors against the live schema and
//! executes them as parameterized statements.
//!
//! Each operation is split into a `plan_*` step, which runs every check and
//! compiles the SQL, and an `execute` step. Nothing touches the target table
//! until a plan exists, and each executed plan is a single autocommitted
//! statement.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;

use super::sql::{self, WhereClause};
use super::types::{
    ColumnInfo, DeleteRequest, InsertRequest, MutateResult, Predicate, QueryRequest,
    SchemaDescription, SelectResult, Table, UpdateRequest, Values,
};
use crate::error::{QueryError, QueryResult};

/// Columns of every allowed table, as declared in storage.
pub fn describe_schema(conn: &Connection) -> QueryResult<SchemaDescription> {
    Table::ALL
        .iter()
        .map(|&table| Ok((table.as_str().to_string(), table_columns(conn, table)?)))
        .collect()
}

/// `PRAGMA table_info` for one allowed table.
pub fn table_columns(conn: &Connection, table: Table) -> QueryResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", sql::quote_table(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                decl_type: row.get(2)?,
                notnull: row.get::<_, i64>(3)? != 0,
                default: row.get(4)?,
                pk: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// The live column set of `table`, used to validate caller-supplied names.
struct ColumnSet {
    table: Table,
    names: BTreeSet<String>,
}

impl ColumnSet {
    fn load(conn: &Connection, table: Table) -> QueryResult<Self> {
        let names = table_columns(conn, table)?
            .into_iter()
            .map(|c| c.name)
            .collect();
        Ok(Self { table, names })
    }

    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Fails with every unknown name listed, never just the first.
    fn validate<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> QueryResult<()> {
        let bad: Vec<&str> = names.into_iter().filter(|n| !self.contains(n)).collect();
        if bad.is_empty() {
            return Ok(());
        }
        Err(QueryError::Schema(format!(
            "invalid column(s) for {}: {:?}. allowed: {:?}",
            self.table, bad, self.names
        )))
    }

    fn validate_predicate(&self, filter: &Predicate) -> QueryResult<()> {
        self.validate(filter.keys().map(String::as_str))
    }
}

/// Compile `filter` after checking its columns exist.
fn compile_filter(columns: &ColumnSet, filter: Option<&Predicate>) -> QueryResult<WhereClause> {
    match filter {
        Some(filter) if !filter.is_empty() => {
            columns.validate_predicate(filter)?;
            sql::build_where(filter)
        }
        _ => Ok(WhereClause::default()),
    }
}

/// A validated `query`, ready to run.
///
/// Planning does every check and compiles the SQL; nothing is read from the
/// target table until [`SelectPlan::execute`].
#[derive(Debug, Clone)]
pub struct SelectPlan {
    select: String,
    count: String,
    params: Vec<SqlValue>,
    limit: i64,
    offset: i64,
}

/// A validated insert, update or delete, ready to run.
#[derive(Debug, Clone)]
pub struct MutationPlan {
    statement: String,
    params: Vec<SqlValue>,
    kind: MutationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// Validate and compile a `query` descriptor.
pub fn plan_query(conn: &Connection, req: &QueryRequest) -> QueryResult<SelectPlan> {
    let table: Table = req.table.parse()?;
    let columns = ColumnSet::load(conn, table)?;

    let selected = req.columns.as_deref().unwrap_or_default();
    let order_by = req.order_by.as_deref().unwrap_or_default();
    columns.validate(selected.iter().map(String::as_str))?;
    columns.validate(order_by.iter().map(String::as_str))?;
    let filter = compile_filter(&columns, req.filter.as_ref())?;

    Ok(SelectPlan {
        select: sql::select_sql(table, selected, &filter, order_by)?,
        count: sql::count_sql(table, &filter),
        params: filter.params,
        limit: req.limit.unwrap_or(QueryRequest::DEFAULT_LIMIT),
        offset: req.offset.unwrap_or(0),
    })
}

impl SelectPlan {
    /// Read one page of rows plus the total match count.
    ///
    /// `nextOffset` is `offset + limit` while that is still below the count. The
    /// count and the page are two statements, so a concurrent writer could make
    /// them disagree.
    pub fn execute(self, conn: &Connection) -> QueryResult<SelectResult> {
        tracing::debug!(sql = %self.select, params = self.params.len(), "select");

        let mut stmt = conn.prepare(&self.select)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let page_params = self
            .params
            .iter()
            .cloned()
            .chain([SqlValue::Integer(self.limit), SqlValue::Integer(self.offset)]);
        let rows = stmt
            .query_map(params_from_iter(page_params), |row| {
                let mut out = Map::with_capacity(names.len());
                for (i, name) in names.iter().enumerate() {
                    out.insert(name.clone(), to_json(row.get_ref(i)?));
                }
                Ok(out)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let row_count: i64 =
            conn.query_row(&self.count, params_from_iter(self.params.iter()), |row| row.get(0))?;

        let next_offset = self
            .offset
            .checked_add(self.limit)
            .filter(|&next| next < row_count);

        Ok(SelectResult {
            rows,
            row_count,
            next_offset,
        })
    }
}

/// Validate and compile an insert, stamping `created_at`/`updated_at` when the
/// table has them and the caller left them out.
pub fn plan_insert(conn: &Connection, req: &InsertRequest) -> QueryResult<MutationPlan> {
    let table: Table = req.table.parse()?;
    if req.values.is_empty() {
        return Err(QueryError::Validation("values cannot be empty".into()));
    }
    let columns = ColumnSet::load(conn, table)?;

    let mut values = req.values.clone();
    let now = super::now_ts();
    for stamp in ["created_at", "updated_at"] {
        if columns.contains(stamp) && !values.contains_key(stamp) {
            values.insert(stamp.to_string(), now.into());
        }
    }
    columns.validate(values.keys().map(String::as_str))?;

    let (names, params) = split_values(&values)?;
    Ok(MutationPlan {
        statement: sql::insert_sql(table, &names)?,
        params,
        kind: MutationKind::Insert,
    })
}

/// Validate and compile an update. Refreshes `updated_at` unless the caller
/// set it.
pub fn plan_update(conn: &Connection, req: &UpdateRequest) -> QueryResult<MutationPlan> {
    let table: Table = req.table.parse()?;
    if req.values.is_empty() {
        return Err(QueryError::Validation("values cannot be empty".into()));
    }
    require_filter(req.filter.as_ref(), "update")?;
    let columns = ColumnSet::load(conn, table)?;

    let mut values = req.values.clone();
    if columns.contains("updated_at") && !values.contains_key("updated_at") {
        values.insert("updated_at".into(), super::now_ts().into());
    }
    columns.validate(values.keys().map(String::as_str))?;
    let filter = compile_filter(&columns, req.filter.as_ref())?;

    let (names, mut params) = split_values(&values)?;
    let statement = sql::update_sql(table, &names, &filter)?;
    params.extend(filter.params);
    Ok(MutationPlan {
        statement,
        params,
        kind: MutationKind::Update,
    })
}

/// Validate and compile a delete.
pub fn plan_delete(conn: &Connection, req: &DeleteRequest) -> QueryResult<MutationPlan> {
    let table: Table = req.table.parse()?;
    require_filter(req.filter.as_ref(), "delete")?;
    let columns = ColumnSet::load(conn, table)?;
    let filter = compile_filter(&columns, req.filter.as_ref())?;

    Ok(MutationPlan {
        statement: sql::delete_sql(table, &filter)?,
        params: filter.params,
        kind: MutationKind::Delete,
    })
}

impl MutationPlan {
    pub fn execute(self, conn: &Connection) -> QueryResult<MutateResult> {
        tracing::debug!(sql = %self.statement, kind = ?self.kind, "mutate");

        let changed = conn.execute(&self.statement, params_from_iter(self.params))?;
        Ok(match self.kind {
            MutationKind::Insert => MutateResult {
                // a successful single-row insert always touched exactly one row
                row_count: changed.max(1),
                last_row_id: Some(conn.last_insert_rowid()),
            },
            MutationKind::Update | MutationKind::Delete => MutateResult {
                row_count: changed,
                last_row_id: None,
            },
        })
    }
}

pub fn query(conn: &Connection, req: &QueryRequest) -> QueryResult<SelectResult> {
    plan_query(conn, req)?.execute(conn)
}

pub fn insert(conn: &Connection, req: &InsertRequest) -> QueryResult<MutateResult> {
    plan_insert(conn, req)?.execute(conn)
}

/// Update rows matching a mandatory predicate.
pub fn update(conn: &Connection, req: &UpdateRequest) -> QueryResult<MutateResult> {
    plan_update(conn, req)?.execute(conn)
}

/// Delete rows matching a mandatory predicate.
pub fn delete(conn: &Connection, req: &DeleteRequest) -> QueryResult<MutateResult> {
    plan_delete(conn, req)?.execute(conn)
}

fn require_filter(filter: Option<&Predicate>, verb: &str) -> QueryResult<()> {
    match filter {
        Some(f) if !f.is_empty() => Ok(()),
        _ => Err(QueryError::Policy(format!("refusing to {verb} without WHERE"))),
    }
}

fn split_values(values: &Values) -> QueryResult<(Vec<String>, Vec<SqlValue>)> {
    let mut names = Vec::with_capacity(values.len());
    let mut params = Vec::with_capacity(values.len());
    for (name, value) in values {
        params.push(sql::to_sql_value(name, value)?);
        names.push(name.clone());
    }
    Ok((names, params))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
    }
}
