//! Request normalizer.
//!
//! Turns loosely shaped tool arguments (raw strings, JSON embedded in prose,
//! `{"arguments": {..}}` wrappers, bare strings where lists belong) into the
//! canonical descriptors the builder accepts. Pure: no storage access, and the
//! current time is a parameter.
//!
//! A filter the caller actually supplied is never dropped or rewritten. Defaults
//! only fill gaps.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::types::{DeleteRequest, InsertRequest, QueryRequest, UpdateRequest};
use crate::error::{QueryError, QueryResult};

/// Page size injected by the per-table query defaults.
pub const DEFAULT_LIMIT: i64 = 50;

/// Window used by the default `food_24h` predicate.
pub const FOOD_WINDOW_SECS: i64 = 86_400;

const LIST_FIELDS: [&str; 2] = ["order_by", "columns"];
const OPTIONAL_CONTAINERS: [&str; 3] = ["where", "order_by", "columns"];

/// A payload after the first repair pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Object(Map<String, Value>),
    /// Nothing structured could be recovered; holds the first line of text.
    FreeText(String),
}

impl Payload {
    /// The `{"query": text}` shape a free-text payload degrades to.
    pub fn into_object(self) -> Map<String, Value> {
        match self {
            Payload::Object(map) => map,
            Payload::FreeText(text) => {
                let mut map = Map::new();
                map.insert("query".into(), Value::String(text));
                map
            }
        }
    }
}

/// Parse a JSON object out of `text`, taking the slice from the first `{` to
/// the last `}`. Falls back to the first line as free text.
pub fn parse_text(text: &str) -> Payload {
    let text = text.trim();
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(Value::Object(map)) = serde_json::from_str(&text[start..=end]) {
                return Payload::Object(map);
            }
        }
    }
    Payload::FreeText(text.lines().next().unwrap_or_default().trim().to_string())
}

/// Rule 1: objects pass through, strings are parsed, anything else is rendered
/// as free text.
pub fn coerce_payload(raw: &Value) -> Payload {
    match raw {
        Value::Object(map) => Payload::Object(map.clone()),
        Value::String(text) => parse_text(text),
        other => Payload::FreeText(other.to_string()),
    }
}

/// Rule 2: unwrap one level of `{"arguments": {..}}` when `table` is not at the top.
fn unwrap_arguments(mut map: Map<String, Value>) -> Map<String, Value> {
    if map.contains_key("table") {
        return map;
    }
    match map.remove("arguments") {
        Some(Value::Object(inner)) => inner,
        Some(Value::String(text)) => match parse_text(&text) {
            Payload::Object(inner) => inner,
            Payload::FreeText(_) => {
                map.insert("arguments".into(), Value::String(text));
                map
            }
        },
        Some(other) => {
            map.insert("arguments".into(), other);
            map
        }
        None => map,
    }
}

/// Rule 3: a bare string for `order_by`/`columns` becomes a one-element list.
fn coerce_list_fields(map: &mut Map<String, Value>) {
    for key in LIST_FIELDS {
        if let Some(Value::String(s)) = map.get(key) {
            let single = Value::Array(vec![Value::String(s.clone())]);
            map.insert(key.to_string(), single);
        }
    }
}

/// `where`/`values` sent as stringified JSON objects are parsed in place.
fn parse_stringified_objects(map: &mut Map<String, Value>) {
    for key in ["where", "values"] {
        if let Some(Value::String(text)) = map.get(key) {
            if let Payload::Object(inner) = parse_text(text) {
                map.insert(key.to_string(), Value::Object(inner));
            }
        }
    }
}

/// `limit`/`offset` sent as numeric strings become integers.
fn coerce_integer_fields(map: &mut Map<String, Value>) {
    for key in ["limit", "offset"] {
        if let Some(Value::String(text)) = map.get(key) {
            if let Ok(n) = text.trim().parse::<i64>() {
                map.insert(key.to_string(), Value::from(n));
            }
        }
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Shared repair pass: rules 1-3 plus the stringified-field fixes.
fn repair(raw: &Value, tool: &str) -> QueryResult<Map<String, Value>> {
    let map = match coerce_payload(raw) {
        Payload::Object(map) => map,
        Payload::FreeText(text) => {
            return Err(QueryError::Parse(format!(
                "{tool} expects a JSON object with a \"table\" key, got free text: {text:?}"
            )))
        }
    };
    let mut map = unwrap_arguments(map);
    coerce_list_fields(&mut map);
    parse_stringified_objects(&mut map);
    coerce_integer_fields(&mut map);
    Ok(map)
}

fn into_descriptor<T: DeserializeOwned>(map: Map<String, Value>, tool: &str) -> QueryResult<T> {
    serde_json::from_value(Value::Object(map))
        .map_err(|e| QueryError::Parse(format!("malformed {tool} arguments: {e}")))
}

/// Rules 4-5: empty `where`, then per-table defaults when no predicate was given.
fn apply_query_defaults(map: &mut Map<String, Value>, now: i64) {
    let filter_missing = match map.get("where") {
        None | Some(Value::Null) => true,
        Some(Value::Object(m)) => m.is_empty(),
        Some(_) => false,
    };
    if !filter_missing {
        return;
    }

    let defaults = match map.get("table").and_then(Value::as_str) {
        Some("food_24h") => Some((
            json!({"taken_at": {"op": ">=", "value": now - FOOD_WINDOW_SECS}}),
            "taken_at",
        )),
        Some("medication") | Some("medical_history") => Some((
            json!({"created_at": {"op": "<=", "value": now}}),
            "updated_at",
        )),
        _ => None,
    };

    let Some((filter, order_column)) = defaults else {
        map.insert("where".into(), Value::Object(Map::new()));
        return;
    };

    map.insert("where".into(), filter);
    if map.get("order_by").map_or(true, is_empty_container) {
        map.insert("order_by".into(), json!([order_column]));
    }
    if map.get("limit").map_or(true, Value::is_null) {
        map.insert("limit".into(), Value::from(DEFAULT_LIMIT));
    }
}

/// Normalize a `table_query` payload.
///
/// When the caller gave no predicate, `food_24h` is limited to the last 24
/// hours and ordered by `taken_at`; `medication` and `medical_history` get a
/// trivially true `created_at <= now` bound and `updated_at` ordering. All three
/// default to a page of [`DEFAULT_LIMIT`].
pub fn normalize_query(raw: &Value, now: i64) -> QueryResult<QueryRequest> {
    let mut map = repair(raw, "table_query")?;
    apply_query_defaults(&mut map, now);
    into_descriptor(map, "table_query")
}

/// Rule 6 for mutations: drop empty `where`/`order_by`/`columns` so that absent
/// means absent downstream.
fn normalize_mutation<T: DeserializeOwned>(raw: &Value, tool: &str) -> QueryResult<T> {
    let mut map = repair(raw, tool)?;
    for key in OPTIONAL_CONTAINERS {
        if map.get(key).is_some_and(is_empty_container) {
            map.remove(key);
        }
    }
    into_descriptor(map, tool)
}

pub fn normalize_insert(raw: &Value) -> QueryResult<InsertRequest> {
    normalize_mutation(raw, "table_insert")
}

pub fn normalize_update(raw: &Value) -> QueryResult<UpdateRequest> {
    normalize_mutation(raw, "table_update")
}

pub fn normalize_delete(raw: &Value) -> QueryResult<DeleteRequest> {
    normalize_mutation(raw, "table_delete")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    #[test]
    fn bare_string_order_by_becomes_list() {
        let req = normalize_query(
            &json!({"table": "food_24h", "order_by": "taken_at", "where": {"name": "rice"}}),
            NOW,
        )
        .unwrap();
        assert_eq!(req.order_by, Some(vec!["taken_at".to_string()]));
    }

    #[test]
    fn bare_string_columns_becomes_list() {
        let req = normalize_query(&json!({"table": "medication", "columns": "name"}), NOW).unwrap();
        assert_eq!(req.columns, Some(vec!["name".to_string()]));
    }

    #[test]
    fn json_embedded_in_prose_is_extracted() {
        let raw = json!("Action Input: {\"table\": \"medication\", \"limit\": 5} thanks");
        let req = normalize_query(&raw, NOW).unwrap();
        assert_eq!(req.table, "medication");
        assert_eq!(req.limit, Some(5));
    }

    #[test]
    fn free_text_is_a_parse_error() {
        let err = normalize_query(&json!("what did I eat today?\nsecond line"), NOW).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
        assert!(err.to_string().contains("what did I eat today?"));
        assert!(!err.to_string().contains("second line"));
    }

    #[test]
    fn free_text_degrades_to_query_object() {
        let payload = parse_text("show my meds\nplease");
        assert_eq!(payload, Payload::FreeText("show my meds".into()));
        assert_eq!(payload.into_object()["query"], "show my meds");
    }

    #[test]
    fn arguments_wrapper_is_unwrapped() {
        let req = normalize_query(
            &json!({"arguments": {"table": "food_24h", "where": {"id": 4}}}),
            NOW,
        )
        .unwrap();
        assert_eq!(req.table, "food_24h");
        assert_eq!(req.filter.unwrap()["id"], 4);
    }

    #[test]
    fn stringified_arguments_are_unwrapped() {
        let req = normalize_query(
            &json!({"arguments": "{\"table\": \"medication\", \"where\": {\"id\": 1}}"}),
            NOW,
        )
        .unwrap();
        assert_eq!(req.table, "medication");
    }

    #[test]
    fn food_defaults_when_no_predicate() {
        let req = normalize_query(&json!({"table": "food_24h"}), NOW).unwrap();
        assert_eq!(
            Value::Object(req.filter.unwrap()),
            json!({"taken_at": {"op": ">=", "value": NOW - 86_400}})
        );
        assert_eq!(req.order_by, Some(vec!["taken_at".to_string()]));
        assert_eq!(req.limit, Some(50));
    }

    #[test]
    fn medication_and_history_defaults() {
        for table in ["medication", "medical_history"] {
            let req = normalize_query(&json!({"table": table, "where": null}), NOW).unwrap();
            assert_eq!(
                Value::Object(req.filter.unwrap()),
                json!({"created_at": {"op": "<=", "value": NOW}})
            );
            assert_eq!(req.order_by, Some(vec!["updated_at".to_string()]));
            assert_eq!(req.limit, Some(50));
        }
    }

    #[test]
    fn caller_predicate_suppresses_defaults() {
        let req = normalize_query(
            &json!({"table": "food_24h", "where": {"name": {"op": "LIKE", "value": "%rice%"}}}),
            NOW,
        )
        .unwrap();
        let filter = req.filter.unwrap();
        assert_eq!(filter.len(), 1);
        assert!(filter.contains_key("name"));
        assert_eq!(req.order_by, None);
        assert_eq!(req.limit, None);
    }

    #[test]
    fn caller_order_and_limit_survive_defaults() {
        let req = normalize_query(
            &json!({"table": "food_24h", "order_by": ["name"], "limit": "7"}),
            NOW,
        )
        .unwrap();
        assert_eq!(req.order_by, Some(vec!["name".to_string()]));
        assert_eq!(req.limit, Some(7));
        assert!(req.filter.unwrap().contains_key("taken_at"));
    }

    #[test]
    fn unknown_table_passes_through_with_empty_where() {
        let req = normalize_query(&json!({"table": "users"}), NOW).unwrap();
        assert_eq!(req.table, "users");
        assert_eq!(req.filter, Some(Map::new()));
        assert_eq!(req.limit, None);
    }

    #[test]
    fn missing_table_is_a_parse_error() {
        let err = normalize_query(&json!({"where": {"id": 1}}), NOW).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
    }

    #[test]
    fn mutation_drops_empty_containers() {
        let req = normalize_delete(&json!({"table": "food_24h", "where": {}})).unwrap();
        assert_eq!(req.filter, None);

        let req = normalize_update(&json!({
            "table": "medication",
            "values": "{\"status\": \"no longer taking\"}",
            "where": {"id": 2},
            "order_by": [],
        }))
        .unwrap();
        assert_eq!(req.values["status"], "no longer taking");
        assert_eq!(req.filter.unwrap()["id"], 2);
    }

    #[test]
    fn insert_without_values_deserializes_empty() {
        let req = normalize_insert(&json!({"table": "food_24h"})).unwrap();
        assert!(req.values.is_empty());
    }
}
