mod helpers;

use healthdb::config::RetentionConfig;
use healthdb::error::QueryError;
use healthdb::health::dispatch::{self, ToolKind, ToolOutput};
use healthdb::health::normalize::{self, DEFAULT_LIMIT, FOOD_WINDOW_SECS};
use healthdb::health::now_ts;
use serde_json::{json, Value};

use helpers::{DAY, HOUR};

const NOW: i64 = 1_760_000_000;

fn run(conn: &rusqlite::Connection, tool: ToolKind, raw: Value) -> Result<ToolOutput, QueryError> {
    let config = RetentionConfig {
        purge_on_each_call: false,
        ..RetentionConfig::default()
    };
    dispatch::execute(conn, &config, tool, &raw, now_ts())
}

#[test]
fn bare_string_order_by_becomes_list() {
    let req = normalize::normalize_query(
        &json!({"table": "food_24h", "order_by": "taken_at", "where": {"name": "rice"}}),
        NOW,
    )
    .unwrap();
    assert_eq!(req.order_by, Some(vec!["taken_at".to_string()]));
}

#[test]
fn stringified_payload_with_chatter_is_recovered() {
    let raw = json!("Sure! Here is the call: {\"arguments\": {\"table\": \"medication\", \"columns\": \"name\"}} hope that helps");
    let req = normalize::normalize_query(&raw, NOW).unwrap();
    assert_eq!(req.table, "medication");
    assert_eq!(req.columns, Some(vec!["name".to_string()]));
}

#[test]
fn food_default_window_and_ordering() {
    let req = normalize::normalize_query(&json!({"table": "food_24h"}), NOW).unwrap();
    let filter = req.filter.unwrap();
    assert_eq!(filter["taken_at"]["op"], ">=");
    assert_eq!(filter["taken_at"]["value"], NOW - FOOD_WINDOW_SECS);
    assert_eq!(req.order_by, Some(vec!["taken_at".to_string()]));
    assert_eq!(req.limit, Some(DEFAULT_LIMIT));
}

#[test]
fn caller_filter_is_never_replaced() {
    let req = normalize::normalize_query(
        &json!({"table": "medical_history", "where": {"status": "active"}}),
        NOW,
    )
    .unwrap();
    assert_eq!(req.filter.unwrap(), *json!({"status": "active"}).as_object().unwrap());
    assert_eq!(req.order_by, None);
    assert_eq!(req.limit, None);
}

#[test]
fn default_query_hides_food_older_than_a_day() {
    let conn = helpers::test_db();
    let now = now_ts();
    helpers::insert_food(&conn, "dinner", now - 2 * HOUR);
    helpers::insert_food(&conn, "last week", now - 7 * DAY);

    let ToolOutput::Select(page) = run(&conn, ToolKind::Query, json!({"table": "food_24h"})).unwrap()
    else {
        panic!("expected a select result");
    };
    assert_eq!(page.row_count, 1);
    assert_eq!(page.rows[0]["name"], "dinner");
}

#[test]
fn default_query_returns_rows_written_this_second() {
    let conn = helpers::test_db();
    run(
        &conn,
        ToolKind::Insert,
        json!({"table": "medication", "values": "{\"name\": \"aspirin\"}"}),
    )
    .unwrap();

    let ToolOutput::Select(page) =
        run(&conn, ToolKind::Query, json!({"arguments": "{\"table\": \"medication\"}"})).unwrap()
    else {
        panic!("expected a select result");
    };
    assert_eq!(page.row_count, 1);
    assert_eq!(page.rows[0]["name"], "aspirin");
}

#[test]
fn empty_containers_on_mutations_reach_the_policy_guard() {
    let conn = helpers::test_db();
    helpers::insert_food(&conn, "rice", now_ts());

    let err = run(
        &conn,
        ToolKind::Update,
        json!({"table": "food_24h", "values": {"notes": "x"}, "where": {}, "order_by": [], "columns": ""}),
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::Policy(_)), "{err}");
    assert_eq!(helpers::count(&conn, "food_24h"), 1);
}

#[test]
fn numeric_strings_page_through_results() {
    let conn = helpers::test_db();
    let now = now_ts();
    for i in 0..5 {
        helpers::insert_food(&conn, &format!("snack {i}"), now - HOUR + i);
    }

    let ToolOutput::Select(page) = run(
        &conn,
        ToolKind::Query,
        json!({"table": "food_24h", "limit": "2", "offset": "2"}),
    )
    .unwrap() else {
        panic!("expected a select result");
    };
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.row_count, 5);
    assert_eq!(page.next_offset, Some(4));
    assert_eq!(page.rows[0]["name"], "snack 2");
}

#[test]
fn free_text_is_a_parse_error() {
    let conn = helpers::test_db();
    for tool in [ToolKind::Query, ToolKind::Insert, ToolKind::Update, ToolKind::Delete] {
        let err = run(&conn, tool, json!("show me what I ate today")).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)), "{tool}: {err}");
        assert_eq!(err.kind(), "parse_error");
    }
}

#[test]
fn unknown_table_survives_normalization_as_schema_error() {
    let conn = helpers::test_db();
    let err = run(&conn, ToolKind::Query, json!({"table": "patients"})).unwrap_err();
    assert!(matches!(err, QueryError::Schema(_)));
    assert!(err.to_string().contains("patients"));
}
