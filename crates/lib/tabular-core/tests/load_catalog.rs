use std::path::PathBuf;

use serde_json::json;
use tabular_core::{FilterRequest, Loader, MemoryBackend, QueryErrorKind, Selection, TableBackend};
use tabular_store::models::{ColumnType, Value};

fn data_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

fn load_backend(selection: Selection) -> MemoryBackend {
    let output = Loader::new(data_path().join("tables"))
        .with_selection(selection)
        .load()
        .unwrap_or_else(|err| panic!("failed to load fixture tables: {err}"));
    MemoryBackend::new(output)
}

fn load_selection() -> Selection {
    Selection::load(&data_path().join("selection.toml"))
        .unwrap_or_else(|err| panic!("failed to read selection fixture: {err}"))
}

#[test]
fn fixture_directory_loads_fail_soft() {
    let backend = load_backend(Selection::default());
    assert_eq!(backend.list_tables(), vec!["dup", "people", "sales"]);

    let report = backend.load_report();
    let skipped: Vec<&str> = report.skipped.iter().map(|file| file.file.as_str()).collect();
    assert_eq!(skipped, vec!["broken.csv", "dup.tsv", "empty.csv"]);
    assert!(report.skipped.iter().all(|file| !file.reason.is_empty()));

    let dup = backend
        .query_table(&FilterRequest::new("dup"))
        .expect("dup table should be queryable");
    assert_eq!(dup.rows[0]["key"], json!("from_csv"));
}

#[test]
fn selection_file_hides_tables_and_columns() {
    let backend = load_backend(load_selection());
    assert_eq!(backend.list_tables(), vec!["people", "sales"]);
    assert_eq!(backend.load_report().excluded_tables, vec!["dup".to_string()]);

    let people = backend.describe("people").expect("people profile");
    assert!(people.columns.iter().all(|column| column.name != "email"));
    let err = backend
        .query_table(&FilterRequest::new("people").with_columns(["email"]))
        .expect_err("excluded column is unknown");
    assert_eq!(err.kind(), QueryErrorKind::NotFound);
}

#[test]
fn profiles_reflect_inferred_types() {
    let backend = load_backend(Selection::default());
    let sales = backend.describe("sales").expect("sales profile");
    assert_eq!(sales.row_count, 15);
    assert_eq!(sales.column_count, 5);
    let column_type = |name: &str| {
        sales
            .columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.column_type)
    };
    assert_eq!(column_type("amount"), Some(ColumnType::Numeric));
    assert_eq!(column_type("region"), Some(ColumnType::Text));
    assert_eq!(column_type("date"), Some(ColumnType::Temporal));
    assert_eq!(column_type("active"), Some(ColumnType::Boolean));

    let people = backend.describe("people").expect("people profile");
    let nickname = people
        .columns
        .iter()
        .find(|column| column.name == "nickname")
        .expect("nickname column");
    assert_eq!(nickname.column_type, ColumnType::Unknown);
    assert_eq!(nickname.null_count, 5);
    assert!(nickname.top_values.is_empty());

    let code = people
        .columns
        .iter()
        .find(|column| column.name == "code")
        .expect("code column");
    assert_eq!(code.column_type, ColumnType::Mixed);
    assert_eq!(code.distinct_count, 5);

    let age = people
        .columns
        .iter()
        .find(|column| column.name == "age")
        .expect("age column");
    assert!(age.nullable);
    assert_eq!(age.min, Some(Value::Int(27)));
    assert_eq!(age.max, Some(Value::Int(41)));
}

#[test]
fn filters_truncate_and_summarize() {
    let backend = load_backend(Selection::default());
    let result = backend
        .query_table(
            &FilterRequest::new("sales")
                .with_filter("amount > 100")
                .with_columns(["region", "amount"]),
        )
        .expect("filter should run");
    assert_eq!(result.returned_rows, 10);
    assert_eq!(result.matched_rows, Some(12));
    assert!(result.truncated);
    assert_eq!(result.columns, vec!["region", "amount"]);
    let first_keys: Vec<&String> = result.rows[0].keys().collect();
    assert_eq!(first_keys, vec!["region", "amount"]);
    assert_eq!(result.rows[0]["amount"], json!(120));

    let summary = &result.numeric_summary[0];
    assert_eq!(summary.count, 12);
    assert_eq!(summary.mean, Some(175.0));
    let std = summary.std.expect("spread over twelve amounts");
    assert!((std - 1300_f64.sqrt()).abs() < 1e-9, "std was {std}");
}

#[test]
fn filters_support_dates_methods_and_membership() {
    let backend = load_backend(Selection::default());
    let run = |filter: &str, table: &str| {
        backend
            .query_table(&FilterRequest::new(table).with_filter(filter))
            .unwrap_or_else(|err| panic!("{filter}: {err}"))
            .matched_rows
    };
    assert_eq!(run("date >= '2024-01-10'", "sales"), Some(6));
    assert_eq!(run("region in ['north', 'west'] and active", "sales"), Some(5));
    assert_eq!(run("name.str.contains('太郎')", "people"), Some(1));
    assert_eq!(run("age.isna()", "people"), Some(1));
    assert_eq!(run("age > 30 or email.isnull()", "people"), Some(2));
}

#[test]
fn rejected_filters_report_their_kind() {
    let backend = load_backend(Selection::default());
    let kind = |filter: &str| {
        backend
            .query_table(&FilterRequest::new("sales").with_filter(filter))
            .expect_err("filter should be rejected")
            .kind()
    };
    assert_eq!(kind("@secret > 1"), QueryErrorKind::Forbidden);
    assert_eq!(kind("__class__ == 1"), QueryErrorKind::Forbidden);
    assert_eq!(kind("amount.apply(print)"), QueryErrorKind::Forbidden);
    assert_eq!(kind("(amount > 1"), QueryErrorKind::Malformed);
    assert_eq!(kind("price > 1"), QueryErrorKind::NotFound);

    let err = backend
        .query_table(&FilterRequest::new("orders"))
        .expect_err("unknown table");
    assert_eq!(err.kind(), QueryErrorKind::NotFound);
}

#[test]
fn deeply_nested_filters_fail_without_exhausting_the_stack() {
    let backend = load_backend(Selection::default());
    let depth = 20_000;
    let filter = format!("{}amount > 1{}", "(".repeat(depth), ")".repeat(depth));

    // Tool calls run on runtime worker threads with 2 MiB stacks.
    let kind = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            backend
                .query_table(&FilterRequest::new("sales").with_filter(filter))
                .map(|result| result.returned_rows)
                .map_err(|err| err.kind())
        })
        .expect("spawn worker thread")
        .join()
        .expect("worker thread should not abort");
    assert_eq!(kind, Err(QueryErrorKind::Malformed));
}
