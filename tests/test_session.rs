use queryplay::config::Config;
use queryplay::export::{DataExporter, ExportFormat};
use queryplay::projection::{Scalar, TypeTag};
use queryplay::session::{LoadOutcome, Session};
use queryplay::Error;
use std::fs;
use tempfile::tempdir;

const ORDERS: &str = "\
Order ID,Customer,Total,Placed
1,acme,19.99,03/01/2024
2,globex,5,03/02/2024
3,acme,NA,03/15/2024
";

#[test]
fn test_repeat_load_is_a_no_op() {
    let mut session = Session::with_defaults();
    let outcome = session.load_reader("orders.csv", ORDERS.as_bytes()).unwrap();
    assert_eq!(outcome.table_name(), Some("orders"));

    let again = session.load_reader("orders.csv", ORDERS.as_bytes()).unwrap();
    assert!(matches!(again, LoadOutcome::AlreadyLoaded { ref source_name } if source_name == "orders.csv"));
    assert_eq!(session.schema().len(), 1);
}

#[test]
fn test_failed_load_leaves_catalog_intact() {
    let mut session = Session::with_defaults();
    session.load_reader("orders.csv", ORDERS.as_bytes()).unwrap();

    let err = session.load_reader("empty.csv", "".as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));

    let names: Vec<String> = session.schema().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["orders"]);
    let table = session.query("SELECT COUNT(*) AS n FROM orders").unwrap();
    assert_eq!(table.rows, vec![vec![Scalar::Integer(3)]]);
}

#[test]
fn test_query_projects_with_configured_formats() {
    let mut config = Config::default();
    config.display.date_format = "%Y.%m.%d".to_string();
    let mut session = Session::new(&config).unwrap();
    session.load_reader("orders.csv", ORDERS.as_bytes()).unwrap();

    let table = session
        .query("SELECT Order_ID, Total, Placed FROM orders ORDER BY Order_ID")
        .unwrap();
    assert_eq!(table.columns, vec!["Order_ID", "Total", "Placed"]);
    assert_eq!(table.types, vec![TypeTag::Integer, TypeTag::Float, TypeTag::Date]);
    assert_eq!(
        table.rows[0],
        vec![
            Scalar::Integer(1),
            Scalar::Float(19.99),
            Scalar::Date("2024.03.01".into())
        ]
    );
    assert_eq!(table.get(2, 1), Some(&Scalar::Null));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.loader.delimiter = Some(";;".to_string());
    assert!(matches!(Session::new(&config), Err(Error::Config(_))));
}

#[test]
fn test_reset_forgets_tables_and_sources() {
    let mut session = Session::with_defaults();
    session.load_reader("orders.csv", ORDERS.as_bytes()).unwrap();
    session.query("SELECT * FROM orders").unwrap();

    session.reset();
    assert!(session.schema().is_empty());
    assert!(session.table("orders").unwrap_err().is_not_found());
    assert!(session.query("SELECT * FROM orders").is_err());

    let outcome = session.load_reader("orders.csv", ORDERS.as_bytes()).unwrap();
    assert_eq!(outcome.table_name(), Some("orders"));
}

#[test]
fn test_load_path_and_export() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("orders.csv");
    fs::write(&source, ORDERS).unwrap();

    let mut session = Session::with_defaults();
    let outcome = session.load_path(&source).unwrap();
    let LoadOutcome::Loaded { table_name, report } = outcome else {
        panic!("first load should register a table");
    };
    assert_eq!(table_name, "orders");
    assert_eq!(report.row_count, 3);
    assert!(matches!(
        session.load_path(&source).unwrap(),
        LoadOutcome::AlreadyLoaded { .. }
    ));

    let result = session
        .query("SELECT Customer, SUM(Total) AS spent FROM orders GROUP BY Customer ORDER BY Customer")
        .unwrap();

    let csv_path = dir.path().join("spent.csv");
    let message = DataExporter::export_to_path(&result, ExportFormat::Csv, &csv_path).unwrap();
    assert!(message.contains("Exported 2 rows"));
    assert_eq!(
        fs::read_to_string(&csv_path).unwrap(),
        "Customer,spent\nacme,19.99\nglobex,5\n"
    );

    let json_path = dir.path().join("spent.json");
    DataExporter::export_to_path(&result, ExportFormat::Json, &json_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"Customer": "acme", "spent": 19.99},
            {"Customer": "globex", "spent": 5.0}
        ])
    );
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let mut session = Session::with_defaults();
    let err = session.load_path(dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(session.schema().is_empty());
}

#[test]
fn test_keyword_headers_stay_queryable() {
    let mut session = Session::with_defaults();
    let text = "returning,autoincrement,deferrable,nothing,window,match\n1,2,3,4,5,6\n";
    let outcome = session.load_reader("returning.csv", text.as_bytes()).unwrap();
    let table_name = outcome.table_name().unwrap().to_string();
    assert_eq!(table_name, "t_returning");

    let columns: Vec<String> = session.schema()[0]
        .columns
        .iter()
        .map(|c| c.normalized_name.clone())
        .collect();
    for (idx, column) in columns.iter().enumerate() {
        let table = session
            .query(&format!("SELECT {} FROM {}", column, table_name))
            .unwrap_or_else(|e| panic!("SELECT {column} failed: {e}"));
        assert_eq!(table.rows, vec![vec![Scalar::Integer(idx as i64 + 1)]]);
    }
    assert_eq!(&columns[..4], &["col_returning", "col_autoincrement", "col_deferrable", "col_nothing"]);
}
