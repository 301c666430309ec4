use fedsql::ast::{ShowSchemas, ShowTables, Statement};
use fedsql::parser::parse_extended;

#[test]
fn show_tables_with_like_and_where_parses_into_its_own_node() {
    let statement = parse_extended("SHOW TABLES FROM sales LIKE 'ord%' WHERE col_count > 3").unwrap();
    match statement {
        Statement::ShowTables(ShowTables { db, like_pattern, filter, .. }) => {
            assert_eq!(db.unwrap().value, "sales");
            assert_eq!(like_pattern.as_deref(), Some("ord%"));
            assert!(filter.is_some());
        }
        other => panic!("expected ShowTables, got {other:?}"),
    }
}

#[test]
fn bare_show_tables_has_no_filters() {
    let statement = parse_extended("SHOW TABLES").unwrap();
    match statement {
        Statement::ShowTables(ShowTables { db, like_pattern, filter, .. }) => {
            assert!(db.is_none());
            assert!(like_pattern.is_none());
            assert!(filter.is_none());
        }
        other => panic!("expected ShowTables, got {other:?}"),
    }
}

#[test]
fn show_databases_parses_into_show_schemas() {
    let statement = parse_extended("SHOW DATABASES LIKE 'prod%'").unwrap();
    match statement {
        Statement::ShowSchemas(ShowSchemas { like_pattern, .. }) => {
            assert_eq!(like_pattern.as_deref(), Some("prod%"));
        }
        other => panic!("expected ShowSchemas, got {other:?}"),
    }
}

#[test]
fn show_without_a_recognized_target_is_a_syntax_error() {
    let err = parse_extended("SHOW FOOBARS").unwrap_err();
    assert!(matches!(err, fedsql::FedError::Syntax { .. }));
}
