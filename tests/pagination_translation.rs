use fedsql::ast::{Ident, ObjectName, Offset, OffsetRows, Query, Select, SelectItem, SetExpr, TableFactor, TableWithJoins, Value};
use fedsql::convert::{render_query, translate};
use fedsql::dialect::{Dialect, DialectTag};

#[test]
fn mysql_limit_offset_becomes_oracle_offset_fetch() {
    let sql = translate("SELECT id, name FROM users LIMIT 20 OFFSET 40", DialectTag::Mysql, DialectTag::Oracle).unwrap();
    assert!(sql.contains("OFFSET 40 ROWS FETCH NEXT 20 ROWS ONLY"), "{sql}");
    assert!(!sql.contains("LIMIT"));
}

#[test]
fn mysql_limit_offset_becomes_sql_server_offset_fetch() {
    let sql = translate("SELECT id FROM orders LIMIT 10 OFFSET 5", DialectTag::Mysql, DialectTag::SqlServer).unwrap();
    assert!(sql.contains("OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"), "{sql}");
}

fn users_select(limit: Option<i64>, offset: Option<i64>) -> Query {
    Query {
        with: None,
        body: Box::new(SetExpr::Select(Box::new(Select {
            distinct: false,
            top: None,
            projection: vec![SelectItem::Wildcard],
            into: None,
            from: vec![TableWithJoins {
                relation: TableFactor::Table {
                    name: ObjectName::single(Ident::new("orders")),
                    alias: None,
                    args: None,
                    with_hints: vec![],
                },
                joins: vec![],
            }],
            lateral_views: vec![],
            selection: None,
            group_by: vec![],
            having: None,
        }))),
        order_by: vec![],
        limit: limit.map(|n| fedsql::ast::Expr::Value(Value::Number(n.to_string(), false))),
        offset: offset.map(|n| Offset {
            value: fedsql::ast::Expr::Value(Value::Number(n.to_string(), false)),
            rows: OffsetRows::None,
        }),
        fetch: None,
        lock: None,
    }
}

#[test]
fn pre_12c_oracle_wraps_the_query_in_a_rownum_predicate() {
    let query = users_select(Some(10), Some(5));
    let rendered = render_query(&query, &Dialect::oracle_legacy()).unwrap();
    assert!(rendered.contains("ROWNUM"), "{rendered}");
    assert!(rendered.contains("BETWEEN (5) + 1 AND (5) + (10)"), "{rendered}");
    assert!(!rendered.contains("FETCH"));
}

#[test]
fn hive_drops_the_offset_since_its_limit_has_no_offset_form() {
    let sql = translate("SELECT id FROM orders LIMIT 10 OFFSET 5", DialectTag::Mysql, DialectTag::Hive).unwrap();
    assert!(sql.ends_with("LIMIT 10"), "{sql}");
    assert!(!sql.to_uppercase().contains("OFFSET"), "{sql}");
}

#[test]
fn identifiers_are_requoted_in_the_target_dialects_quote_style() {
    let sql = translate("SELECT `id` FROM `users`", DialectTag::Mysql, DialectTag::Postgresql).unwrap();
    assert!(sql.contains('"'), "{sql}");
    assert!(!sql.contains('`'), "{sql}");
}
