//! Query executor SQL generation, observed through a scripted connection.

mod support;

use std::sync::Arc;

use support::FakeConnection;
use wishwell::{
    Dialect, Error, JoinClause, JoinSelect, QueryExecutor, SelectOptions, Value,
};
use wishwell_sql::{Expr, JoinKind, SelectColumn};

fn executor(dialect: Dialect) -> (Arc<FakeConnection>, QueryExecutor) {
    let conn = Arc::new(FakeConnection::new(dialect));
    let exec = QueryExecutor::new(conn.clone());
    (conn, exec)
}

#[tokio::test]
async fn select_numbered_placeholders() {
    let (conn, exec) = executor(Dialect::Postgres);
    exec.select(
        "wishes",
        SelectOptions {
            where_eq: vec![("user_id".into(), Value::from(5i64))],
            limit: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let executed = conn.executed();
    assert_eq!(
        executed[0].0,
        "SELECT * FROM \"wishes\" WHERE \"user_id\" = $1 LIMIT $2"
    );
    assert_eq!(executed[0].1, vec![Value::I64(5), Value::I64(1)]);
}

#[tokio::test]
async fn select_positional_placeholders() {
    let (conn, exec) = executor(Dialect::Sqlite);
    exec.select(
        "wishes",
        SelectOptions {
            where_eq: vec![("user_id".into(), Value::from(5i64))],
            limit: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let executed = conn.executed();
    assert_eq!(
        executed[0].0,
        "SELECT * FROM \"wishes\" WHERE \"user_id\" = ? LIMIT ?"
    );
    assert_eq!(executed[0].1, vec![Value::I64(5), Value::I64(1)]);
}

#[tokio::test]
async fn insert_params_in_key_order() {
    let (conn, exec) = executor(Dialect::Postgres);
    exec.insert(
        "wishes",
        &[
            ("id", Value::from("w1")),
            ("wish", Value::from("let it compile")),
        ],
    )
    .await
    .unwrap();

    let executed = conn.executed();
    assert_eq!(
        executed[0].0,
        "INSERT INTO \"wishes\" (\"id\", \"wish\") VALUES ($1, $2)"
    );
    assert_eq!(
        executed[0].1,
        vec![Value::from("w1"), Value::from("let it compile")]
    );
}

#[tokio::test]
async fn update_set_params_precede_where_params() {
    let (conn, exec) = executor(Dialect::Postgres);
    exec.update(
        "wishes",
        &[
            ("name", Value::from("anon")),
            ("wish", Value::from("updated")),
        ],
        &[("id", Value::from("w1"))],
    )
    .await
    .unwrap();

    let executed = conn.executed();
    assert_eq!(
        executed[0].0,
        "UPDATE \"wishes\" SET \"name\" = $1, \"wish\" = $2 WHERE \"id\" = $3"
    );
    assert_eq!(
        executed[0].1,
        vec![
            Value::from("anon"),
            Value::from("updated"),
            Value::from("w1")
        ]
    );
}

#[tokio::test]
async fn delete_by_conditions() {
    let (conn, exec) = executor(Dialect::MySql);
    exec.delete(
        "supports",
        &[
            ("wish_id", Value::from("w1")),
            ("user_id", Value::from(2i64)),
        ],
    )
    .await
    .unwrap();

    let executed = conn.executed();
    assert_eq!(
        executed[0].0,
        "DELETE FROM `supports` WHERE `wish_id` = ? AND `user_id` = ?"
    );
}

fn user_upsert_data() -> Vec<(&'static str, Value)> {
    vec![
        ("google_id", Value::from("g-123")),
        ("display_name", Value::from("Momo")),
        ("email", Value::Null),
        ("picture", Value::Null),
        ("created_at", Value::from(support::ts(1))),
    ]
}

#[tokio::test]
async fn upsert_excludes_conflict_and_created_at_from_update() {
    let (conn, exec) = executor(Dialect::Postgres);
    let data = user_upsert_data();
    exec.upsert("users", &data, &["google_id"]).await.unwrap();

    let sql = conn.executed()[0].0.clone();
    let (insert_part, update_part) = sql.split_once("DO UPDATE SET").unwrap();
    // Both appear in the INSERT column list but never in the UPDATE clause.
    assert!(insert_part.contains("\"google_id\""));
    assert!(insert_part.contains("\"created_at\""));
    assert!(!update_part.contains("google_id"));
    assert!(!update_part.contains("created_at"));
    assert!(update_part.contains("\"display_name\" = EXCLUDED.\"display_name\""));
    assert!(update_part.contains("\"email\" = EXCLUDED.\"email\""));
}

#[tokio::test]
async fn upsert_mysql_uses_values_clause() {
    let (conn, exec) = executor(Dialect::MySql);
    let data = user_upsert_data();
    exec.upsert("users", &data, &["google_id"]).await.unwrap();

    let sql = conn.executed()[0].0.clone();
    let (_, update_part) = sql.split_once("ON DUPLICATE KEY UPDATE").unwrap();
    assert!(update_part.contains("`display_name` = VALUES(`display_name`)"));
    assert!(!update_part.contains("created_at"));
    assert!(!sql.contains("ON CONFLICT"));
}

#[tokio::test]
async fn upsert_with_nothing_left_to_update_is_a_no_op_clause() {
    let (conn, exec) = executor(Dialect::Postgres);
    let data = vec![
        ("google_id", Value::from("g-123")),
        ("created_at", Value::from(support::ts(1))),
    ];
    exec.upsert("users", &data, &["google_id"]).await.unwrap();
    assert!(
        conn.executed()[0]
            .0
            .ends_with("ON CONFLICT (\"google_id\") DO NOTHING")
    );

    let (conn, exec) = executor(Dialect::MySql);
    exec.upsert("users", &data, &["google_id"]).await.unwrap();
    assert!(
        conn.executed()[0]
            .0
            .ends_with("ON DUPLICATE KEY UPDATE `google_id` = `google_id`")
    );
}

#[tokio::test]
async fn increment_and_decrement_support_count() {
    let (conn, exec) = executor(Dialect::Postgres);
    exec.increment_support_count("w1").await.unwrap();
    exec.decrement_support_count("w1").await.unwrap();

    let executed = conn.executed();
    assert_eq!(
        executed[0].0,
        "UPDATE \"wishes\" SET \"support_count\" = \"support_count\" + 1 WHERE \"id\" = $1"
    );
    // Decrement clamps at zero through the dialect's max-of-two function.
    assert_eq!(
        executed[1].0,
        "UPDATE \"wishes\" SET \"support_count\" = \
         GREATEST(\"support_count\" - 1, 0) WHERE \"id\" = $1"
    );

    let (conn, exec) = executor(Dialect::Sqlite);
    exec.decrement_support_count("w1").await.unwrap();
    assert_eq!(
        conn.executed()[0].0,
        "UPDATE \"wishes\" SET \"support_count\" = \
         MAX(\"support_count\" - 1, 0) WHERE \"id\" = ?"
    );
}

#[tokio::test]
async fn update_support_count_recomputes_from_supports() {
    let (conn, exec) = executor(Dialect::Postgres);
    exec.update_support_count("w1").await.unwrap();
    let executed = conn.executed();
    assert_eq!(
        executed[0].0,
        "UPDATE \"wishes\" SET \"support_count\" = \
         (SELECT COUNT(*) FROM \"supports\" WHERE \"wish_id\" = $1) WHERE \"id\" = $1"
    );
    // The shared named parameter binds once on the numbered dialect...
    assert_eq!(executed[0].1, vec![Value::from("w1")]);

    // ...and once per occurrence on positional dialects.
    let (conn, exec) = executor(Dialect::Sqlite);
    exec.update_support_count("w1").await.unwrap();
    assert_eq!(
        conn.executed()[0].1,
        vec![Value::from("w1"), Value::from("w1")]
    );
}

#[tokio::test]
async fn raw_rejects_empty_sql() {
    let (conn, exec) = executor(Dialect::Postgres);
    let err = exec.raw("   ", Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::EmptyQuery));
    // Rejected before reaching the connection.
    assert_eq!(conn.query_count(), 0);
}

#[tokio::test]
async fn join_select_with_grouping() {
    let (conn, exec) = executor(Dialect::Postgres);
    exec.select_with_join(JoinSelect {
        table: "wishes".into(),
        alias: Some("w".into()),
        columns: vec![
            SelectColumn::expr(Expr::qualified_column("w", "id")),
            SelectColumn::aliased(Expr::raw("COUNT(*)"), "supports"),
        ],
        joins: vec![JoinClause {
            kind: JoinKind::Inner,
            table: "supports".into(),
            alias: Some("s".into()),
            on: Expr::qualified_column("s", "wish_id").eq(Expr::qualified_column("w", "id")),
        }],
        group_by: vec![Expr::qualified_column("w", "id")],
        having: Some(Expr::raw("COUNT(*) > 1")),
        ..Default::default()
    })
    .await
    .unwrap();

    let sql = conn.executed()[0].0.clone();
    assert_eq!(
        sql,
        "SELECT \"w\".\"id\", COUNT(*) AS \"supports\" FROM \"wishes\" \"w\" \
         INNER JOIN \"supports\" \"s\" ON \"s\".\"wish_id\" = \"w\".\"id\" \
         GROUP BY \"w\".\"id\" HAVING COUNT(*) > 1"
    );
}
