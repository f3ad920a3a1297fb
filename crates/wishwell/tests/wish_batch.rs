//! Batch loading: wish pages assemble in exactly three queries.

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;

use support::{FakeConnection, row, wish_row};
use wishwell::{Dialect, Identity, QueryExecutor, Value, WishRepository};

fn repo(dialect: Dialect) -> (Arc<FakeConnection>, WishRepository) {
    let conn = Arc::new(FakeConnection::new(dialect));
    let repo = WishRepository::new(QueryExecutor::new(conn.clone()));
    (conn, repo)
}

#[tokio::test]
async fn page_loads_in_exactly_three_queries() {
    let (conn, repo) = repo(Dialect::Postgres);

    // Main page: one user-authored wish the viewer supports, one
    // session-authored wish.
    conn.respond_rows(vec![
        wish_row("W1", Some(1), true),
        wish_row("W2", None, false),
    ]);
    // Session resolution for the page id set.
    conn.respond_rows(vec![row(&[
        ("wish_id", Value::from("W2")),
        ("session_id", Value::from("sess-abc")),
    ])]);
    // Supporter resolution for the page id set.
    conn.respond_rows(vec![
        row(&[
            ("wish_id", Value::from("W1")),
            ("session_id", Value::Null),
            ("user_id", Value::from(2i64)),
        ]),
        row(&[
            ("wish_id", Value::from("W2")),
            ("session_id", Value::from("sess-xyz")),
            ("user_id", Value::Null),
        ]),
    ]);

    let viewer = Identity::session("viewer-s");
    let views = repo.list_latest(10, 0, Some(&viewer)).await.unwrap();

    assert_eq!(conn.query_count(), 3);
    assert_eq!(views.len(), 2);

    assert_eq!(views[0].id, "W1");
    assert_eq!(views[0].author, Identity::user(1));
    assert!(views[0].supported_by_viewer);
    assert_eq!(views[0].supporters, BTreeSet::from(["user_2".to_string()]));

    assert_eq!(views[1].id, "W2");
    assert_eq!(views[1].author, Identity::session("sess-abc"));
    assert!(!views[1].supported_by_viewer);
    assert_eq!(
        views[1].supporters,
        BTreeSet::from(["session_sess-xyz".to_string()])
    );

    let executed = conn.executed();

    // Main query: LEFT JOIN restricted to the viewer's rows, DISTINCT,
    // deterministic ordering, paging applied once.
    let main = &executed[0];
    assert!(main.0.contains("SELECT DISTINCT \"w\".*"));
    assert!(main.0.contains("LEFT JOIN \"supports\" \"s\""));
    assert!(
        main.0
            .contains("ORDER BY \"w\".\"created_at\" DESC, \"w\".\"id\" ASC LIMIT $3 OFFSET $4")
    );
    assert_eq!(
        main.1,
        vec![
            Value::from("viewer-s"),
            Value::Null,
            Value::I64(10),
            Value::I64(0)
        ]
    );

    // Batch lookups use one IN-list query each, never one per wish.
    assert_eq!(
        executed[1].0,
        "SELECT \"wish_id\", \"session_id\" FROM \"sessions\" WHERE \"wish_id\" IN ($1, $2)"
    );
    assert_eq!(executed[1].1, vec![Value::from("W1"), Value::from("W2")]);
    assert_eq!(
        executed[2].0,
        "SELECT \"wish_id\", \"session_id\", \"user_id\" FROM \"supports\" \
         WHERE \"wish_id\" IN ($1, $2)"
    );
}

#[tokio::test]
async fn empty_page_short_circuits_after_one_query() {
    let (conn, repo) = repo(Dialect::Postgres);
    let views = repo.list_latest(10, 0, None).await.unwrap();
    assert!(views.is_empty());
    assert_eq!(conn.query_count(), 1);
}

#[tokio::test]
async fn missing_session_row_synthesizes_fallback_identity() {
    let (conn, repo) = repo(Dialect::Postgres);
    conn.respond_rows(vec![
        wish_row("W1", Some(1), false),
        wish_row("W2", None, false),
    ]);
    // No sessions row for W2, no supporters at all.
    conn.respond_rows(vec![]);
    conn.respond_rows(vec![]);

    let views = repo.list_latest(2, 0, None).await.unwrap();
    assert_eq!(views[0].author, Identity::user(1));
    assert_eq!(views[1].author, Identity::session("session_W2"));
    assert!(views[1].supporters.is_empty());
}

#[tokio::test]
async fn anonymous_viewer_binds_null_identity_params() {
    let (conn, repo) = repo(Dialect::Sqlite);
    conn.respond_rows(vec![wish_row("W1", Some(1), false)]);

    repo.list_latest(5, 10, None).await.unwrap();

    let main = &conn.executed()[0];
    assert!(main.0.contains("LIMIT ? OFFSET ?"));
    assert_eq!(
        main.1,
        vec![Value::Null, Value::Null, Value::I64(5), Value::I64(10)]
    );
}

#[tokio::test]
async fn user_id_wins_when_a_wish_has_both_author_signals() {
    let (conn, repo) = repo(Dialect::Postgres);
    conn.respond_rows(vec![wish_row("W1", Some(4), false)]);
    // A stale sessions row also points at W1; the row's own user id is
    // authoritative.
    conn.respond_rows(vec![row(&[
        ("wish_id", Value::from("W1")),
        ("session_id", Value::from("sess-old")),
    ])]);
    conn.respond_rows(vec![]);

    let views = repo.list_latest(1, 0, None).await.unwrap();
    assert_eq!(views[0].author, Identity::user(4));
}
