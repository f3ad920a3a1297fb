//! Support mutations and wish/user lifecycle against the scripted
//! connection.

mod support;

use std::sync::Arc;

use support::{FakeConnection, duplicate_key_error, row, ts, wish_row};
use wishwell::{
    Dialect, Error, GoogleProfile, Identity, NewWish, QueryExecutor, QueryOutput,
    SessionRepository, UserRepository, Value, WishRepository,
};

fn repo(dialect: Dialect) -> (Arc<FakeConnection>, WishRepository) {
    let conn = Arc::new(FakeConnection::new(dialect));
    let repo = WishRepository::new(QueryExecutor::new(conn.clone()));
    (conn, repo)
}

const RECOUNT_SQL: &str = "SET \"support_count\" = (SELECT COUNT(*) FROM \"supports\"";

#[tokio::test]
async fn has_supported_without_identity_issues_no_query() {
    let (conn, repo) = repo(Dialect::Postgres);
    assert!(!repo.has_supported("W1", None).await.unwrap());
    assert_eq!(conn.query_count(), 0);
}

#[tokio::test]
async fn add_support_inserts_then_recomputes() {
    let (conn, repo) = repo(Dialect::Postgres);
    let viewer = Identity::user(2);
    repo.add_support("W1", Some(&viewer)).await.unwrap();

    let executed = conn.executed();
    assert_eq!(executed.len(), 3);

    // Existence pre-check.
    assert!(executed[0].0.starts_with("SELECT \"id\" FROM \"supports\""));

    // The insert forces session_id to NULL for a user supporter.
    assert_eq!(
        executed[1].0,
        "INSERT INTO \"supports\" (\"wish_id\", \"session_id\", \"user_id\", \"created_at\") \
         VALUES ($1, $2, $3, $4)"
    );
    assert_eq!(executed[1].1[0], Value::from("W1"));
    assert_eq!(executed[1].1[1], Value::Null);
    assert_eq!(executed[1].1[2], Value::I64(2));

    // The counter is recomputed from the supports table, not incremented.
    assert!(executed[2].0.contains(RECOUNT_SQL));
}

#[tokio::test]
async fn add_support_twice_is_idempotent() {
    let (conn, repo) = repo(Dialect::Postgres);
    let viewer = Identity::user(2);
    // The pre-check finds an existing row.
    conn.respond_rows(vec![row(&[("id", Value::from(11i64))])]);

    repo.add_support("W1", Some(&viewer)).await.unwrap();

    // Only the existence check ran: no insert, no recount.
    assert_eq!(conn.query_count(), 1);
}

#[tokio::test]
async fn add_support_swallows_duplicate_key_race() {
    let (conn, repo) = repo(Dialect::Postgres);
    let viewer = Identity::session("sess-1");
    conn.respond(QueryOutput::empty()); // pre-check: not yet supported
    conn.respond_err(duplicate_key_error()); // a second writer won the insert

    repo.add_support("W1", Some(&viewer)).await.unwrap();

    // Check, failed insert, recount: the race resolves to "already
    // supported" and the counter still gets recomputed.
    let executed = conn.executed();
    assert_eq!(executed.len(), 3);
    assert!(executed[2].0.contains(RECOUNT_SQL));
}

#[tokio::test]
async fn add_support_without_identity_is_a_no_op() {
    let (conn, repo) = repo(Dialect::Postgres);
    repo.add_support("W1", None).await.unwrap();
    assert_eq!(conn.query_count(), 0);
}

#[tokio::test]
async fn remove_support_deletes_then_recomputes() {
    let (conn, repo) = repo(Dialect::Postgres);
    let viewer = Identity::session("sess-1");
    repo.remove_support("W1", Some(&viewer)).await.unwrap();

    let executed = conn.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(
        executed[0].0,
        "DELETE FROM \"supports\" WHERE \"wish_id\" = $1 AND \"session_id\" = $2"
    );
    assert!(executed[1].0.contains(RECOUNT_SQL));
}

#[tokio::test]
async fn remove_support_without_identity_is_a_no_op() {
    let (conn, repo) = repo(Dialect::Postgres);
    repo.remove_support("W1", None).await.unwrap();
    assert_eq!(conn.query_count(), 0);
}

#[tokio::test]
async fn support_lifecycle_recomputes_once_per_mutation() {
    let (conn, repo) = repo(Dialect::Postgres);
    let viewer = Identity::user(2);

    // Fresh add: check (empty), insert, recount.
    repo.add_support("W1", Some(&viewer)).await.unwrap();
    // Second add: check finds the row, stops there.
    conn.respond_rows(vec![row(&[("id", Value::from(11i64))])]);
    repo.add_support("W1", Some(&viewer)).await.unwrap();
    // Remove: delete, recount.
    repo.remove_support("W1", Some(&viewer)).await.unwrap();

    let recounts = conn
        .executed()
        .iter()
        .filter(|(sql, _)| sql.contains(RECOUNT_SQL))
        .count();
    assert_eq!(recounts, 2);
}

#[tokio::test]
async fn create_wish_enforces_one_wish_per_author() {
    let (conn, repo) = repo(Dialect::Postgres);
    // The author pre-check finds an existing wish.
    conn.respond_rows(vec![wish_row("W1", Some(1), false)]);

    let err = repo
        .create_wish(NewWish {
            name: None,
            content: "another one".into(),
            author: Identity::user(1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { what: "wish" }));
    assert_eq!(conn.query_count(), 1);
}

#[tokio::test]
async fn create_wish_for_session_author_writes_session_row() {
    let (conn, repo) = repo(Dialect::Postgres);

    let record = repo
        .create_wish(NewWish {
            name: Some("anon".into()),
            content: "wish content".into(),
            author: Identity::session("sess-9"),
        })
        .await
        .unwrap();

    assert_eq!(record.user_id, None);
    assert_eq!(record.support_count, 0);

    let executed = conn.executed();
    // Author pre-check (sessions lookup), wish insert, session insert.
    assert_eq!(executed.len(), 3);
    assert!(executed[0].0.starts_with("SELECT \"wish_id\" FROM \"sessions\""));
    assert!(executed[1].0.starts_with("INSERT INTO \"wishes\""));
    assert!(executed[2].0.starts_with("INSERT INTO \"sessions\""));
    assert_eq!(executed[2].1[0], Value::from("sess-9"));
    assert_eq!(executed[2].1[1], Value::from(record.id.as_str()));
}

#[tokio::test]
async fn update_wish_of_missing_row_is_an_error() {
    let (_conn, repo) = repo(Dialect::Postgres);
    // Default scripted response: zero rows affected.
    let err = repo
        .update_wish("W-missing", None, "new content".into())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { what: "wish" }));
}

#[tokio::test]
async fn session_mapping_is_one_to_one() {
    let conn = Arc::new(FakeConnection::new(Dialect::Postgres));
    let sessions = SessionRepository::new(QueryExecutor::new(conn.clone()));

    conn.respond(QueryOutput::affected(1));
    sessions.create("sess-1", "W1").await.unwrap();

    conn.respond_err(duplicate_key_error());
    let err = sessions.create("sess-1", "W2").await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { what: "session" }));

    conn.respond_rows(vec![row(&[("wish_id", Value::from("W1"))])]);
    assert_eq!(
        sessions.find_wish_id("sess-1").await.unwrap().as_deref(),
        Some("W1")
    );
    assert_eq!(sessions.find_wish_id("sess-2").await.unwrap(), None);
}

#[tokio::test]
async fn user_registration_upserts_then_reads_back() {
    let conn = Arc::new(FakeConnection::new(Dialect::Postgres));
    let users = UserRepository::new(QueryExecutor::new(conn.clone()));

    conn.respond(QueryOutput::affected(1));
    conn.respond_rows(vec![row(&[
        ("id", Value::from(7i64)),
        ("google_id", Value::from("g-123")),
        ("display_name", Value::from("Momo")),
        ("email", Value::Null),
        ("picture", Value::Null),
        ("created_at", Value::from(ts(1))),
    ])]);

    let user = users
        .find_or_create(&GoogleProfile {
            google_id: "g-123".into(),
            display_name: "Momo".into(),
            email: None,
            picture: None,
        })
        .await
        .unwrap();

    assert_eq!(user.id, 7);
    assert_eq!(user.google_id, "g-123");

    let executed = conn.executed();
    assert_eq!(executed.len(), 2);
    assert!(executed[0].0.contains("ON CONFLICT (\"google_id\")"));
    assert!(executed[1].0.starts_with("SELECT * FROM \"users\""));
}
