//! Session repository: opaque session id → wish mapping for anonymous
//! authors.

use chrono::Utc;
use wishwell_schema::tables;

use crate::Result;
use crate::error::Error;
use crate::executor::{QueryExecutor, SelectOptions};
use crate::value::Value;

#[derive(Clone)]
pub struct SessionRepository {
    exec: QueryExecutor,
}

impl SessionRepository {
    pub fn new(exec: QueryExecutor) -> Self {
        Self { exec }
    }

    /// Record which wish a session created. A session maps to exactly one
    /// wish; a second insert for the same session id reports
    /// [`Error::AlreadyExists`].
    pub async fn create(&self, session_id: &str, wish_id: &str) -> Result<()> {
        let inserted = self
            .exec
            .insert(
                tables::SESSIONS,
                &[
                    ("session_id", Value::from(session_id)),
                    ("wish_id", Value::from(wish_id)),
                    ("created_at", Value::from(Utc::now())),
                ],
            )
            .await;
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if err.is_duplicate_key() => Err(Error::AlreadyExists { what: "session" }),
            Err(err) => Err(err),
        }
    }

    /// The wish this session created, if any.
    pub async fn find_wish_id(&self, session_id: &str) -> Result<Option<String>> {
        let out = self
            .exec
            .select(
                tables::SESSIONS,
                SelectOptions {
                    columns: vec!["wish_id".into()],
                    where_eq: vec![("session_id".into(), Value::from(session_id))],
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await?;
        match out.rows.first() {
            Some(row) => Ok(Some(row.try_str("wish_id")?.to_string())),
            None => Ok(None),
        }
    }
}
