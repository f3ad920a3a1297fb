//! User repository: Google-identity-backed accounts.

use chrono::{DateTime, Utc};
use wishwell_schema::tables;

use crate::Result;
use crate::error::Error;
use crate::executor::{QueryExecutor, SelectOptions};
use crate::row::Row;
use crate::value::Value;

/// Profile data delivered by the (out-of-scope) OAuth flow.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub google_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// A stored user row.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub google_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UserRepository {
    exec: QueryExecutor,
}

impl UserRepository {
    pub fn new(exec: QueryExecutor) -> Self {
        Self { exec }
    }

    /// Register or refresh a user keyed on `google_id`.
    ///
    /// Registration is idempotent: the upsert refreshes profile fields on
    /// repeat sign-ins, and a duplicate-key race degrades to reading the
    /// row the other writer created.
    pub async fn find_or_create(&self, profile: &GoogleProfile) -> Result<UserRecord> {
        let upserted = self
            .exec
            .upsert(
                tables::USERS,
                &[
                    ("google_id", Value::from(profile.google_id.clone())),
                    ("display_name", Value::from(profile.display_name.clone())),
                    ("email", Value::from(profile.email.clone())),
                    ("picture", Value::from(profile.picture.clone())),
                    ("created_at", Value::from(Utc::now())),
                ],
                &["google_id"],
            )
            .await;
        match upserted {
            Ok(_) => {}
            Err(err) if err.is_duplicate_key() => {}
            Err(err) => return Err(err),
        }

        self.find_by_google_id(&profile.google_id)
            .await?
            .ok_or(Error::NotFound { what: "user" })
    }

    pub async fn find(&self, id: i64) -> Result<Option<UserRecord>> {
        let out = self
            .exec
            .select(
                tables::USERS,
                SelectOptions {
                    where_eq: vec![("id".into(), Value::from(id))],
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await?;
        out.rows.first().map(user_record_from_row).transpose()
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<UserRecord>> {
        let out = self
            .exec
            .select(
                tables::USERS,
                SelectOptions {
                    where_eq: vec![("google_id".into(), Value::from(google_id))],
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await?;
        out.rows.first().map(user_record_from_row).transpose()
    }
}

fn user_record_from_row(row: &Row) -> Result<UserRecord> {
    Ok(UserRecord {
        id: row.try_i64("id")?,
        google_id: row.try_str("google_id")?.to_string(),
        display_name: row.try_str("display_name")?.to_string(),
        email: row.opt_str("email")?.map(str::to_string),
        picture: row.opt_str("picture")?.map(str::to_string),
        created_at: row.try_timestamp("created_at")?,
    })
}
