//! Wish repository: batch loading and support mutation.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wishwell_schema::tables;
use wishwell_sql::{Expr, JoinKind, OrderBy, SelectColumn};

use crate::Result;
use crate::error::Error;
use crate::executor::{JoinClause, JoinSelect, QueryExecutor, SelectOptions};
use crate::identity::Identity;
use crate::row::{QueryOutput, Row};
use crate::value::Value;

/// A stored wish row.
#[derive(Debug, Clone, PartialEq)]
pub struct WishRecord {
    pub id: String,
    pub name: Option<String>,
    pub content: String,
    /// Set for user-authored wishes; session authors resolve through the
    /// sessions table.
    pub user_id: Option<i64>,
    pub support_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A wish assembled for display: row data plus resolved author identity,
/// the viewer's support status, and the full supporter set.
#[derive(Debug, Clone, PartialEq)]
pub struct WishView {
    pub id: String,
    pub name: Option<String>,
    pub content: String,
    pub author: Identity,
    pub support_count: i64,
    pub created_at: DateTime<Utc>,
    pub supported_by_viewer: bool,
    /// Supporter identities in tagged form (`user_<id>` / `session_<id>`).
    pub supporters: BTreeSet<String>,
}

/// Input for [`WishRepository::create_wish`]. Content invariants (length
/// bounds, trimming) are the service layer's responsibility and are
/// trusted here.
#[derive(Debug, Clone)]
pub struct NewWish {
    pub name: Option<String>,
    pub content: String,
    pub author: Identity,
}

/// The aggregate root of the persistence layer.
#[derive(Clone)]
pub struct WishRepository {
    exec: QueryExecutor,
}

impl WishRepository {
    pub fn new(exec: QueryExecutor) -> Self {
        Self { exec }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.exec
    }

    /// Create a wish for an author that does not have one yet.
    ///
    /// One wish per author identity: a pre-check rejects a second wish
    /// with [`Error::AlreadyExists`]. Session authors additionally get a
    /// sessions row mapping their session id to the new wish.
    pub async fn create_wish(&self, new: NewWish) -> Result<WishRecord> {
        if self.find_wish_by_author(&new.author).await?.is_some() {
            return Err(Error::AlreadyExists { what: "wish" });
        }

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let user_id = new.author.user_id();

        self.exec
            .insert(
                tables::WISHES,
                &[
                    ("id", Value::from(id.clone())),
                    ("name", Value::from(new.name.clone())),
                    ("wish", Value::from(new.content.clone())),
                    ("created_at", Value::from(created_at)),
                    ("user_id", Value::from(user_id)),
                    ("support_count", Value::from(0i64)),
                ],
            )
            .await?;

        if let Identity::Session(session_id) = &new.author {
            self.exec
                .insert(
                    tables::SESSIONS,
                    &[
                        ("session_id", Value::from(session_id.clone())),
                        ("wish_id", Value::from(id.clone())),
                        ("created_at", Value::from(created_at)),
                    ],
                )
                .await?;
        }

        Ok(WishRecord {
            id,
            name: new.name,
            content: new.content,
            user_id,
            support_count: 0,
            created_at,
        })
    }

    /// Look up a wish by id. Absence is `None`, not an error.
    pub async fn find_wish(&self, id: &str) -> Result<Option<WishRecord>> {
        let out = self
            .exec
            .select(
                tables::WISHES,
                SelectOptions {
                    where_eq: vec![("id".into(), Value::from(id))],
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await?;
        out.rows.first().map(wish_record_from_row).transpose()
    }

    /// Resolve "my wish" for either identity kind.
    pub async fn find_wish_by_author(&self, author: &Identity) -> Result<Option<WishRecord>> {
        match author {
            Identity::User(user_id) => {
                let out = self
                    .exec
                    .select(
                        tables::WISHES,
                        SelectOptions {
                            where_eq: vec![("user_id".into(), Value::from(*user_id))],
                            limit: Some(1),
                            ..Default::default()
                        },
                    )
                    .await?;
                out.rows.first().map(wish_record_from_row).transpose()
            }
            Identity::Session(session_id) => {
                let out = self
                    .exec
                    .select(
                        tables::SESSIONS,
                        SelectOptions {
                            columns: vec!["wish_id".into()],
                            where_eq: vec![("session_id".into(), Value::from(session_id.clone()))],
                            limit: Some(1),
                            ..Default::default()
                        },
                    )
                    .await?;
                match out.rows.first() {
                    Some(row) => self.find_wish(row.try_str("wish_id")?).await,
                    None => Ok(None),
                }
            }
        }
    }

    /// Update a wish's name and content in place. Identity and creation
    /// time persist; updating a missing wish is an error.
    pub async fn update_wish(
        &self,
        id: &str,
        name: Option<String>,
        content: String,
    ) -> Result<()> {
        let out = self
            .exec
            .update(
                tables::WISHES,
                &[("name", Value::from(name)), ("wish", Value::from(content))],
                &[("id", Value::from(id))],
            )
            .await?;
        if out.row_count == 0 {
            return Err(Error::NotFound { what: "wish" });
        }
        Ok(())
    }

    /// Load the latest page of wishes as view objects, in exactly three
    /// queries regardless of page size.
    ///
    /// 1. One SELECT over wishes LEFT JOINed to the viewer's own support
    ///    rows, DISTINCT, ordered by `created_at DESC, id`, paged with
    ///    LIMIT/OFFSET. An empty page short-circuits here.
    /// 2. One `IN (…)` query over sessions for the page's id set,
    ///    resolving session authors.
    /// 3. One `IN (…)` query over supports for the same id set, grouped
    ///    client-side into per-wish supporter tag sets.
    pub async fn list_latest(
        &self,
        limit: i64,
        offset: i64,
        viewer: Option<&Identity>,
    ) -> Result<Vec<WishView>> {
        // An absent viewer binds NULL for both identity params, which
        // matches no support row.
        let viewer_session = viewer.and_then(|v| v.session_id()).map(str::to_string);
        let viewer_user = viewer.and_then(|v| v.user_id());

        let main = JoinSelect {
            table: tables::WISHES.into(),
            alias: Some("w".into()),
            distinct: true,
            columns: vec![
                SelectColumn::all_from("w"),
                SelectColumn::aliased(
                    Expr::qualified_column("s", "id").is_not_null(),
                    "is_supported_by_viewer",
                ),
            ],
            joins: vec![JoinClause {
                kind: JoinKind::Left,
                table: tables::SUPPORTS.into(),
                alias: Some("s".into()),
                on: Expr::qualified_column("s", "wish_id")
                    .eq(Expr::qualified_column("w", "id"))
                    .and(
                        Expr::qualified_column("s", "session_id")
                            .eq(Expr::param("viewer_session_id"))
                            .or(Expr::qualified_column("s", "user_id")
                                .eq(Expr::param("viewer_user_id"))),
                    ),
            }],
            order_by: vec![
                OrderBy::desc(Expr::qualified_column("w", "created_at")),
                OrderBy::asc(Expr::qualified_column("w", "id")),
            ],
            limit: Some(limit),
            offset: Some(offset),
            params: vec![
                ("viewer_session_id".into(), Value::from(viewer_session)),
                ("viewer_user_id".into(), Value::from(viewer_user)),
            ],
            ..Default::default()
        };

        let page = self.exec.select_with_join(main).await?;
        if page.rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids = page
            .rows
            .iter()
            .map(|row| row.try_str("id").map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        // Sessions exist only for session-authored wishes, so the full
        // page id set is a valid key for both batch lookups.
        let sessions = self
            .select_in(tables::SESSIONS, &["wish_id", "session_id"], "wish_id", &ids)
            .await?;
        let mut session_by_wish: HashMap<String, String> = HashMap::new();
        for row in &sessions.rows {
            session_by_wish.insert(
                row.try_str("wish_id")?.to_string(),
                row.try_str("session_id")?.to_string(),
            );
        }

        let supports = self
            .select_in(
                tables::SUPPORTS,
                &["wish_id", "session_id", "user_id"],
                "wish_id",
                &ids,
            )
            .await?;
        let mut supporters: HashMap<String, BTreeSet<String>> = HashMap::new();
        for row in &supports.rows {
            let supporter = Identity::from_parts(
                row.opt_i64("user_id")?,
                row.opt_str("session_id")?.map(str::to_string),
            );
            if let Some(supporter) = supporter {
                supporters
                    .entry(row.try_str("wish_id")?.to_string())
                    .or_default()
                    .insert(supporter.tag());
            }
        }

        let mut views = Vec::with_capacity(page.rows.len());
        for row in &page.rows {
            let record = wish_record_from_row(row)?;
            let author = match record.user_id {
                Some(user_id) => Identity::User(user_id),
                None => match session_by_wish.remove(&record.id) {
                    Some(session_id) => Identity::Session(session_id),
                    None => {
                        // The session row is gone; synthesize a
                        // deterministic placeholder identity from the wish
                        // id so the view still renders.
                        tracing::warn!(wish_id = %record.id, "missing session row for wish");
                        Identity::Session(format!("session_{}", record.id))
                    }
                },
            };
            views.push(WishView {
                supported_by_viewer: row.try_bool("is_supported_by_viewer")?,
                supporters: supporters.remove(&record.id).unwrap_or_default(),
                id: record.id,
                name: record.name,
                content: record.content,
                author,
                support_count: record.support_count,
                created_at: record.created_at,
            });
        }
        Ok(views)
    }

    /// Whether the given identity already supports the wish. With no
    /// identity at all this is `false` without touching the database.
    pub async fn has_supported(&self, wish_id: &str, viewer: Option<&Identity>) -> Result<bool> {
        let Some(viewer) = viewer else {
            return Ok(false);
        };
        let (column, value) = identity_predicate(viewer);
        let out = self
            .exec
            .select(
                tables::SUPPORTS,
                SelectOptions {
                    columns: vec!["id".into()],
                    where_eq: vec![("wish_id".into(), Value::from(wish_id)), (column.into(), value)],
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await?;
        Ok(!out.rows.is_empty())
    }

    /// Record a support. Idempotent: an existing support row (found by the
    /// pre-check or reported by the unique index when a second writer
    /// races past it) leaves the state unchanged. The denormalized counter
    /// is recomputed from the supports table afterwards.
    pub async fn add_support(&self, wish_id: &str, viewer: Option<&Identity>) -> Result<()> {
        let Some(viewer) = viewer else {
            return Ok(());
        };
        if self.has_supported(wish_id, Some(viewer)).await? {
            return Ok(());
        }

        // session_id is forced to NULL when a user id is present, so a
        // row is never ambiguous between the two identity kinds.
        let inserted = self
            .exec
            .insert(
                tables::SUPPORTS,
                &[
                    ("wish_id", Value::from(wish_id)),
                    (
                        "session_id",
                        Value::from(viewer.session_id().map(str::to_string)),
                    ),
                    ("user_id", Value::from(viewer.user_id())),
                    ("created_at", Value::from(Utc::now())),
                ],
            )
            .await;
        match inserted {
            Ok(_) => {}
            // The unique index is the final authority on the
            // check-then-act race: a duplicate key means "already
            // supported".
            Err(err) if err.is_duplicate_key() => {}
            Err(err) => return Err(err),
        }

        self.exec.update_support_count(wish_id).await?;
        Ok(())
    }

    /// Remove a support and recompute the counter. Removing a support
    /// that does not exist is not an error, and a call without any
    /// identity is a silent no-op.
    pub async fn remove_support(&self, wish_id: &str, viewer: Option<&Identity>) -> Result<()> {
        let Some(viewer) = viewer else {
            return Ok(());
        };
        let (column, value) = identity_predicate(viewer);
        self.exec
            .delete(
                tables::SUPPORTS,
                &[("wish_id", Value::from(wish_id)), (column, value)],
            )
            .await?;
        self.exec.update_support_count(wish_id).await?;
        Ok(())
    }

    /// One `IN (…)` query keyed by the id set — batch loading instead of
    /// one query per row.
    async fn select_in(
        &self,
        table: &str,
        columns: &[&str],
        key: &str,
        ids: &[String],
    ) -> Result<QueryOutput> {
        let dialect = self.exec.dialect();
        let column_list = columns
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=ids.len())
            .map(|i| dialect.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {column_list} FROM {} WHERE {} IN ({placeholders})",
            dialect.quote_ident(table),
            dialect.quote_ident(key),
        );
        let params = ids.iter().map(|id| Value::from(id.clone())).collect();
        self.exec.raw(&sql, params).await
    }
}

fn identity_predicate(identity: &Identity) -> (&'static str, Value) {
    match identity {
        Identity::User(user_id) => ("user_id", Value::from(*user_id)),
        Identity::Session(session_id) => ("session_id", Value::from(session_id.clone())),
    }
}

fn wish_record_from_row(row: &Row) -> Result<WishRecord> {
    Ok(WishRecord {
        id: row.try_str("id")?.to_string(),
        name: row.opt_str("name")?.map(str::to_string),
        content: row.try_str("wish")?.to_string(),
        user_id: row.opt_i64("user_id")?,
        support_count: row.try_i64("support_count")?,
        created_at: row.try_timestamp("created_at")?,
    })
}
