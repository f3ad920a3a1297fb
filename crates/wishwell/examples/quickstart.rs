//! End-to-end walkthrough against a SQLite database.
//!
//! Run with `cargo run --example quickstart`; set `DATABASE_DIALECT` and
//! `DATABASE_URL` (or a `.env` file) to point it at Postgres or MySQL
//! instead.

use wishwell::{
    DatabaseConfig, Dialect, Identity, NewWish, QueryExecutor, WishRepository, connect,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let config = DatabaseConfig::from_env()
        .unwrap_or_else(|_| DatabaseConfig::new(Dialect::Sqlite, ":memory:"));
    let conn = connect(&config).await?;
    conn.initialize_database().await?;

    let wishes = WishRepository::new(QueryExecutor::new(conn.clone()));

    let author = Identity::session("demo-session");
    let wish = wishes
        .create_wish(NewWish {
            name: Some("demo".into()),
            content: "may every query stay at three".into(),
            author,
        })
        .await?;
    println!("created wish {}", wish.id);

    let supporter = Identity::session("another-session");
    wishes.add_support(&wish.id, Some(&supporter)).await?;

    for view in wishes.list_latest(10, 0, Some(&supporter)).await? {
        println!(
            "{} — {} supports, supported by viewer: {}, author {}",
            view.content,
            view.support_count,
            view.supported_by_viewer,
            view.author.tag(),
        );
    }

    conn.close().await?;
    Ok(())
}
