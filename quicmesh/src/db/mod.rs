//! Relational storage: connection pooling and transaction leasing (§4.6).

pub mod error;
pub mod models;
pub mod pool;
pub mod tx;

pub use error::Error;
pub use pool::DbPool;
pub use tx::TxGuard;

/// Run the `migrations/` directory against `url` with a short-lived pool,
/// creating `game_servers`/`game_processes` (§3) if they don't already
/// exist. Called once at startup, before [`DbPool::connect`].
pub async fn migrate(url: &str) -> Result<(), Error> {
    let pool = sqlx::MySqlPool::connect(url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    pool.close().await;
    Ok(())
}
