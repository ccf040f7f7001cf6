//! Database-layer errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("mysql: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("row not found")]
    NotFound,
}
