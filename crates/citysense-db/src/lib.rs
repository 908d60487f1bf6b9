//! PostgreSQL storage gateway for sensors, readings and derived metrics
//!
//! Tables are bootstrapped with `CREATE TABLE IF NOT EXISTS` on startup;
//! there is no migration history.

pub mod client;
pub mod queries;
pub mod schema;
pub mod store;

pub use client::*;
pub use schema::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

pub type DbResult<T> = Result<T, DbError>;
