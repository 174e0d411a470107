//! Postgres backend.
//!
//! One file per repository trait. Rows are read into `*Row` structs and
//! converted into aggregates with `TryFrom`, so an unexpected enum value in a
//! text column surfaces as a storage error instead of a panic.

mod cart;
mod catalog;
mod hero;
mod orders;
mod reviews;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::{EcommerceError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Opens a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`sqlx::Error`] if the connection cannot be established.
    pub async fn connect(database_url: &str, config: PoolConfig) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Maps a unique violation to `on_conflict`, anything else to a database error.
fn conflict_or(e: sqlx::Error, on_conflict: impl FnOnce() -> EcommerceError) -> EcommerceError {
    if is_unique_violation(&e) { on_conflict() } else { EcommerceError::Database(e) }
}

fn corrupt(column: &str, value: impl std::fmt::Display) -> EcommerceError {
    EcommerceError::StorageError(format!("unexpected value in {column}: {value}"))
}

fn to_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| EcommerceError::validation(format!("{field} is too large")))
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| corrupt(column, value))
}
