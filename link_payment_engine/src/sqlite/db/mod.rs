//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Timestamps are always supplied by the caller, so that every row is written in the same format.
use std::env;

use log::info;
use sqlx::{
    migrate::{MigrateDatabase, MigrateError},
    sqlite::SqlitePoolOptions,
    Error as SqlxError,
    Sqlite,
    SqlitePool,
};

pub mod history;
pub mod merchants;
pub mod payments;
pub mod sessions;
pub mod webhook_logs;

const SQLITE_DB_URL: &str = "sqlite://data/link_gateway.db";

pub fn db_url() -> String {
    let result = env::var("LPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ LPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        info!("🗃️ Creating new database at {url}");
        Sqlite::create_database(url).await?;
    }
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./src/sqlite/migrations").run(pool).await?;
    info!("🗃️ Database migrations complete");
    Ok(())
}
