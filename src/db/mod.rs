pub mod catalog;
pub mod db_pool;
pub mod db_utils;
pub mod executor;
pub mod history;
pub mod models;
pub mod schema_store;

use crate::db::db_pool::DuckDBConnectionManager;
use duckdb::Connection;
use r2d2::{Pool, PooledConnection};
use thiserror::Error;
use tracing::info;

pub type DbPool = Pool<DuckDBConnectionManager>;
pub type DbConnection = PooledConnection<DuckDBConnectionManager>;

/// Schema holding the service's own bookkeeping tables. It is kept apart
/// from the default schema so catalog introspection never reports them.
pub const INTERNAL_SCHEMA: &str = "chatbi";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Duckdb(#[from] duckdb::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Database task failed: {0}")]
    Task(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0} not found")]
    NotFound(String),
}

impl From<tokio::task::JoinError> for DbError {
    fn from(err: tokio::task::JoinError) -> Self {
        DbError::Task(err.to_string())
    }
}

pub fn build_pool(connection_string: &str, pool_size: usize) -> Result<DbPool, DbError> {
    let manager = DuckDBConnectionManager::new(connection_string.to_string())?;
    let pool = Pool::builder()
        .max_size(pool_size.max(1) as u32)
        .build(manager)?;
    Ok(pool)
}

/// Runs blocking DuckDB work on the blocking thread pool with one pooled
/// connection, released when the closure returns.
pub async fn with_connection<T, F>(pool: &DbPool, f: F) -> Result<T, DbError>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T, DbError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut *conn)
    })
    .await?
}

/// Creates the history and schema-cache tables if they are missing.
pub fn init_storage(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(&format!(
        "
        CREATE SCHEMA IF NOT EXISTS {schema};
        CREATE SEQUENCE IF NOT EXISTS {schema}.query_history_id_seq START 1;
        CREATE TABLE IF NOT EXISTS {schema}.query_history (
            id BIGINT PRIMARY KEY DEFAULT nextval('{schema}.query_history_id_seq'),
            natural_language_query VARCHAR NOT NULL,
            generated_sql VARCHAR NOT NULL,
            execution_result VARCHAR,
            execution_time BIGINT,
            status VARCHAR NOT NULL,
            created_at VARCHAR NOT NULL
        );
        CREATE SEQUENCE IF NOT EXISTS {schema}.database_schema_id_seq START 1;
        CREATE TABLE IF NOT EXISTS {schema}.database_schema (
            id BIGINT PRIMARY KEY DEFAULT nextval('{schema}.database_schema_id_seq'),
            table_name VARCHAR NOT NULL,
            column_name VARCHAR NOT NULL,
            data_type VARCHAR NOT NULL,
            is_nullable VARCHAR NOT NULL,
            column_comment VARCHAR,
            table_comment VARCHAR
        );
        ",
        schema = INTERNAL_SCHEMA
    ))?;

    info!("Storage tables verified in schema '{}'", INTERNAL_SCHEMA);
    Ok(())
}
