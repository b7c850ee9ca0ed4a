use crate::db::models::SchemaColumn;
use crate::db::{catalog, with_connection, DbError, DbPool, INTERNAL_SCHEMA};
use duckdb::params;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub tables: usize,
    pub columns: usize,
}

/// Persisted copy of the target database's table and column metadata.
#[derive(Clone)]
pub struct SchemaStore {
    pool: DbPool,
}

impl SchemaStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Replaces the stored column set with a fresh read of the catalog.
    ///
    /// The catalog is read before anything is touched, and the delete and
    /// inserts share one transaction: a failure at any point leaves the
    /// previously stored schema in place.
    pub async fn refresh(&self) -> Result<RefreshSummary, DbError> {
        info!("Refreshing schema cache");

        let summary = with_connection(&self.pool, |conn| {
            let tables = catalog::table_info(conn)?;
            let columns = catalog::column_info(conn, None)?;

            let table_comments: HashMap<&str, Option<&str>> = tables
                .iter()
                .map(|t| (t.table_name.as_str(), t.comment.as_deref()))
                .collect();

            let tx = conn.transaction()?;
            tx.execute(&format!("DELETE FROM {}.database_schema", INTERNAL_SCHEMA), [])?;
            {
                let mut insert = tx.prepare(&format!(
                    "INSERT INTO {}.database_schema
                        (table_name, column_name, data_type, is_nullable, column_comment, table_comment)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    INTERNAL_SCHEMA
                ))?;

                for column in &columns {
                    let table_comment = table_comments
                        .get(column.table_name.as_str())
                        .copied()
                        .flatten();
                    insert.execute(params![
                        column.table_name,
                        column.column_name,
                        column.data_type,
                        column.is_nullable,
                        column.comment,
                        table_comment,
                    ])?;
                }
            }
            tx.commit()?;

            Ok(RefreshSummary {
                tables: tables.len(),
                columns: columns.len(),
            })
        })
        .await?;

        info!(
            "Schema refreshed successfully. Found {} columns in {} tables.",
            summary.columns, summary.tables
        );
        Ok(summary)
    }

    /// All stored columns, in the order they were written.
    pub async fn list(&self) -> Result<Vec<SchemaColumn>, DbError> {
        with_connection(&self.pool, |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT table_name, column_name, data_type, is_nullable, column_comment, table_comment
                 FROM {}.database_schema
                 ORDER BY id",
                INTERNAL_SCHEMA
            ))?;

            let columns = stmt
                .query_map([], |row| {
                    Ok(SchemaColumn {
                        table_name: row.get(0)?,
                        column_name: row.get(1)?,
                        data_type: row.get(2)?,
                        is_nullable: row.get(3)?,
                        column_comment: row.get(4)?,
                        table_comment: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(columns)
        })
        .await
    }

    pub async fn is_empty(&self) -> Result<bool, DbError> {
        with_connection(&self.pool, |conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT count(*) FROM {}.database_schema", INTERNAL_SCHEMA),
                [],
                |row| row.get(0),
            )?;
            Ok(count == 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;

    fn seeded_store() -> SchemaStore {
        let pool = memory_pool();
        pool.get()
            .unwrap()
            .execute_batch(
                "
                CREATE TABLE customers (id INTEGER NOT NULL, name VARCHAR, email VARCHAR);
                COMMENT ON TABLE customers IS 'People who buy things';
                CREATE TABLE invoices (id INTEGER, total DECIMAL(10, 2));
                ",
            )
            .unwrap();
        SchemaStore::new(pool)
    }

    #[tokio::test]
    async fn refresh_stores_one_row_per_catalog_column() {
        let store = seeded_store();
        assert!(store.is_empty().await.unwrap());

        let summary = store.refresh().await.unwrap();
        assert_eq!(summary, RefreshSummary { tables: 2, columns: 5 });

        let columns = store.list().await.unwrap();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].table_name, "customers");
        assert_eq!(columns[0].column_name, "id");
        assert_eq!(columns[0].is_nullable, "NO");
        assert_eq!(columns[0].table_comment.as_deref(), Some("People who buy things"));
        assert_eq!(columns[4].table_name, "invoices");
        assert_eq!(columns[4].table_comment, None);
    }

    #[tokio::test]
    async fn refresh_replaces_instead_of_merging() {
        let store = seeded_store();
        store.refresh().await.unwrap();

        store
            .pool
            .get()
            .unwrap()
            .execute_batch("DROP TABLE invoices;")
            .unwrap();

        let summary = store.refresh().await.unwrap();
        assert_eq!(summary, RefreshSummary { tables: 1, columns: 3 });

        let columns = store.list().await.unwrap();
        assert_eq!(columns.len(), 3);
        assert!(columns.iter().all(|c| c.table_name == "customers"));
    }

    #[tokio::test]
    async fn internal_tables_are_not_part_of_the_schema() {
        let store = seeded_store();
        store.refresh().await.unwrap();

        let columns = store.list().await.unwrap();
        assert!(columns
            .iter()
            .all(|c| c.table_name != "query_history" && c.table_name != "database_schema"));
    }
}
