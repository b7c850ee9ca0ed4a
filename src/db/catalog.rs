use crate::db::models::{CatalogColumn, TableInfo};
use crate::db::DbError;
use duckdb::{Connection, Row};

// Both queries are scoped to the connection's current database and schema,
// which keeps the service's own tables (schema `chatbi`) out of the results.

const TABLES_QUERY: &str = "
    SELECT table_name, comment, estimated_size
    FROM duckdb_tables()
    WHERE database_name = current_database()
      AND schema_name = current_schema()
      AND NOT internal
      AND NOT temporary
    ORDER BY table_name
";

const COLUMNS_QUERY: &str = "
    SELECT
        table_name,
        column_name,
        data_type,
        CASE WHEN is_nullable THEN 'YES' ELSE 'NO' END AS is_nullable,
        column_default,
        comment
    FROM duckdb_columns()
    WHERE database_name = current_database()
      AND schema_name = current_schema()
      AND NOT internal
";

/// Base tables of the current schema with their comments and row estimates.
pub fn table_info(conn: &Connection) -> Result<Vec<TableInfo>, DbError> {
    let mut stmt = conn.prepare(TABLES_QUERY)?;
    let tables = stmt
        .query_map([], |row| {
            Ok(TableInfo {
                table_name: row.get(0)?,
                comment: non_empty(row.get(1)?),
                estimated_rows: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tables)
}

/// Columns of the current schema ordered by table and ordinal position,
/// optionally restricted to a single table.
pub fn column_info(conn: &Connection, table_filter: Option<&str>) -> Result<Vec<CatalogColumn>, DbError> {
    let columns = match table_filter {
        Some(table) => {
            let sql = format!("{} AND table_name = ? ORDER BY table_name, column_index", COLUMNS_QUERY);
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map([table], map_column)?
                .collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let sql = format!("{} ORDER BY table_name, column_index", COLUMNS_QUERY);
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map([], map_column)?
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(columns)
}

fn map_column(row: &Row<'_>) -> duckdb::Result<CatalogColumn> {
    Ok(CatalogColumn {
        table_name: row.get(0)?,
        column_name: row.get(1)?,
        data_type: row.get(2)?,
        is_nullable: row.get(3)?,
        default_value: row.get(4)?,
        comment: non_empty(row.get(5)?),
    })
}

// DuckDB reports a missing comment as NULL or as an empty string depending on version.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
