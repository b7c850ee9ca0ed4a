use crate::db::catalog;
use crate::db::db_utils::value_to_json;
use crate::db::models::{CatalogColumn, Row, TableInfo};
use crate::db::{with_connection, DbError, DbPool};
use duckdb::types::Value;
use duckdb::Connection;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const DEFAULT_ROW_CAP: usize = 1000;

static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\b").expect("valid limit regex"));

/// Result of running one statement. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Rows {
        columns: Vec<String>,
        rows: Vec<Row>,
        row_count: usize,
        execution_time: u64,
    },
    Affected {
        affected_rows: usize,
        execution_time: u64,
    },
    Failed {
        error: String,
        execution_time: u64,
    },
}

impl ExecutionOutcome {
    /// Wall-clock milliseconds from the start of the call.
    pub fn execution_time(&self) -> u64 {
        match self {
            ExecutionOutcome::Rows { execution_time, .. }
            | ExecutionOutcome::Affected { execution_time, .. }
            | ExecutionOutcome::Failed { execution_time, .. } => *execution_time,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ExecutionOutcome::Failed { .. })
    }
}

enum StatementResult {
    Rows(Vec<String>, Vec<Row>),
    Affected(usize),
}

pub fn is_select(sql: &str) -> bool {
    sql.trim().to_lowercase().starts_with("select")
}

/// Appends `LIMIT row_cap` to a SELECT that has no limit clause of its own.
pub fn apply_row_cap(sql: &str, row_cap: usize) -> String {
    if !is_select(sql) || LIMIT_CLAUSE.is_match(sql) {
        return sql.to_string();
    }

    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    format!("{} LIMIT {};", body, row_cap)
}

/// Runs validated statements against the target database.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: DbPool,
    row_cap: usize,
}

impl QueryExecutor {
    pub fn new(pool: DbPool, row_cap: usize) -> Self {
        Self { pool, row_cap }
    }

    pub async fn execute(&self, sql: &str) -> ExecutionOutcome {
        self.execute_with_cap(sql, self.row_cap).await
    }

    pub async fn execute_with_cap(&self, sql: &str, row_cap: usize) -> ExecutionOutcome {
        let start_time = Instant::now();

        let capped_sql = apply_row_cap(sql, row_cap);
        if capped_sql != sql {
            debug!("Applied row cap of {}: {}", row_cap, capped_sql);
        }

        let result = with_connection(&self.pool, move |conn| run_statement(conn, &capped_sql)).await;
        let execution_time = start_time.elapsed().as_millis() as u64;

        match result {
            Ok(StatementResult::Rows(columns, rows)) => {
                info!(
                    "Query executed successfully. Row count: {}, Execution time: {}ms",
                    rows.len(),
                    execution_time
                );
                ExecutionOutcome::Rows {
                    columns,
                    row_count: rows.len(),
                    rows,
                    execution_time,
                }
            }
            Ok(StatementResult::Affected(affected_rows)) => {
                info!(
                    "Statement executed successfully. {} rows affected in {}ms",
                    affected_rows, execution_time
                );
                ExecutionOutcome::Affected {
                    affected_rows,
                    execution_time,
                }
            }
            Err(e) => {
                error!("Failed to execute query: {}", e);
                ExecutionOutcome::Failed {
                    error: e.to_string(),
                    execution_time,
                }
            }
        }
    }

    pub async fn test_connection(&self) -> bool {
        let result = with_connection(&self.pool, |conn| {
            let one: i32 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
            Ok(one == 1)
        })
        .await;

        match result {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Database connection check failed: {}", e);
                false
            }
        }
    }

    pub async fn get_table_info(&self) -> Result<Vec<TableInfo>, DbError> {
        with_connection(&self.pool, |conn| catalog::table_info(conn)).await
    }

    pub async fn get_column_info(&self, table_filter: Option<String>) -> Result<Vec<CatalogColumn>, DbError> {
        with_connection(&self.pool, move |conn| {
            catalog::column_info(conn, table_filter.as_deref())
        })
        .await
    }
}

fn run_statement(conn: &Connection, sql: &str) -> Result<StatementResult, DbError> {
    if !is_select(sql) {
        let affected = conn.execute(sql, [])?;
        return Ok(StatementResult::Affected(affected));
    }

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let columns: Vec<String> = rows
        .as_ref()
        .map(|stmt| stmt.column_names())
        .unwrap_or_default();

    let mut data = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (i, name) in columns.iter().enumerate() {
            let value: Value = row.get(i)?;
            record.insert(name.clone(), value_to_json(value));
        }
        data.push(record);
    }

    Ok(StatementResult::Rows(columns, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use serde_json::json;

    fn executor_with_numbers(count: usize, row_cap: usize) -> QueryExecutor {
        let pool = memory_pool();
        let conn = pool.get().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE numbers AS SELECT range AS n, 'row ' || CAST(range AS VARCHAR) AS label FROM range({});",
            count
        ))
        .unwrap();
        QueryExecutor::new(pool.clone(), row_cap)
    }

    #[test]
    fn row_cap_is_appended_to_unbounded_selects() {
        assert_eq!(apply_row_cap("SELECT * FROM t;", 1000), "SELECT * FROM t LIMIT 1000;");
        assert_eq!(apply_row_cap("  select a from t  ", 5), "select a from t LIMIT 5;");
    }

    #[test]
    fn row_cap_leaves_limited_and_non_select_statements_alone() {
        assert_eq!(apply_row_cap("SELECT * FROM t LIMIT 3;", 1000), "SELECT * FROM t LIMIT 3;");
        assert_eq!(
            apply_row_cap("UPDATE t SET a = 1;", 1000),
            "UPDATE t SET a = 1;"
        );
    }

    #[test]
    fn any_limit_token_suppresses_the_cap() {
        // The check is textual: a limit in a subquery or a string literal
        // leaves the outer select uncapped.
        let nested = "SELECT * FROM (SELECT * FROM t LIMIT 5000) x;";
        assert_eq!(apply_row_cap(nested, 1000), nested);
        let literal = "SELECT * FROM t WHERE note = 'no limit';";
        assert_eq!(apply_row_cap(literal, 1000), literal);
        // A limit embedded in an identifier is not a limit clause.
        assert_eq!(
            apply_row_cap("SELECT credit_limit FROM accounts;", 10),
            "SELECT credit_limit FROM accounts LIMIT 10;"
        );
    }

    #[tokio::test]
    async fn select_results_never_exceed_the_row_cap() {
        let executor = executor_with_numbers(50, 10);

        let outcome = executor.execute("SELECT n, label FROM numbers ORDER BY n;").await;
        match outcome {
            ExecutionOutcome::Rows { columns, rows, row_count, .. } => {
                assert_eq!(columns, vec!["n", "label"]);
                assert_eq!(row_count, 10);
                assert_eq!(rows.len(), 10);
                assert_eq!(rows[0].get("n"), Some(&json!(0)));
                assert_eq!(rows[3].get("label"), Some(&json!("row 3")));
                // column order is preserved in each row mapping
                let keys: Vec<_> = rows[0].keys().cloned().collect();
                assert_eq!(keys, vec!["n", "label"]);
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn explicit_cap_overrides_the_default() {
        let executor = executor_with_numbers(20, DEFAULT_ROW_CAP);
        let outcome = executor.execute_with_cap("SELECT * FROM numbers", 4).await;
        assert!(matches!(outcome, ExecutionOutcome::Rows { row_count: 4, .. }));
    }

    #[tokio::test]
    async fn writes_report_affected_rows() {
        let executor = executor_with_numbers(5, DEFAULT_ROW_CAP);
        let outcome = executor.execute("UPDATE numbers SET label = 'x' WHERE n < 3;").await;
        assert!(matches!(outcome, ExecutionOutcome::Affected { affected_rows: 3, .. }));
    }

    #[tokio::test]
    async fn faults_are_reported_as_failed_outcomes() {
        let executor = executor_with_numbers(1, DEFAULT_ROW_CAP);
        let outcome = executor.execute("SELECT * FROM missing_table;").await;
        match outcome {
            ExecutionOutcome::Failed { error, .. } => assert!(error.contains("missing_table")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!executor.execute("SELECT nope(;").await.is_success());
    }

    #[tokio::test]
    async fn non_scalar_columns_come_back_as_json_values() {
        let executor = executor_with_numbers(1, DEFAULT_ROW_CAP);
        let outcome = executor
            .execute("SELECT TIME '12:00:00' AS t, {'a': 1} AS s, 'x'::BLOB AS b, INTERVAL 1 DAY AS i;")
            .await;
        match outcome {
            ExecutionOutcome::Rows { rows, .. } => {
                assert_eq!(rows[0].get("t"), Some(&json!("12:00:00")));
                assert_eq!(rows[0].get("s"), Some(&json!({"a": 1})));
                assert_eq!(rows[0].get("b"), Some(&json!("eA==")));
                assert_eq!(rows[0].get("i"), Some(&json!("1 day")));
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_check_succeeds_on_live_pool() {
        let executor = executor_with_numbers(1, DEFAULT_ROW_CAP);
        assert!(executor.test_connection().await);
    }

    #[tokio::test]
    async fn catalog_helpers_see_user_tables_only() {
        let executor = executor_with_numbers(3, DEFAULT_ROW_CAP);
        let tables = executor.get_table_info().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].table_name, "numbers");

        let columns = executor.get_column_info(Some("numbers".to_string())).await.unwrap();
        assert_eq!(columns.len(), 2);
    }
}
