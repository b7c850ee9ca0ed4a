use crate::db::executor::{ExecutionOutcome, QueryExecutor};
use crate::db::history::HistoryStore;
use crate::db::models::{NewHistoryRecord, QueryHistoryRecord, QueryStatus};
use crate::db::schema_store::SchemaStore;
use crate::db::DbError;
use crate::llm::{LlmError, LlmManager};
use crate::sql::{clean_sql, is_acceptable};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("SQL generation failed: {0}")]
    ModelUnavailable(#[from] LlmError),
    #[error("Generated SQL failed validation: {0}")]
    ValidationRejected(String),
    #[error("SQL execution failed: {0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Storage(#[from] DbError),
}

/// The natural-language-to-SQL pipeline: prompt, generate, clean, validate,
/// optionally execute, record.
#[derive(Clone)]
pub struct QueryService {
    llm: Arc<LlmManager>,
    schema: SchemaStore,
    executor: QueryExecutor,
    history: HistoryStore,
    record_failures: bool,
}

impl QueryService {
    pub fn new(
        llm: Arc<LlmManager>,
        schema: SchemaStore,
        executor: QueryExecutor,
        history: HistoryStore,
        record_failures: bool,
    ) -> Self {
        Self {
            llm,
            schema,
            executor,
            history,
            record_failures,
        }
    }

    pub async fn handle_query(&self, question: &str, execute: bool) -> Result<QueryHistoryRecord, QueryError> {
        let start_time = Instant::now();
        debug!("NL-query: {}", question);

        let columns = self.schema.list().await?;
        let raw = self.llm.generate_sql(question, &columns).await?;

        let sql = clean_sql(&raw);
        if !is_acceptable(&sql) {
            warn!("Generated SQL failed validation: {}", sql);
            self.record_failure(question, &sql, start_time).await;
            return Err(QueryError::ValidationRejected(sql));
        }
        info!("Validated SQL: {}", sql);

        let (execution_result, execution_time, status) = if execute {
            match self.executor.execute(&sql).await {
                ExecutionOutcome::Rows { rows, execution_time, .. } => {
                    (Some(rows), Some(execution_time as i64), QueryStatus::Executed)
                }
                ExecutionOutcome::Affected { execution_time, .. } => {
                    (Some(Vec::new()), Some(execution_time as i64), QueryStatus::Executed)
                }
                ExecutionOutcome::Failed { error, .. } => {
                    self.record_failure(question, &sql, start_time).await;
                    return Err(QueryError::ExecutionFailed(error));
                }
            }
        } else {
            (None, None, QueryStatus::Generated)
        };

        let total_time = start_time.elapsed().as_millis() as i64;
        let record = self
            .history
            .record(NewHistoryRecord {
                natural_language_query: question.to_string(),
                generated_sql: sql,
                execution_result,
                execution_time: execution_time.or(Some(total_time)),
                status,
            })
            .await?;

        Ok(record)
    }

    /// Audit entry for a rejected or failed statement, when enabled. A failure
    /// to write it is logged and does not mask the original error.
    async fn record_failure(&self, question: &str, sql: &str, start_time: Instant) {
        if !self.record_failures {
            return;
        }

        let result = self
            .history
            .record(NewHistoryRecord {
                natural_language_query: question.to_string(),
                generated_sql: sql.to_string(),
                execution_result: None,
                execution_time: Some(start_time.elapsed().as_millis() as i64),
                status: QueryStatus::Error,
            })
            .await;

        if let Err(e) = result {
            warn!("Failed to record failed query: {}", e);
        }
    }
}
