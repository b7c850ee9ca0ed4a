use crate::db::models::{NewHistoryRecord, QueryHistoryRecord, QueryStatus, Row};
use crate::db::{with_connection, DbError, DbPool, INTERNAL_SCHEMA};
use chrono::{DateTime, Utc};
use duckdb::params;
use tracing::{info, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Append-only log of query requests. Records are never updated.
#[derive(Clone)]
pub struct HistoryStore {
    pool: DbPool,
}

impl HistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Writes one record; identity and creation time are assigned here.
    pub async fn record(&self, new: NewHistoryRecord) -> Result<QueryHistoryRecord, DbError> {
        let created_at = Utc::now();
        let result_json = new
            .execution_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let id = with_connection(&self.pool, {
            let new = new.clone();
            move |conn| {
                let id: i64 = conn.query_row(
                    &format!(
                        "INSERT INTO {}.query_history
                            (natural_language_query, generated_sql, execution_result, execution_time, status, created_at)
                         VALUES (?, ?, ?, ?, ?, ?)
                         RETURNING id",
                        INTERNAL_SCHEMA
                    ),
                    params![
                        new.natural_language_query,
                        new.generated_sql,
                        result_json,
                        new.execution_time,
                        new.status.as_str(),
                        created_at.to_rfc3339(),
                    ],
                    |row| row.get(0),
                )?;
                Ok(id)
            }
        })
        .await?;

        info!("Recorded query history entry {} with status {}", id, new.status);

        Ok(QueryHistoryRecord {
            id,
            natural_language_query: new.natural_language_query,
            generated_sql: new.generated_sql,
            execution_result: new.execution_result,
            execution_time: new.execution_time,
            status: new.status,
            created_at,
        })
    }

    /// Newest records first.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<QueryHistoryRecord>, DbError> {
        let raw_rows = with_connection(&self.pool, move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, natural_language_query, generated_sql, execution_result, execution_time, status, created_at
                 FROM {}.query_history
                 ORDER BY id DESC
                 LIMIT ? OFFSET ?",
                INTERNAL_SCHEMA
            ))?;

            let rows = stmt
                .query_map(params![i64::from(limit), i64::from(offset)], |row| {
                    Ok(RawHistoryRow {
                        id: row.get(0)?,
                        natural_language_query: row.get(1)?,
                        generated_sql: row.get(2)?,
                        execution_result: row.get(3)?,
                        execution_time: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
        .await?;

        raw_rows.into_iter().map(RawHistoryRow::into_record).collect()
    }

    /// Hard delete by id.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let deleted = with_connection(&self.pool, move |conn| {
            let deleted = conn.execute(
                &format!("DELETE FROM {}.query_history WHERE id = ?", INTERNAL_SCHEMA),
                params![id],
            )?;
            Ok(deleted)
        })
        .await?;

        if deleted == 0 {
            return Err(DbError::NotFound(format!("Query {}", id)));
        }

        info!("Deleted query history entry {}", id);
        Ok(())
    }
}

struct RawHistoryRow {
    id: i64,
    natural_language_query: String,
    generated_sql: String,
    execution_result: Option<String>,
    execution_time: Option<i64>,
    status: String,
    created_at: String,
}

impl RawHistoryRow {
    fn into_record(self) -> Result<QueryHistoryRecord, DbError> {
        let execution_result = self
            .execution_result
            .as_deref()
            .map(serde_json::from_str::<Vec<Row>>)
            .transpose()?;

        let status = QueryStatus::parse(&self.status).unwrap_or_else(|| {
            warn!("Unknown status '{}' on history entry {}", self.status, self.id);
            QueryStatus::Error
        });

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| DbError::Task(format!("Invalid timestamp on history entry {}: {}", self.id, e)))?;

        Ok(QueryHistoryRecord {
            id: self.id,
            natural_language_query: self.natural_language_query,
            generated_sql: self.generated_sql,
            execution_result,
            execution_time: self.execution_time,
            status,
            created_at,
        })
    }
}
