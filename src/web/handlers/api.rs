use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::history::DEFAULT_PAGE_SIZE;
use crate::db::models::{QueryHistoryRecord, SchemaColumn, TableInfo};
use crate::db::DbError;
use crate::query::QueryError;
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub execute: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// Response types

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: i64,
    pub llm_backend: String,
    pub model_available: bool,
    pub database_available: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub tables: usize,
    pub columns: usize,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<TableInfo>,
}

/// Error returned by every API handler, rendered as `{error, detail}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, detail: impl Into<String>) -> Self {
        Self {
            status,
            error: error.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::ModelUnavailable(e) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Model unavailable", format!("SQL generation failed: {}", e))
            }
            QueryError::ValidationRejected(sql) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "Validation failed",
                format!("Generated SQL failed validation: {}", sql),
            ),
            QueryError::ExecutionFailed(e) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "Execution failed",
                format!("SQL execution failed: {}", e),
            ),
            QueryError::Storage(e) => e.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => ApiError::new(StatusCode::NOT_FOUND, "Not found", format!("{} not found", what)),
            other => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}: {}", self.error, self.detail);
        } else {
            warn!("{}: {}", self.error, self.detail);
        }

        let body = ErrorResponse {
            error: self.error,
            detail: Some(self.detail),
        };
        (self.status, Json(body)).into_response()
    }
}

// API Implementations

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "ChatBI Server is running",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/api/v1",
    }))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (model_available, database_available) =
        tokio::join!(state.llm_manager.check_health(), state.executor.test_connection());

    let status = if model_available && database_available {
        "healthy"
    } else {
        "unhealthy"
    };

    let now = Utc::now();
    Json(HealthResponse {
        status: status.to_string(),
        timestamp: now,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: now.signed_duration_since(state.startup_time).num_seconds(),
        llm_backend: format!("{} ({})", state.llm_manager.backend_name(), state.config.llm.model),
        model_available,
        database_available,
    })
}

pub async fn generate_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryHistoryRecord>, ApiError> {
    if payload.query.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid request", "Query must not be empty"));
    }

    info!("Natural language query (execute={}): {}", payload.execute, payload.query);
    let record = state
        .query_service
        .handle_query(&payload.query, payload.execute)
        .await?;

    Ok(Json(record))
}

pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<QueryHistoryRecord>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let records = state.history.list(limit, offset).await?;
    Ok(Json(records))
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.history.delete(id).await?;

    Ok(Json(MessageResponse {
        message: "Query deleted successfully".to_string(),
    }))
}

pub async fn get_schema(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SchemaColumn>>, ApiError> {
    let columns = state.schema_store.list().await?;
    Ok(Json(columns))
}

pub async fn refresh_schema(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>, ApiError> {
    let summary = state.schema_store.refresh().await.map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            format!("Failed to refresh schema: {}", e),
        )
    })?;

    Ok(Json(RefreshResponse {
        message: format!(
            "Schema refreshed successfully. Found {} columns in {} tables.",
            summary.columns, summary.tables
        ),
        tables: summary.tables,
        columns: summary.columns,
    }))
}

pub async fn list_tables(State(state): State<Arc<AppState>>) -> Result<Json<TablesResponse>, ApiError> {
    let tables = state.executor.get_table_info().await.map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            format!("Failed to fetch tables: {}", e),
        )
    })?;

    Ok(Json(TablesResponse { tables }))
}
