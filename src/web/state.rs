use crate::config::AppConfig;
use crate::db::executor::QueryExecutor;
use crate::db::history::HistoryStore;
use crate::db::schema_store::SchemaStore;
use crate::db::DbPool;
use crate::llm::LlmManager;
use crate::query::QueryService;
use std::sync::Arc;
use tracing::{error, info};

/// Services shared by every request handler, built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub llm_manager: Arc<LlmManager>,
    pub executor: QueryExecutor,
    pub schema_store: SchemaStore,
    pub history: HistoryStore,
    pub query_service: QueryService,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: DbPool, llm_manager: LlmManager) -> Self {
        let llm_manager = Arc::new(llm_manager);
        let executor = QueryExecutor::new(db_pool.clone(), config.query.row_cap);
        let schema_store = SchemaStore::new(db_pool.clone());
        let history = HistoryStore::new(db_pool.clone());

        let query_service = QueryService::new(
            Arc::clone(&llm_manager),
            schema_store.clone(),
            executor.clone(),
            history.clone(),
            config.query.record_failures,
        );

        Self {
            config,
            llm_manager,
            executor,
            schema_store,
            history,
            query_service,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Populates the schema cache on first start. Failures are logged only;
    /// the cache can be refreshed later through the API.
    pub async fn warm_schema_cache(&self) {
        match self.schema_store.is_empty().await {
            Ok(true) => match self.schema_store.refresh().await {
                Ok(summary) => info!(
                    "Initial schema cache: {} columns in {} tables",
                    summary.columns, summary.tables
                ),
                Err(e) => error!("Failed to initialize schema cache: {}", e),
            },
            Ok(false) => info!("Using stored schema cache"),
            Err(e) => error!("Failed to inspect schema cache: {}", e),
        }
    }
}
