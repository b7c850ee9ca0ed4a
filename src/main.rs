use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use chatbi::config::{AppConfig, CliArgs};
use chatbi::db::{build_pool, init_storage};
use chatbi::llm::LlmManager;
use chatbi::util::logging::init_tracing;
use chatbi::web;
use chatbi::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = AppConfig::new(&args)?;

    // Initialize logging
    init_tracing(config.logging.format);

    info!("Initializing DuckDB connection pool: {}", config.database.connection_string);
    let pool = build_pool(&config.database.connection_string, config.database.pool_size)?;

    {
        let conn = pool.get()?;
        init_storage(&conn)?;
    }

    // Initialize LLM manager
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm)?;

    let app_state = Arc::new(AppState::new(config.clone(), pool, llm_manager));

    // Initialize schema cache
    app_state.warm_schema_cache().await;

    // Start the web server
    info!("Starting ChatBI server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
