pub mod prompt;
pub mod providers;

use crate::config::LlmConfig;
use crate::db::models::SchemaColumn;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// A text-generation endpoint: prompt in, completion text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError>;

    /// Short-timeout reachability probe. Never fails; errors read as `false`.
    async fn check_health(&self) -> bool;

    fn name(&self) -> &str;
}

pub struct LlmManager {
    generator: Arc<dyn TextGenerator>,
    dialect: String,
    system_prompt: String,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Arc<dyn TextGenerator> = match config.backend.as_str() {
            "ollama" => Arc::new(providers::ollama::OllamaProvider::new(config)?),
            "remote" => Arc::new(providers::remote::RemoteLlmProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self::with_generator(generator, &config.dialect))
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>, dialect: &str) -> Self {
        Self {
            generator,
            dialect: dialect.to_string(),
            system_prompt: prompt::system_prompt(dialect),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.generator.name()
    }

    /// Asks the model for a statement answering `question`. Returns the raw
    /// completion; cleanup and validation are the caller's job.
    pub async fn generate_sql(&self, question: &str, schema: &[SchemaColumn]) -> Result<String, LlmError> {
        let prompt = prompt::build_prompt(question, schema, &self.dialect);
        debug!("Prepared LLM prompt: {}", prompt);

        info!("Sending generation request to {}", self.generator.name());
        let completion = self.generator.generate(&prompt, Some(&self.system_prompt)).await?;
        debug!("Raw completion: {}", completion);

        Ok(completion)
    }

    pub async fn check_health(&self) -> bool {
        self.generator.check_health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingGenerator {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), system_prompt.map(str::to_string)));
            Ok("SELECT 1".to_string())
        }

        async fn check_health(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn generate_sql_sends_prompt_and_system_instruction() {
        let generator = Arc::new(RecordingGenerator { seen: Mutex::new(Vec::new()) });
        let manager = LlmManager::with_generator(generator.clone(), "DuckDB");

        let sql = manager.generate_sql("list users", &[]).await.unwrap();
        assert_eq!(sql, "SELECT 1");

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("list users"));
        assert!(seen[0].1.as_deref().unwrap().contains("DuckDB"));
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let config = LlmConfig {
            backend: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(LlmManager::new(&config), Err(LlmError::ConfigError(_))));
    }
}
