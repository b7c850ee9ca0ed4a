use crate::config::LlmConfig;
use crate::llm::providers::{TEMPERATURE, TOP_K, TOP_P};
use crate::llm::{LlmError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    health_timeout: Duration,
}

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Serialize, Debug)]
struct SamplingOptions {
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false, // Explicitly disable streaming
            options: SamplingOptions {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(format!("Ollama service error: {}", e)))?;

        let status = response.status();
        // Get the raw text response first for diagnostics
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!("Ollama API responded with status code: {} - {}", status, response_text);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {} - Response body: {}",
                status, response_text
            )));
        }

        debug!("Raw response from Ollama: {}", response_text);

        let ollama_response: OllamaResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse Ollama response: {} - Response was: {}", e, response_text);
            LlmError::ResponseError(format!(
                "Failed to parse Ollama response: {} - Response was: {}",
                e, response_text
            ))
        })?;

        Ok(ollama_response.response)
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(self.health_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama health probe failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn provider_for(server: &MockServer) -> OllamaProvider {
        let config = LlmConfig {
            api_url: Some(server.base_url()),
            model: "llama2".to_string(),
            timeout_secs: 5,
            health_timeout_secs: 1,
            ..LlmConfig::default()
        };
        OllamaProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn generate_posts_prompt_system_and_sampling_options() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate").json_body(json!({
                    "model": "llama2",
                    "prompt": "list users",
                    "system": "be precise",
                    "stream": false,
                    "options": {"temperature": 0.1, "top_k": 10, "top_p": 0.3}
                }));
                then.status(200).json_body(json!({
                    "model": "llama2",
                    "response": "```sql\nSELECT * FROM users;\n```",
                    "done": true
                }));
            })
            .await;

        let provider = provider_for(&server);
        let text = provider.generate("list users", Some("be precise")).await.unwrap();
        assert_eq!(text, "```sql\nSELECT * FROM users;\n```");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_carries_the_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body("model 'llama2' not found");
            })
            .await;

        let err = provider_for(&server).generate("q", None).await.unwrap_err();
        match err {
            LlmError::ResponseError(msg) => assert!(msg.contains("model 'llama2' not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let config = LlmConfig {
            api_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        let err = provider.generate("q", None).await.unwrap_err();
        assert!(matches!(err, LlmError::ConnectionError(_)));
        assert!(!provider.check_health().await);
    }

    #[tokio::test]
    async fn health_probe_hits_tags_endpoint() {
        let server = MockServer::start_async().await;
        let tags = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200).json_body(json!({"models": []}));
            })
            .await;

        assert!(provider_for(&server).check_health().await);
        tags.assert_async().await;
    }

    #[tokio::test]
    async fn health_probe_reports_false_on_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(500);
            })
            .await;

        assert!(!provider_for(&server).check_health().await);
    }
}
