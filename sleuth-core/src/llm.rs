//! Synthesis providers.
//!
//! The engine only needs one call: prompt text plus generation parameters in,
//! generated text out. [`OpenAiCompatibleProvider`] covers OpenAI, OpenRouter
//! and local servers speaking the same chat-completions API (Ollama, LM Studio, vLLM).
//! Use [`create_provider`] to build one from configuration.

use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Sampling parameters for a single generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl GenerationParams {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// A text generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;

    /// Model identifier recorded alongside generated text.
    fn model_name(&self) -> &str;
}

/// Build the provider named by `config.provider`.
pub fn create_provider(config: &LlmConfig) -> Result<OpenAiCompatibleProvider, LlmError> {
    match config.provider.as_str() {
        "openai" | "openrouter" | "ollama" | "lmstudio" | "vllm" | "openai_compatible" => {
            OpenAiCompatibleProvider::new(config)
        }
        other => Err(LlmError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}

fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        "vllm" => "http://localhost:8000/v1",
        _ => "https://api.openai.com/v1",
    }
}

fn is_local(base_url: &str) -> bool {
    base_url.contains("localhost") || base_url.contains("127.0.0.1")
}

/// Provider for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleProvider {
    /// Create a provider from configuration.
    ///
    /// Reads the API key from the environment variable named by `config.api_key_env`.
    /// Local endpoints do not need a key.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&config.provider).to_string());

        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ if is_local(&base_url) => {
                debug!("No API key set for local provider; using dummy bearer token");
                "local".to_string()
            }
            _ => {
                return Err(LlmError::MissingCredential {
                    env_var: config.api_key_env.clone(),
                });
            }
        };
        Self::new_with_key(config, base_url, api_key)
    }

    /// Create a provider with an explicitly resolved key and base URL.
    pub fn new_with_key(
        config: &LlmConfig,
        base_url: String,
        api_key: String,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication rejected");
                LlmError::Transport {
                    message: format!("Authentication rejected (HTTP {status})"),
                }
            }
            _ => LlmError::Transport {
                message: format!("HTTP {status}: {body}"),
            },
        }
    }

    fn parse_response(json: &Value) -> Result<String, LlmError> {
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::ResponseParse {
                message: "missing choices[0].message.content".to_string(),
            })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "stream": false,
        });

        debug!(url = %url, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    LlmError::Transport {
                        message: format!("Request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::Transport {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;
        Self::parse_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scriptable provider for tests and offline runs.
///
/// Returns queued responses first, then `"Mock synthesis #<n>"` with an
/// incrementing counter so repeated calls produce different text.
pub struct MockLlmProvider {
    responses: Mutex<Vec<String>>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with a transport error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(LlmError::Transport {
                message: message.clone(),
            });
        }
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        if responses.is_empty() {
            Ok(format!("Mock synthesis #{n}"))
        } else {
            Ok(responses.remove(0))
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, key_env: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            api_key_env: key_env.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unsupported_provider() {
        let err = create_provider(&config("carrier-pigeon", "X")).unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedProvider { provider } if provider == "carrier-pigeon"));
    }

    #[test]
    fn test_missing_credential() {
        let err = create_provider(&config("openai", "SLEUTH_TEST_KEY_THAT_IS_NEVER_SET")).unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential { env_var } if env_var == "SLEUTH_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let provider = create_provider(&config("ollama", "SLEUTH_TEST_KEY_THAT_IS_NEVER_SET")).unwrap();
        assert_eq!(provider.base_url(), "http://localhost:11434/v1");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_parse_response() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]});
        assert_eq!(OpenAiCompatibleProvider::parse_response(&body).unwrap(), "hello");
        assert!(matches!(
            OpenAiCompatibleProvider::parse_response(&json!({"choices": []})),
            Err(LlmError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_http_error_mapping() {
        assert!(matches!(
            OpenAiCompatibleProvider::map_http_error(reqwest::StatusCode::UNAUTHORIZED, ""),
            LlmError::Transport { message } if message.contains("401")
        ));
        assert!(matches!(
            OpenAiCompatibleProvider::map_http_error(reqwest::StatusCode::BAD_GATEWAY, "down"),
            LlmError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn test_mock_varies_and_queues() {
        let mock = MockLlmProvider::new();
        mock.queue_response("scripted");
        let params = GenerationParams::default();
        assert_eq!(mock.generate("p", &params).await.unwrap(), "scripted");
        assert_eq!(mock.generate("p", &params).await.unwrap(), "Mock synthesis #2");
        assert_eq!(mock.generate("p", &params).await.unwrap(), "Mock synthesis #3");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockLlmProvider::failing("connection reset");
        let err = mock.generate("p", &GenerationParams::default()).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport { message } if message == "connection reset"));
    }
}
