//! OpenRouter HTTP backend
//!
//! Talks to any OpenAI-compatible chat completions endpoint; OpenRouter is the
//! default base URL.

use async_trait::async_trait;
use scenesmith_config::{Config, DEFAULT_API_KEY_ENV};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{Message, OracleBackend, OracleReply, OracleRequest, Role};

/// Default OpenRouter API endpoint
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default X-Title header value
const DEFAULT_TITLE: &str = "scenesmith";

pub(crate) struct OpenRouterBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

/// HTTP request parameters
#[derive(Debug, Clone)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

impl OpenRouterBackend {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            default_params,
        })
    }

    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key variable is unset or
    /// no model is configured.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key_env = config
            .oracle
            .api_key_env
            .as_deref()
            .unwrap_or(DEFAULT_API_KEY_ENV);

        let api_key = std::env::var(api_key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "Oracle API key not found in environment variable '{api_key_env}'. \
                 Set this variable or configure a different api_key_env in [oracle]."
            ))
        })?;

        let default_model = config.oracle.model.clone().ok_or_else(|| {
            LlmError::Misconfiguration(
                "Oracle model not specified. Set [oracle] model = \"model-name\" or pass --model."
                    .to_string(),
            )
        })?;

        let default_params = HttpParams {
            max_tokens: config.oracle.max_tokens.unwrap_or(2048),
            temperature: config.oracle.temperature.unwrap_or(0.2),
        };

        Self::new(
            api_key,
            config.oracle.base_url.clone(),
            default_model,
            default_params,
        )
    }

    /// `req.model` and `req.metadata` override backend defaults
    fn resolve_params(&self, req: &OracleRequest) -> (String, HttpParams) {
        let model = if req.model.is_empty() {
            self.default_model.clone()
        } else {
            req.model.clone()
        };

        let max_tokens = req
            .metadata
            .get("max_tokens")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(self.default_params.max_tokens);

        let temperature = req
            .metadata
            .get("temperature")
            .and_then(serde_json::Value::as_f64)
            .map(|v| v as f32)
            .unwrap_or(self.default_params.temperature);

        (
            model,
            HttpParams {
                max_tokens,
                temperature,
            },
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl OracleBackend for OpenRouterBackend {
    async fn invoke(&self, req: OracleRequest) -> Result<OracleReply, LlmError> {
        let (model, params) = self.resolve_params(&req);

        debug!(
            provider = "openrouter",
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = req.timeout.as_secs(),
            "Invoking OpenRouter backend"
        );

        let body = ChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&req.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = self
            .client
            .inner()
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", DEFAULT_TITLE)
            .json(&body);

        let response = self.client.execute(request, req.timeout, "openrouter").await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse OpenRouter response: {e}"))
        })?;

        let choice = response_body.choices.into_iter().next().ok_or_else(|| {
            LlmError::Transport("OpenRouter response missing choices[0]".to_string())
        })?;

        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport("OpenRouter response missing content in choices[0]".to_string())
        })?;

        let mut reply = OracleReply::new(content, "openrouter", model);
        if let Some(usage) = response_body.usage {
            reply.tokens_input = Some(usage.prompt_tokens);
            reply.tokens_output = Some(usage.completion_tokens);
        }

        debug!(
            provider = "openrouter",
            tokens_input = ?reply.tokens_input,
            tokens_output = ?reply.tokens_output,
            "OpenRouter invocation completed"
        );

        Ok(reply)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    fn backend(params: HttpParams) -> OpenRouterBackend {
        OpenRouterBackend::new(
            "test-key".to_string(),
            None,
            "default-model".to_string(),
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_params_uses_defaults() {
        let backend = backend(HttpParams {
            max_tokens: 1024,
            temperature: 0.5,
        });
        let req = OracleRequest::new("", Duration::from_secs(60), vec![]);

        let (model, params) = backend.resolve_params(&req);

        assert_eq!(model, "default-model");
        assert_eq!(params.max_tokens, 1024);
        assert_eq!(params.temperature, 0.5);
    }

    #[test]
    fn test_resolve_params_metadata_overrides() {
        let backend = backend(HttpParams::default());
        let req = OracleRequest::new("custom-model", Duration::from_secs(60), vec![])
            .with_metadata("max_tokens", serde_json::json!(512))
            .with_metadata("temperature", serde_json::json!(0.0));

        let (model, params) = backend.resolve_params(&req);

        assert_eq!(model, "custom-model");
        assert_eq!(params.max_tokens, 512);
        assert_eq!(params.temperature, 0.0);
    }

    #[test]
    fn test_convert_messages() {
        let messages = vec![Message::system("rules"), Message::user("a red sphere")];
        let converted = OpenRouterBackend::convert_messages(&messages);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[1].content, "a red sphere");
    }

    #[test]
    fn test_response_parsing_tolerates_missing_usage() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{}"));
    }

    #[test]
    #[serial]
    fn test_new_from_config_missing_api_key() {
        let test_env_var = "SCENESMITH_TEST_MISSING_KEY";
        unsafe {
            std::env::remove_var(test_env_var);
        }

        let mut config = Config::defaults();
        config.oracle.api_key_env = Some(test_env_var.to_string());
        config.oracle.model = Some("test-model".to_string());

        match OpenRouterBackend::new_from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains(test_env_var));
                assert!(msg.contains("not found"));
            }
            _ => panic!("Expected Misconfiguration error for missing API key"),
        }
    }

    #[test]
    #[serial]
    fn test_new_from_config_missing_model() {
        let test_env_var = "SCENESMITH_TEST_MODEL_KEY";
        unsafe {
            std::env::set_var(test_env_var, "test-key");
        }

        let mut config = Config::defaults();
        config.oracle.api_key_env = Some(test_env_var.to_string());
        config.oracle.model = None;

        let result = OpenRouterBackend::new_from_config(&config);
        unsafe {
            std::env::remove_var(test_env_var);
        }

        match result {
            Err(LlmError::Misconfiguration(msg)) => assert!(msg.contains("model")),
            _ => panic!("Expected Misconfiguration error for missing model"),
        }
    }
}
