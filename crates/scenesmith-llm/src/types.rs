//! Core types for the oracle abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Input to one backend invocation
#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// Model to use; empty means the backend default
    pub model: String,
    /// Timeout for this invocation
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// Provider-specific knobs (`temperature`, `max_tokens`)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl OracleRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Text of the last user message, which carries the stage prompt
    #[must_use]
    pub fn user_text(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str())
    }
}

/// Result from one backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleReply {
    /// Raw completion text
    pub text: String,
    /// Provider name (`openrouter`, `scripted`)
    pub provider: String,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

impl OracleReply {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }
}

/// Provider implementations (HTTP or scripted) implement this trait.
#[async_trait]
pub trait OracleBackend: Send + Sync {
    /// Invoke the provider once.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors, timeouts and
    /// budget exhaustion.
    async fn invoke(&self, req: OracleRequest) -> Result<OracleReply, LlmError>;
}

/// The black-box text-completion oracle consumed by the pipeline stages.
///
/// Implementations may fail with a transport error or return malformed text;
/// callers never assume well-formed output.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Result<String, LlmError>;
}
