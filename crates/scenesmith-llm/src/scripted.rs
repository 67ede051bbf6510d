//! Scripted backend: canned replies for offline runs and deterministic tests
//!
//! Selected with `[oracle] provider = "scripted"`; replies come from a JSON
//! array of strings at `[oracle] script_path`, consumed in order.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use crate::LlmError;
use crate::types::{OracleBackend, OracleReply, OracleRequest};

/// One canned reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Completion text, returned verbatim
    Text(String),
    /// Fail the call with `LlmError::Transport`
    TransportError(String),
    /// Never answer; only a caller-side timeout ends the call
    Hang,
}

impl ScriptedReply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn transport_error(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }
}

type Responder = Box<dyn Fn(&OracleRequest) -> ScriptedReply + Send + Sync>;

enum Source {
    Queue(Mutex<VecDeque<ScriptedReply>>),
    Repeat(ScriptedReply),
    Responder(Responder),
}

pub struct ScriptedBackend {
    source: Source,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedBackend {
    /// Replies are returned in order; once exhausted every call fails.
    #[must_use]
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self::with_source(Source::Queue(Mutex::new(replies.into())))
    }

    /// The same reply for every call
    #[must_use]
    pub fn repeating(reply: ScriptedReply) -> Self {
        Self::with_source(Source::Repeat(reply))
    }

    /// Reply computed from the request; deterministic when `f` is
    pub fn responder<F>(f: F) -> Self
    where
        F: Fn(&OracleRequest) -> ScriptedReply + Send + Sync + 'static,
    {
        Self::with_source(Source::Responder(Box::new(f)))
    }

    /// Load replies from a JSON array of strings.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the file is unreadable or is not
    /// an array of strings.
    pub fn from_file(path: &Path) -> Result<Self, LlmError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LlmError::Misconfiguration(format!(
                "Cannot read scripted oracle replies from {}: {e}",
                path.display()
            ))
        })?;
        let replies: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            LlmError::Misconfiguration(format!(
                "Scripted oracle replies in {} must be a JSON array of strings: {e}",
                path.display()
            ))
        })?;
        Ok(Self::new(replies.into_iter().map(ScriptedReply::Text).collect()))
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// User prompts seen so far, in call order
    #[must_use]
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|r| r.user_text().to_string())
            .collect()
    }

    fn next_reply(&self, req: &OracleRequest) -> Option<ScriptedReply> {
        match &self.source {
            Source::Queue(queue) => queue
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front(),
            Source::Repeat(reply) => Some(reply.clone()),
            Source::Responder(f) => Some(f(req)),
        }
    }
}

#[async_trait]
impl OracleBackend for ScriptedBackend {
    async fn invoke(&self, req: OracleRequest) -> Result<OracleReply, LlmError> {
        let reply = self.next_reply(&req);
        let model = req.model.clone();
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(req);

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(OracleReply::new(text, "scripted", model)),
            Some(ScriptedReply::TransportError(msg)) => Err(LlmError::Transport(msg)),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            None => Err(LlmError::Transport(
                "scripted oracle has no replies left".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(prompt: &str) -> OracleRequest {
        OracleRequest::new(
            "m",
            Duration::from_secs(1),
            vec![crate::types::Message::user(prompt)],
        )
    }

    #[tokio::test]
    async fn test_queue_in_order_then_exhausted() {
        let backend = ScriptedBackend::new(vec![
            ScriptedReply::text("first"),
            ScriptedReply::transport_error("boom"),
        ]);

        assert_eq!(backend.invoke(request("a")).await.unwrap().text, "first");
        assert!(matches!(
            backend.invoke(request("b")).await,
            Err(LlmError::Transport(msg)) if msg == "boom"
        ));
        assert!(backend.invoke(request("c")).await.is_err());
        assert_eq!(backend.recorded_prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let backend = ScriptedBackend::responder(|req| {
            ScriptedReply::text(format!("echo: {}", req.user_text()))
        });
        let reply = backend.invoke(request("a red sphere")).await.unwrap();
        assert_eq!(reply.text, "echo: a red sphere");
        assert_eq!(reply.provider, "scripted");
    }

    #[test]
    fn test_from_file_rejects_non_array() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replies.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        assert!(matches!(
            ScriptedBackend::from_file(&path),
            Err(LlmError::Misconfiguration(_))
        ));

        std::fs::write(&path, "[\"one\", \"two\"]").unwrap();
        assert!(ScriptedBackend::from_file(&path).is_ok());
    }
}
