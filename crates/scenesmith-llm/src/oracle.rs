//! Backend-to-oracle adapter
//!
//! Stages see only [`Oracle::complete`]. `BackendOracle` turns a prompt and an
//! optional context into an [`OracleRequest`], bounds every attempt with the
//! configured timeout and retries a retryable failure exactly once.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::LlmError;
use crate::types::{Message, Oracle, OracleBackend, OracleRequest};

const SYSTEM_PREAMBLE: &str = "You help build 3D scenes in Blender. \
Answer with JSON only, without commentary or code fences.";

/// Pause before the single retry
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

pub struct BackendOracle {
    backend: Arc<dyn OracleBackend>,
    model: String,
    timeout: Duration,
}

impl BackendOracle {
    /// `model` may be empty to let the backend pick its default.
    pub fn new(backend: Arc<dyn OracleBackend>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
        }
    }

    fn build_request(&self, prompt: &str, context: Option<&str>) -> OracleRequest {
        let system = match context {
            Some(ctx) if !ctx.trim().is_empty() => format!("{SYSTEM_PREAMBLE}\n\n{ctx}"),
            _ => SYSTEM_PREAMBLE.to_string(),
        };
        OracleRequest::new(
            self.model.clone(),
            self.timeout,
            vec![Message::system(system), Message::user(prompt)],
        )
    }

    async fn attempt(&self, req: OracleRequest) -> Result<String, LlmError> {
        match tokio::time::timeout(self.timeout, self.backend.invoke(req)).await {
            Ok(Ok(reply)) => Ok(reply.text),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LlmError::Timeout {
                duration: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl Oracle for BackendOracle {
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Result<String, LlmError> {
        let req = self.build_request(prompt, context);

        match self.attempt(req.clone()).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Oracle call failed, retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                let result = self.attempt(req).await;
                if let Err(e) = &result {
                    debug!(error = %e, "Oracle retry failed");
                }
                result
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budgeted_backend::BudgetedBackend;
    use crate::scripted::{ScriptedBackend, ScriptedReply};

    fn oracle(backend: &Arc<ScriptedBackend>) -> BackendOracle {
        BackendOracle::new(backend.clone(), "", Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_times_out_then_retry_succeeds() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ScriptedReply::Hang,
            ScriptedReply::text("{}"),
        ]));
        let text = oracle(&backend).complete("plan", None).await.unwrap();
        assert_eq!(text, "{}");
        assert_eq!(backend.recorded_prompts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_timeouts_surface_timeout() {
        let backend = Arc::new(ScriptedBackend::repeating(ScriptedReply::Hang));
        let err = oracle(&backend).complete("plan", None).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { duration } if duration == Duration::from_secs(5)));
        assert_eq!(backend.recorded_prompts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_retried_once_only() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ScriptedReply::transport_error("reset"),
            ScriptedReply::transport_error("reset again"),
            ScriptedReply::text("never reached"),
        ]));
        let err = oracle(&backend).complete("plan", None).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport(msg) if msg == "reset again"));
        assert_eq!(backend.recorded_prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_not_retried() {
        let inner = ScriptedBackend::repeating(ScriptedReply::text("ok"));
        let budgeted: Arc<dyn OracleBackend> = Arc::new(BudgetedBackend::new(Box::new(inner), 0));
        let oracle = BackendOracle::new(budgeted, "", Duration::from_secs(5));
        assert!(matches!(
            oracle.complete("plan", None).await,
            Err(LlmError::BudgetExceeded { attempted: 1, .. })
        ));
    }

    #[test]
    fn test_context_lands_in_system_message() {
        let backend = Arc::new(ScriptedBackend::repeating(ScriptedReply::text("ok")));
        let req = oracle(&backend).build_request("a red sphere", Some("candidates: cube"));
        assert_eq!(req.messages.len(), 2);
        assert!(req.messages[0].content.starts_with(SYSTEM_PREAMBLE));
        assert!(req.messages[0].content.ends_with("candidates: cube"));
        assert_eq!(req.user_text(), "a red sphere");

        let bare = oracle(&backend).build_request("x", Some("   "));
        assert_eq!(bare.messages[0].content, SYSTEM_PREAMBLE);
    }
}
