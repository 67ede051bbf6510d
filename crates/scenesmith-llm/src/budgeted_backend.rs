//! Budgeted backend wrapper for oracle call limiting
//!
//! The budget tracks attempted calls, not successful ones, so retry paths in
//! the stages cannot bypass it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

use crate::LlmError;
use crate::types::{OracleBackend, OracleReply, OracleRequest};

/// Environment variable for overriding the budget limit
pub(crate) const BUDGET_ENV_VAR: &str = "SCENESMITH_ORACLE_BUDGET";

pub struct BudgetedBackend {
    inner: Box<dyn OracleBackend>,
    calls: AtomicU32,
    limit: u32,
}

impl BudgetedBackend {
    pub fn new(inner: Box<dyn OracleBackend>, limit: u32) -> Self {
        debug!(limit = limit, "Creating BudgetedBackend");
        Self {
            inner,
            calls: AtomicU32::new(0),
            limit,
        }
    }

    /// Budget precedence: environment variable > config file value.
    pub fn with_limit_from_config(inner: Box<dyn OracleBackend>, config_budget: u32) -> Self {
        let limit = match std::env::var(BUDGET_ENV_VAR)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            Some(env_limit) => {
                debug!(
                    limit = env_limit,
                    "Using budget limit from environment variable {}", BUDGET_ENV_VAR
                );
                env_limit
            }
            None => config_budget,
        };
        Self::new(inner, limit)
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleBackend for BudgetedBackend {
    async fn invoke(&self, req: OracleRequest) -> Result<OracleReply, LlmError> {
        let current = self.calls.fetch_add(1, Ordering::SeqCst);

        if current >= self.limit {
            let attempted = current + 1;
            warn!(limit = self.limit, attempted = attempted, "Oracle budget exceeded");
            return Err(LlmError::BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }

        let result = self.inner.invoke(req).await;

        if let Err(e) = &result {
            debug!(
                call_count = current + 1,
                limit = self.limit,
                error = %e,
                "Inner backend invocation failed (budget slot still consumed)"
            );
        }

        result
    }
}
