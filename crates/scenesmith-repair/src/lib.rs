//! Repair chain for language-model output
//!
//! Model text is parsed as JSON through an explicit, ordered list of repair
//! strategies. Each strategy transforms the output of the previous one and the
//! chain stops at the first candidate that parses into an object or array.
//! The chain is bounded by its length and never panics on any input.

mod strategies;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// One repair step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    /// Parse the text as-is
    DirectParse,
    /// Take the content of the first markdown code fence
    StripCodeFences,
    /// Take the first balanced brace or bracket region
    BalancedBraces,
    /// Convert single-quoted, Python-flavoured pseudo-JSON
    CoerceQuotes,
}

impl RepairStrategy {
    pub const ALL: [Self; 4] = [
        Self::DirectParse,
        Self::StripCodeFences,
        Self::BalancedBraces,
        Self::CoerceQuotes,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DirectParse => "direct_parse",
            Self::StripCodeFences => "strip_code_fences",
            Self::BalancedBraces => "balanced_braces",
            Self::CoerceQuotes => "coerce_quotes",
        }
    }

    /// Candidate text, or `None` when the strategy does not apply
    fn apply(self, text: &str) -> Option<String> {
        match self {
            Self::DirectParse => Some(text.to_string()),
            Self::StripCodeFences => strategies::strip_code_fences(text),
            Self::BalancedBraces => strategies::balanced_region(text),
            Self::CoerceQuotes => strategies::coerce_quotes(text),
        }
    }
}

impl fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when one strategy ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairAttempt {
    pub strategy: RepairStrategy,
    pub outcome: String,
}

/// A successful repair
#[derive(Debug, Clone)]
pub struct Repaired {
    pub value: Value,
    /// The strategy whose candidate parsed
    pub strategy: RepairStrategy,
    /// Failed attempts before the successful one
    pub attempts: Vec<RepairAttempt>,
}

#[derive(Debug, Clone, Error)]
#[error("no repair strategy produced JSON ({} attempts)", attempts.len())]
pub struct RepairFailure {
    pub attempts: Vec<RepairAttempt>,
}

#[derive(Debug, Clone)]
pub struct RepairChain {
    strategies: Vec<RepairStrategy>,
}

impl Default for RepairChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl RepairChain {
    /// Direct parse, code fences, balanced braces, quote coercion
    #[must_use]
    pub fn standard() -> Self {
        Self::new(RepairStrategy::ALL.to_vec())
    }

    #[must_use]
    pub fn new(strategies: Vec<RepairStrategy>) -> Self {
        Self { strategies }
    }

    #[must_use]
    pub fn strategies(&self) -> &[RepairStrategy] {
        &self.strategies
    }

    /// Run the chain over `text`.
    ///
    /// # Errors
    ///
    /// Returns `RepairFailure` with one attempt per strategy when nothing
    /// parses into a JSON object or array.
    pub fn repair(&self, text: &str) -> Result<Repaired, RepairFailure> {
        let mut current = text.to_string();
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for &strategy in &self.strategies {
            let Some(candidate) = strategy.apply(&current) else {
                attempts.push(RepairAttempt {
                    strategy,
                    outcome: "not applicable".to_string(),
                });
                continue;
            };

            match parse_structured(&candidate) {
                Ok(value) => {
                    debug!(strategy = %strategy, failed_attempts = attempts.len(), "Repaired model output");
                    return Ok(Repaired {
                        value,
                        strategy,
                        attempts,
                    });
                }
                Err(reason) => {
                    debug!(strategy = %strategy, reason = %reason, "Repair strategy did not yield JSON");
                    attempts.push(RepairAttempt {
                        strategy,
                        outcome: reason,
                    });
                    current = candidate;
                }
            }
        }

        Err(RepairFailure { attempts })
    }
}

fn parse_structured(text: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| e.to_string())?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        Value::String(_) => Err("expected an object or array, found a string".to_string()),
        _ => Err("expected an object or array, found a scalar".to_string()),
    }
}
