//! Exit code constants and error mapping for the scenesmith CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `REGISTRY` | Registry could not be built, loaded or queried |
//! | 4 | `RUN_FAILED` | Pipeline run ended in the `Failed` state |
//! | 10 | `ORACLE_TIMEOUT` | Oracle call timed out outside a recoverable path |

use crate::error::{LlmError, ScenesmithError, StageError};

/// Exit codes matching the documented exit code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Registry error - build, load or lookup failed
    pub const REGISTRY: ExitCode = ExitCode(3);

    /// The pipeline run reached the `Failed` state
    pub const RUN_FAILED: ExitCode = ExitCode(4);

    /// Oracle timeout
    pub const ORACLE_TIMEOUT: ExitCode = ExitCode(10);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl ScenesmithError {
    /// Map this error to the CLI exit code table
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            ScenesmithError::Config(_) => ExitCode::CLI_ARGS,
            ScenesmithError::Registry(_) => ExitCode::REGISTRY,
            ScenesmithError::Llm(LlmError::Timeout { .. }) => ExitCode::ORACLE_TIMEOUT,
            ScenesmithError::Llm(LlmError::Misconfiguration(_)) => ExitCode::CLI_ARGS,
            ScenesmithError::Llm(_) => ExitCode::INTERNAL,
            ScenesmithError::Stage(StageError::EmptyPrompt) => ExitCode::CLI_ARGS,
            ScenesmithError::Stage(StageError::Registry(_)) => ExitCode::REGISTRY,
            ScenesmithError::Stage(_) => ExitCode::RUN_FAILED,
            ScenesmithError::RunFailed { .. } => ExitCode::RUN_FAILED,
            ScenesmithError::Io(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, RegistryError};
    use crate::types::StageId;
    use std::time::Duration;

    #[test]
    fn test_exit_code_mapping() {
        let cases = [
            (
                ScenesmithError::from(ConfigError::InvalidFile("bad".into())),
                ExitCode::CLI_ARGS,
            ),
            (
                ScenesmithError::from(RegistryError::NotFound { name: "x".into() }),
                ExitCode::REGISTRY,
            ),
            (
                ScenesmithError::from(LlmError::Timeout {
                    duration: Duration::from_secs(1),
                }),
                ExitCode::ORACLE_TIMEOUT,
            ),
            (
                ScenesmithError::RunFailed {
                    stage: StageId::Validating,
                    cause: "fatal findings".into(),
                },
                ExitCode::RUN_FAILED,
            ),
            (
                ScenesmithError::from(StageError::EmptyPrompt),
                ExitCode::CLI_ARGS,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_exit_code(), expected, "{err}");
        }
    }

    #[test]
    fn test_exit_code_numeric_values_are_stable() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::RUN_FAILED.as_i32(), 4);
        assert_eq!(i32::from(ExitCode::ORACLE_TIMEOUT), 10);
    }
}
