use scenesmith_utils::error::ConfigError;

use super::Config;

const KNOWN_PROVIDERS: [&str; 2] = ["openrouter", "scripted"];

impl Config {
    /// Validate configuration values, reporting every problem at once
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Some(provider) = &self.oracle.provider
            && !KNOWN_PROVIDERS.contains(&provider.as_str())
        {
            errors.push(format!(
                "oracle.provider '{provider}' is not one of: {}",
                KNOWN_PROVIDERS.join(", ")
            ));
        }

        if self.oracle.timeout_secs == Some(0) {
            errors.push("oracle.timeout_secs must be greater than 0".to_string());
        }

        if let Some(temperature) = self.oracle.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            errors.push(format!(
                "oracle.temperature {temperature} is outside the range 0.0..=2.0"
            ));
        }

        if self.pipeline.top_k == Some(0) {
            errors.push("pipeline.top_k must be greater than 0".to_string());
        }

        if let Some(floor) = self.pipeline.similarity_floor
            && !(0.0..=1.0).contains(&floor)
        {
            errors.push(format!(
                "pipeline.similarity_floor {floor} is outside the range 0.0..=1.0"
            ));
        }

        if let Some(retries) = self.pipeline.max_validation_retries
            && retries > 1
        {
            errors.push(format!(
                "pipeline.max_validation_retries {retries} is not supported; use 0 or 1"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }
}
