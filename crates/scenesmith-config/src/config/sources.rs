use std::collections::BTreeMap;

use super::{Config, ConfigSource};

impl Config {
    /// Effective configuration as `key -> (value, source)` for display
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: Option<String>| {
            if let Some(val) = value {
                let source = self
                    .source_attribution
                    .get(key)
                    .copied()
                    .unwrap_or(ConfigSource::Default);
                config.insert(key.to_string(), (val, source.to_string()));
            }
        };

        add("oracle_provider", self.oracle.provider.clone());
        add("oracle_model", self.oracle.model.clone());
        add("oracle_base_url", self.oracle.base_url.clone());
        add("oracle_api_key_env", self.oracle.api_key_env.clone());
        add("oracle_max_tokens", self.oracle.max_tokens.map(|v| v.to_string()));
        add("oracle_temperature", self.oracle.temperature.map(|v| v.to_string()));
        add("oracle_timeout_secs", self.oracle.timeout_secs.map(|v| v.to_string()));
        add("oracle_budget", self.oracle.budget.map(|v| v.to_string()));
        add(
            "oracle_script_path",
            self.oracle
                .script_path
                .as_ref()
                .map(|p| p.display().to_string()),
        );
        add("registry_path", Some(self.registry_path().to_string()));
        add(
            "registry_docs_dir",
            self.registry.docs_dir.as_ref().map(ToString::to_string),
        );
        add("top_k", Some(self.top_k().to_string()));
        add("similarity_floor", Some(self.similarity_floor().to_string()));
        add(
            "max_validation_retries",
            Some(self.max_validation_retries().to_string()),
        );
        add("strict", Some(self.strict().to_string()));

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_defaults_to_default_source() {
        let config = Config::defaults();
        let effective = config.effective_config();
        let (value, source) = effective.get("top_k").unwrap();
        assert_eq!(value, "8");
        assert_eq!(source, "default");
        assert!(!effective.contains_key("oracle_model"));
    }
}
