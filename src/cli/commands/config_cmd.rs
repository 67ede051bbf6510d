//! Config command implementation
//!
//! Handles `scenesmith config`: every effective setting with its source.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{Config, emit_jcs};

#[derive(Debug, Serialize)]
struct ConfigValue {
    value: String,
    source: String,
}

/// Execute the config command
pub fn execute_config_command(json: bool, config: &Config) -> Result<()> {
    let effective = config.effective_config();

    if json {
        let values: BTreeMap<&str, ConfigValue> = effective
            .iter()
            .map(|(key, (value, source))| {
                (
                    key.as_str(),
                    ConfigValue {
                        value: value.clone(),
                        source: source.clone(),
                    },
                )
            })
            .collect();
        let output = emit_jcs(&values).context("Failed to emit config JSON")?;
        println!("{output}");
        return Ok(());
    }

    println!("Effective configuration:");
    for line in config_lines(&effective) {
        println!("  {line}");
    }
    Ok(())
}

fn config_lines(effective: &BTreeMap<String, (String, String)>) -> Vec<String> {
    effective
        .iter()
        .map(|(key, (value, source))| format!("{key} = {value} ({source})"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_show_source() {
        let lines = config_lines(&Config::defaults().effective_config());
        assert!(lines.iter().any(|l| l.starts_with("top_k = ") && l.ends_with("(default)")));
        assert!(lines.iter().any(|l| l.starts_with("registry_path = ")));
    }
}
