//! # Config Subcommand
//!
//! Prints the effective service configuration as YAML, in the same shape
//! `--config` accepts, after the environment or file has been applied and
//! validated.

use anyhow::{Context, Result};

use kms_service::ServiceConfig;

/// Execute the config subcommand.
pub fn run_config(config: &ServiceConfig) -> Result<u8> {
    print!("{}", render(config)?);
    Ok(0)
}

fn render(config: &ServiceConfig) -> Result<String> {
    config.to_yaml().context("failed to render configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rendered_config_loads_back() {
        let config = ServiceConfig {
            default_timeout: Some(Duration::from_millis(1500)),
            generate_initial_key: true,
            ..ServiceConfig::default()
        };
        let yaml = render(&config).unwrap();
        assert!(yaml.contains("default_timeout_ms: 1500"));
        assert_eq!(ServiceConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
