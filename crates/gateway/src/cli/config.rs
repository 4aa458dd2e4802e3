use sml_domain::config::{Config, ConfigSeverity};

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when at least one issue is an error.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    for issue in &issues {
        println!("{issue}");
    }

    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    println!(
        "\n{errors} error(s), {} warning(s) in {config_path}",
        issues.len() - errors
    );

    errors == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
///
/// Secrets never appear: the file only names their environment variables.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)?;
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_alone_still_validate() {
        let mut config = Config::default();
        config.quota.hourly_limit = 100;
        assert!(validate(&config, "config.toml"));
    }

    #[test]
    fn errors_fail_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(!validate(&config, "config.toml"));
    }

    #[test]
    fn resolved_config_serializes() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(rendered.contains("api_key_env = \"DASHSCOPE_API_KEY\""));
        assert!(rendered.contains("hourly_limit = 10"));
    }
}
