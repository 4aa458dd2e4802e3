mod quota;
mod server;
mod store;
mod telemetry;
mod upstream;

pub use quota::*;
pub use server::*;
pub use store::*;
pub use telemetry::*;
pub use upstream::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 || rl.burst_size == 0 {
                errors.push(ConfigError::error(
                    "server.rate_limit",
                    "requests_per_second and burst_size must be > 0",
                ));
            }
        }
        if self.server.cors.allowed_origins.is_empty() {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "no origins allowed; browsers will reject every cross-origin call",
            ));
        }

        let upstream = &self.upstream;
        if !upstream.base_url.starts_with("http://") && !upstream.base_url.starts_with("https://")
        {
            errors.push(ConfigError::error(
                "upstream.base_url",
                "base_url must be an http(s) URL",
            ));
        }
        if upstream.model.is_empty() {
            errors.push(ConfigError::error("upstream.model", "model must not be empty"));
        }
        if upstream.api_key_env.is_empty() {
            errors.push(ConfigError::error(
                "upstream.api_key_env",
                "api_key_env must name an environment variable",
            ));
        }
        if !(0.0..=2.0).contains(&upstream.temperature) {
            errors.push(ConfigError::error(
                "upstream.temperature",
                "temperature must be between 0.0 and 2.0",
            ));
        }
        if upstream.max_tokens == 0 {
            errors.push(ConfigError::error(
                "upstream.max_tokens",
                "max_tokens must be greater than 0",
            ));
        }
        if upstream.system_prompt.trim().is_empty() {
            errors.push(ConfigError::warning(
                "upstream.system_prompt",
                "empty system prompt; the assistant will answer off-topic questions",
            ));
        }

        if self.store.table.is_empty() {
            errors.push(ConfigError::error("store.table", "table must not be empty"));
        }

        if self.quota.hourly_limit == 0 || self.quota.daily_limit == 0 {
            errors.push(ConfigError::error(
                "quota",
                "hourly_limit and daily_limit must be greater than 0",
            ));
        } else if self.quota.hourly_limit > self.quota.daily_limit {
            errors.push(ConfigError::warning(
                "quota.hourly_limit",
                "hourly limit exceeds daily limit; the daily window always binds first",
            ));
        }

        let telemetry = &self.telemetry;
        if !(0.0..=1.0).contains(&telemetry.sample_rate) {
            errors.push(ConfigError::error(
                "telemetry.sample_rate",
                "sample_rate must be between 0.0 and 1.0",
            ));
        }
        if let Some(endpoint) = telemetry.export_endpoint() {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ConfigError::error(
                    "telemetry.otlp_endpoint",
                    "otlp_endpoint must be an http(s) URL",
                ));
            }
        }
        if telemetry.log_filter.trim().is_empty() {
            errors.push(ConfigError::warning(
                "telemetry.log_filter",
                "empty log filter; only RUST_LOG will select log output",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn zero_limits_are_errors() {
        let mut cfg = Config::default();
        cfg.quota.daily_limit = 0;
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Error);
        assert_eq!(issues[0].field, "quota");
    }

    #[test]
    fn hourly_above_daily_is_a_warning() {
        let mut cfg = Config::default();
        cfg.quota.hourly_limit = 50;
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Warning);
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let mut cfg = Config::default();
        cfg.upstream.base_url = "dashscope.aliyuncs.com".into();
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "upstream.base_url" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn telemetry_settings_are_checked() {
        let mut cfg = Config::default();
        cfg.telemetry.sample_rate = 1.5;
        cfg.telemetry.otlp_endpoint = Some("collector:4317".into());
        let fields: Vec<_> = cfg.validate().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, ["telemetry.sample_rate", "telemetry.otlp_endpoint"]);
    }

    #[test]
    fn display_tags_severity() {
        let issue = ConfigError::error("server.port", "port must be greater than 0");
        assert_eq!(issue.to_string(), "[ERROR] server.port: port must be greater than 0");
    }
}
