use serde::{Deserialize, Serialize};

/// `[telemetry]`: log filtering for `serve` and optional span export.
///
/// `RUST_LOG` wins over `log_filter` when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_filter: String,
    /// OTLP/gRPC collector, e.g. `http://localhost:4317`. Export is off
    /// while this is unset or blank.
    pub otlp_endpoint: Option<String>,
    /// Fraction of traces exported, decided once per trace.
    pub sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,sml_gateway=debug".into(),
            otlp_endpoint: None,
            sample_rate: 1.0,
        }
    }
}

impl TelemetryConfig {
    /// The collector to export to, if export is on.
    pub fn export_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}
