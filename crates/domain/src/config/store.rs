use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Usage-log store (PostgREST)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the hosted store that keeps the usage log.
///
/// Both the base URL and the privileged key are read from environment
/// variables. If either is missing, per-caller rate limiting is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_url_env")]
    pub url_env: String,
    /// Service-role key; used only for the window counts and the usage
    /// insert, never for caller-facing data.
    #[serde(default = "d_service_key_env")]
    pub service_key_env: String,
    #[serde(default = "d_table")]
    pub table: String,
    #[serde(default = "d_5000")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url_env: d_url_env(),
            service_key_env: d_service_key_env(),
            table: d_table(),
            timeout_ms: 5000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_url_env() -> String {
    "SUPABASE_URL".into()
}
fn d_service_key_env() -> String {
    "SUPABASE_SERVICE_ROLE_KEY".into()
}
fn d_table() -> String {
    "ai_chat_usage".into()
}
fn d_5000() -> u64 {
    5000
}
