use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Upstream completion API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Built-in persona for the music assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the SML classical music assistant. \
Answer questions about composers, works, music theory and music history. \
Be concise and accurate, using one to three paragraphs. \
Reply in the same language the user writes in. \
Politely decline questions that are not about music.";

/// OpenAI-compatible chat-completions endpoint used to answer questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Short name used in logs and errors.
    #[serde(default = "d_id")]
    pub id: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Environment variable holding the upstream API key. When the variable
    /// is unset the gateway still starts, but `/v1/ask` answers 500.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_system_prompt")]
    pub system_prompt: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            id: d_id(),
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            temperature: d_temperature(),
            max_tokens: d_max_tokens(),
            timeout_ms: d_timeout_ms(),
            system_prompt: d_system_prompt(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_id() -> String {
    "dashscope".into()
}
fn d_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".into()
}
fn d_model() -> String {
    "qwen-turbo".into()
}
fn d_api_key_env() -> String {
    "DASHSCOPE_API_KEY".into()
}
fn d_temperature() -> f32 {
    0.7
}
fn d_max_tokens() -> u32 {
    512
}
fn d_timeout_ms() -> u64 {
    60_000
}
fn d_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
