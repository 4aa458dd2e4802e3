//! OpenAI-compatible adapter.
//!
//! Works with DashScope compatible mode, OpenAI, Ollama, vLLM and any other
//! endpoint that follows the OpenAI chat completions contract.

use crate::traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
use sml_domain::config::UpstreamConfig;
use sml_domain::error::{Error, Result};
use sml_domain::message::{Message, Role};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A completion provider for any OpenAI-compatible API endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatProvider {
    /// Create a provider from the upstream config and an already-resolved key.
    pub fn from_config(cfg: &UpstreamConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg.model.clone(),
            client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Resolve the effective model name for this request.
    fn effective_model(&self, req: &ChatRequest) -> String {
        req.model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }

    fn build_chat_body(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();

        let mut body = serde_json::json!({
            "model": self.effective_model(req),
            "messages": messages,
        });

        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::transport(e.is_timeout(), e)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
    }
}

fn msg_to_openai(msg: &Message) -> Value {
    serde_json::json!({
        "role": role_to_str(msg.role),
        "content": msg.content,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pull the first choice's text out of a completions body.
///
/// A body without choices is not an error here: the caller decides what
/// to answer when no text came back.
fn parse_chat_response(body: &Value) -> ChatResponse {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first());

    let content = choice
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let usage = body.get("usage").and_then(parse_openai_usage);

    ChatResponse {
        content,
        usage,
        model,
        finish_reason,
    }
}

fn parse_openai_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = self.chat_url();
        let body = self.build_chat_body(req);

        tracing::debug!(provider = %self.id, url = %url, "openai_compat chat request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                provider: self.id.clone(),
                status: status.as_u16(),
                body: resp_text,
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text).map_err(|e| Error::Provider {
            provider: self.id.clone(),
            message: format!("invalid JSON in completion response: {e}"),
        })?;
        Ok(parse_chat_response(&resp_json))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiCompatProvider {
        let cfg = UpstreamConfig {
            base_url: "https://llm.example/v1/".into(),
            ..UpstreamConfig::default()
        };
        OpenAiCompatProvider::from_config(&cfg, "sk-test".into()).unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        assert_eq!(provider().chat_url(), "https://llm.example/v1/chat/completions");
    }

    #[test]
    fn body_carries_system_and_user_messages() {
        let req = ChatRequest {
            messages: vec![
                Message::system("music only"),
                Message::user("What era is Chopin from?"),
            ],
            temperature: Some(0.7),
            max_tokens: Some(512),
            model: None,
        };
        let body = provider().build_chat_body(&req);

        assert_eq!(body["model"], "qwen-turbo");
        assert_eq!(body["max_tokens"], 512);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "What era is Chopin from?");
    }

    #[test]
    fn optional_parameters_are_omitted() {
        let req = ChatRequest {
            messages: vec![Message::user("hi")],
            model: Some("qwen-plus".into()),
            ..ChatRequest::default()
        };
        let body = provider().build_chat_body(&req);
        assert_eq!(body["model"], "qwen-plus");
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parses_first_choice() {
        let body = serde_json::json!({
            "model": "qwen-turbo",
            "choices": [
                { "message": { "role": "assistant", "content": "Romantic era." }, "finish_reason": "stop" },
                { "message": { "role": "assistant", "content": "ignored" } }
            ],
            "usage": { "prompt_tokens": 40, "completion_tokens": 3, "total_tokens": 43 }
        });
        let resp = parse_chat_response(&body);
        assert_eq!(resp.content.as_deref(), Some("Romantic era."));
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.model, "qwen-turbo");
        assert_eq!(resp.usage.unwrap().total_tokens, 43);
    }

    #[test]
    fn missing_choices_yield_no_content() {
        let resp = parse_chat_response(&serde_json::json!({ "choices": [] }));
        assert!(resp.content.is_none());
        assert_eq!(resp.model, "unknown");

        let resp = parse_chat_response(&serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        }));
        assert!(resp.content.is_none());
    }

    #[test]
    fn debug_output_hides_the_key() {
        let rendered = format!("{:?}", provider());
        assert!(!rendered.contains("sk-test"));
    }
}
