//! OpenAI-compatible chat-completions adapter — the only concrete
//! [`LlmProvider`] this repo ships, pointed at whatever `llm.base_url`
//! names. Grounded on the ancestor providers crate's `openai_compat.rs`,
//! trimmed to a single endpoint/credential (no multi-provider routing,
//! OAuth rotation, or Azure URL variant — out of scope for this spec).

use std::time::Duration;

use lg_domain::config::LlmConfig;
use lg_domain::error::{ErrorKind, Result};
use lg_domain::message::{Message, Role};
use lg_domain::stream::{StreamEvent, Usage};
use serde_json::Value;

use crate::sse::sse_response_stream;
use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::from_reqwest;

pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        if cfg.api_key.trim().is_empty() {
            return Err(ErrorKind::Config("llm.api_key is empty".to_string()).into());
        }
        if cfg.base_url.trim().is_empty() || cfg.model.trim().is_empty() {
            return Err(ErrorKind::Config("llm.base_url/model must be set".to_string()).into());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            id: "openai-compat".to_string(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            default_model: cfg.model.clone(),
            client,
        })
    }

    fn effective_model(&self, req: &ChatRequest) -> String {
        req.model.clone().unwrap_or_else(|| self.default_model.clone())
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body(&self, req: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();
        let mut body = serde_json::json!({
            "model": self.effective_model(req),
            "messages": messages,
            "stream": stream,
        });
        if let Some(t) = req.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(m) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(m);
        }
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        body
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    /// Sends `body` to `url`, retrying once with a short backoff on a
    /// transport-level failure before giving up. A non-2xx HTTP response is
    /// not a transport failure and is returned as-is for the caller to map
    /// to `ErrorKind::Upstream`.
    async fn post_with_retry(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        match self.authed_post(url).json(body).send().await {
            Ok(resp) => Ok(resp),
            Err(_) => {
                tokio::time::sleep(Duration::from_millis(500)).await;
                self.authed_post(url).json(body).send().await.map_err(from_reqwest)
            }
        }
    }
}

fn msg_to_openai(m: &Message) -> Value {
    let role = match m.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    serde_json::json!({ "role": role, "content": m.content })
}

fn usage_from_json(v: &Value) -> Option<Usage> {
    let u = v.get("usage")?;
    let prompt_tokens = u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
    let completion_tokens = u.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0);
    let cached_tokens = u
        .get("prompt_tokens_details")
        .and_then(|d| d.get("cached_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Some(Usage { prompt_tokens, completion_tokens, cached_tokens })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn call(&self, req: ChatRequest) -> Result<ChatResponse> {
        let body = self.build_body(&req, false);
        let resp = self.post_with_retry(&self.chat_url(), &body).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ErrorKind::Upstream(format!("{status}: {text}")).into());
        }

        let v: Value = resp.json().await.map_err(from_reqwest)?;
        let content = v
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(ChatResponse { content, usage: usage_from_json(&v) })
    }

    async fn call_stream(&self, req: ChatRequest) -> Result<lg_domain::stream::ChatStream> {
        let body = self.build_body(&req, true);
        let resp = self.post_with_retry(&self.chat_url(), &body).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ErrorKind::Upstream(format!("{status}: {text}")).into());
        }

        Ok(sse_response_stream(resp, |data| {
            if data == "[DONE]" {
                return vec![Ok(StreamEvent::Done { usage: None, finish_reason: None })];
            }
            let v: Value = match serde_json::from_str(data) {
                Ok(v) => v,
                Err(e) => return vec![Err(ErrorKind::Upstream(e.to_string()).into())],
            };
            let mut events = Vec::new();
            if let Some(delta) = v
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("delta"))
                .and_then(|d| d.get("content"))
                .and_then(Value::as_str)
            {
                if !delta.is_empty() {
                    events.push(Ok(StreamEvent::Token(delta.to_string())));
                }
            }
            let finish_reason = v
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("finish_reason"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let usage = usage_from_json(&v);
            if usage.is_some() || finish_reason.is_some() {
                events.push(Ok(StreamEvent::Done { usage, finish_reason }));
            }
            events
        }))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_api_key() {
        let cfg = LlmConfig { api_key: String::new(), model: "gpt-4o-mini".into(), base_url: "https://x".into() };
        assert!(OpenAiCompatProvider::from_config(&cfg).is_err());
    }

    #[test]
    fn builds_from_valid_config() {
        let cfg = LlmConfig { api_key: "sk-1".into(), model: "gpt-4o-mini".into(), base_url: "https://api.openai.com/v1".into() };
        let p = OpenAiCompatProvider::from_config(&cfg).unwrap();
        assert_eq!(p.chat_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn usage_extraction_handles_missing_cached_tokens() {
        let v = serde_json::json!({"usage": {"prompt_tokens": 100, "completion_tokens": 20}});
        let u = usage_from_json(&v).unwrap();
        assert_eq!(u.prompt_tokens, 100);
        assert_eq!(u.completion_tokens, 20);
        assert_eq!(u.cached_tokens, 0);
    }

    #[tokio::test]
    async fn transport_failure_is_retried_once_before_surfacing() {
        // Nothing listens on this port, so both attempts fail fast with a
        // connect error; the backoff sleep between them is the signal that
        // a retry actually happened rather than surfacing immediately.
        let cfg = LlmConfig { api_key: "sk-1".into(), model: "gpt-4o-mini".into(), base_url: "http://127.0.0.1:1".into() };
        let provider = OpenAiCompatProvider::from_config(&cfg).unwrap();
        let started = std::time::Instant::now();
        let err = provider.post_with_retry(&provider.chat_url(), &serde_json::json!({})).await;
        assert!(err.is_err());
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
