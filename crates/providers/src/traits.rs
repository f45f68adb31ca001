use lg_domain::error::Result;
use lg_domain::message::Message;
use lg_domain::stream::{ChatStream, Usage};

/// A provider-agnostic chat completion request — `spec.md` §4.1's single
/// operation: given an ordered message list, return either a full string or
/// a token stream, surfacing usage counters either way.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Every LLM adapter implements this. This is the *only* place the real LLM
/// endpoint is contacted — every other component depends on this contract,
/// enabling a deterministic scripted double for tests.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn call(&self, req: ChatRequest) -> Result<ChatResponse>;

    async fn call_stream(&self, req: ChatRequest) -> Result<ChatStream>;

    fn provider_id(&self) -> &str;
}
