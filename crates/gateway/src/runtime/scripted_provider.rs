//! Deterministic scripted [`LlmProvider`] test double: returns canned
//! `ChatResponse`/`StreamEvent` sequences in FIFO order instead of contacting
//! a real endpoint. `spec.md` §8 names this as the mechanism the S1-S6
//! end-to-end scenarios must be driven by.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream;
use lg_domain::error::{ErrorKind, Result};
use lg_domain::stream::{ChatStream, StreamEvent, Usage};
use lg_providers::{ChatRequest, ChatResponse, LlmProvider};
use parking_lot::Mutex;

pub struct ScriptedProvider {
    call_responses: Mutex<VecDeque<ChatResponse>>,
    stream_responses: Mutex<VecDeque<Vec<StreamEvent>>>,
    call_count: AtomicUsize,
    stream_count: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            call_responses: Mutex::new(VecDeque::new()),
            stream_responses: Mutex::new(VecDeque::new()),
            call_count: AtomicUsize::new(0),
            stream_count: AtomicUsize::new(0),
        }
    }

    pub fn push_call(&self, content: impl Into<String>) {
        self.call_responses.lock().push_back(ChatResponse { content: content.into(), usage: None });
    }

    pub fn push_stream(&self, events: Vec<StreamEvent>) {
        self.stream_responses.lock().push_back(events);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn stream_count(&self) -> usize {
        self.stream_count.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    /// Used only by the Executor's argument-binding call. With nothing
    /// queued this errors, which drives the Executor's documented fallback
    /// to the Plan step's own declared skill/arguments.
    async fn call(&self, _req: ChatRequest) -> Result<ChatResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_responses
            .lock()
            .pop_front()
            .ok_or_else(|| ErrorKind::Upstream("scripted provider: no canned call() response queued".to_string()).into())
    }

    async fn call_stream(&self, _req: ChatRequest) -> Result<ChatStream> {
        self.stream_count.fetch_add(1, Ordering::SeqCst);
        let events = self
            .stream_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| vec![StreamEvent::Done { usage: None, finish_reason: None }]);
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

/// One `Token` event per char plus a terminal `Done` — for byte-by-byte
/// streaming tests (`spec.md` §8 S6).
pub fn char_stream(text: &str, usage: Option<Usage>) -> Vec<StreamEvent> {
    let mut events: Vec<StreamEvent> = text.chars().map(|c| StreamEvent::Token(c.to_string())).collect();
    events.push(StreamEvent::Done { usage, finish_reason: Some("stop".to_string()) });
    events
}

/// A single `Token` carrying the whole text plus a terminal `Done`.
pub fn whole_stream(text: impl Into<String>, usage: Option<Usage>) -> Vec<StreamEvent> {
    vec![StreamEvent::Token(text.into()), StreamEvent::Done { usage, finish_reason: Some("stop".to_string()) }]
}
