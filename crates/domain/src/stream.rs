use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Token usage as reported by an LLM provider. Fields default to 0 when the
/// provider omits them — the ledger never estimates counts locally.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub cached_tokens: u64,
}

/// One event in a streamed chat completion.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A content delta.
    Token(String),
    /// Terminal event; `usage` may be `None` if the provider never reported it.
    Done {
        usage: Option<Usage>,
        finish_reason: Option<String>,
    },
    Error(String),
}

pub type ChatStream = BoxStream<'static, Result<StreamEvent, Error>>;
