use serde::{Deserialize, Serialize};

fn d_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn d_model() -> String {
    "gpt-4o-mini".to_string()
}

/// `spec.md` §6: `llm: {api_key, model, base_url}` — required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { api_key: String::new(), model: d_model(), base_url: d_base_url() }
    }
}

fn d_input_cached() -> f64 {
    1.25
}
fn d_input_uncached() -> f64 {
    2.5
}
fn d_output() -> f64 {
    10.0
}

/// Per-million-token USD rates used by the Token Ledger's cost formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRatesConfig {
    #[serde(default = "d_input_cached")]
    pub input_cached_per_million: f64,
    #[serde(default = "d_input_uncached")]
    pub input_uncached_per_million: f64,
    #[serde(default = "d_output")]
    pub output_per_million: f64,
}

impl Default for TokenRatesConfig {
    fn default() -> Self {
        Self {
            input_cached_per_million: d_input_cached(),
            input_uncached_per_million: d_input_uncached(),
            output_per_million: d_output(),
        }
    }
}
