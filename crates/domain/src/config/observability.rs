use serde::{Deserialize, Serialize};

fn d_log_filter() -> String {
    "info".to_string()
}

/// Logging/tracing knobs, grounded on the ancestor gateway's tracing init.
/// `otlp_endpoint` unset (the default) means spans are recorded locally
/// only; setting it turns on OTLP export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "d_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_filter: d_log_filter(), json_logs: false, otlp_endpoint: None }
    }
}
