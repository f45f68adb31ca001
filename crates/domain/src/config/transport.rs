use serde::{Deserialize, Serialize};

fn d_subscriber_buffer() -> usize {
    256
}

/// `spec.md` §6: `transport: {subscriber_buffer: default 256}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "d_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { subscriber_buffer: d_subscriber_buffer() }
    }
}
