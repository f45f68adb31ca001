use serde::{Deserialize, Serialize};

fn d_window_seconds() -> u64 {
    3600
}

/// `spec.md` §6: `memory: {window_seconds: default 3600, max_records: optional cap}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "d_window_seconds")]
    pub window_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_records: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { window_seconds: d_window_seconds(), max_records: None }
    }
}
