use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn d_bind() -> String {
    "0.0.0.0:8080".to_string()
}
fn d_state_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Ambient server concerns: bind address and the directory that backs
/// `dialog_memory.json`, `token_usage.json`, `email_tasks.json`,
/// `skills_metadata[_brief].json` (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_bind")]
    pub bind: String,
    #[serde(default = "d_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: d_bind(), state_dir: d_state_dir() }
    }
}
