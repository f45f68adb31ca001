use serde::{Deserialize, Serialize};

fn d_max_review_rounds() -> u32 {
    3
}
fn d_skill_timeout_seconds() -> u64 {
    30
}

/// `spec.md` §6: `turn: {max_review_rounds: default 3, skill_timeout_seconds: default 30}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    #[serde(default = "d_max_review_rounds")]
    pub max_review_rounds: u32,
    #[serde(default = "d_skill_timeout_seconds")]
    pub skill_timeout_seconds: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_review_rounds: d_max_review_rounds(),
            skill_timeout_seconds: d_skill_timeout_seconds(),
        }
    }
}
