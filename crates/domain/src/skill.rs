use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `spec.md` §3: a skill is read-only or write; the read-only gate and the
/// write-exclusion invariant both key off this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillPermission {
    Read,
    Write,
}

/// The JSON schema a skill publishes for itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSchema {
    pub required: Vec<String>,
    pub parameters: Value,
}

/// What the Planner sees (`list_brief`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillBrief {
    pub name: String,
    pub description: String,
}

/// What the Executor sees when binding arguments (`list_full`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillFull {
    pub name: String,
    pub description: String,
    pub permission: SkillPermission,
    pub schema: SkillSchema,
}

/// The outcome of invoking a skill's callable. A tagged variant rather than
/// an untyped dict (`spec.md` §9's `SkillInvoker` redesign).
#[derive(Debug, Clone)]
pub enum SkillOutcome {
    Ok { message: String, data: Value },
    Err { message: String },
}
