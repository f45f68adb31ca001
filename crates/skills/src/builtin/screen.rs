//! Screen skill — a stub. The real screen-description implementation (OCR /
//! vision model over a screenshot) is an external collaborator outside this
//! repo's scope (`spec.md` §1); this built-in only preserves the contract
//! shape from `ai_tools/ai_screen.py` so the Registry has an entry to
//! resolve and the Planner/Executor can be exercised end-to-end without it.

use async_trait::async_trait;
use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde_json::{json, Value};

use crate::invoker::SkillInvoker;

pub struct DescribeScreen;

#[async_trait]
impl SkillInvoker for DescribeScreen {
    fn name(&self) -> &str {
        "describe_screen"
    }
    fn description(&self) -> &str {
        "Describe what is currently visible on screen (not available in this deployment)."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema { required: vec![], parameters: json!({}) }
    }
    async fn call(&self, _args: Value) -> SkillOutcome {
        SkillOutcome::Err { message: "not_available: screen description requires an external agent".to_string() }
    }
}
