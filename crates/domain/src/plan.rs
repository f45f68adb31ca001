use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The result of invoking a single step's skill.
///
/// `data` is either the raw skill return value, or — when the Planner's
/// read-only sub-loop produced it — a list of `{name, arguments, result}`
/// records. Either shape is legal; callers distinguish by inspecting the
/// JSON value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The declared skill invocation sketch for a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// One entry in a [`Plan`]'s `excute_plan`. `step` is 1-based and strictly
/// increasing within a plan; `skill.name` must resolve in the Skill
/// Registry — if it doesn't, the Executor fails the step rather than
/// refusing to build the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step: u32,
    pub desc: String,
    pub skill: SkillCall,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_results: Option<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<bool>,
}

/// The Planner's JSON artifact. A single mutable struct flows
/// Planner → Executor → Reviewer, each stage only ever adding optional
/// annotation fields; the Driver enforces stage order, not the type system
/// (`spec.md` §9, "Plan JSON as mutable tree across stages").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub is_skills: bool,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub excute_plan: Vec<Step>,
    #[serde(default)]
    pub thinking: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_back: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_passed: Option<bool>,
}

impl Plan {
    /// Degraded plan used when the Planner's JSON could not be parsed, or
    /// its sub-loop exhausted its turn limit without producing a Plan —
    /// both paths fall back to the raw model text as `thinking` with no
    /// steps, treated downstream as a knowledge-only answer.
    pub fn degraded(raw_text: impl Into<String>) -> Self {
        Self {
            is_skills: false,
            description: Vec::new(),
            excute_plan: Vec::new(),
            thinking: raw_text.into(),
            error: None,
            is_back: None,
            review_passed: None,
        }
    }

    /// `spec.md` §8 invariant 1: step numbers are `1..N` with no duplicates.
    pub fn step_numbers_valid(&self) -> bool {
        let mut seen: Vec<u32> = self.excute_plan.iter().map(|s| s.step).collect();
        seen.sort_unstable();
        seen.iter().enumerate().all(|(i, &n)| n == (i as u32 + 1))
    }

    pub fn all_steps_succeeded(&self) -> bool {
        self.excute_plan
            .iter()
            .all(|s| s.step_results.as_ref().is_some_and(|r| r.success))
    }

    pub fn failed_steps(&self) -> Vec<&Step> {
        self.excute_plan
            .iter()
            .filter(|s| !s.step_results.as_ref().is_some_and(|r| r.success))
            .collect()
    }
}

/// Transient per-request state. Created on `chat()`, destroyed after the
/// memory write that ends the turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub session_id: uuid::Uuid,
    pub user_text: String,
    pub enriched_text: String,
    pub start_ts: DateTime<Utc>,
    pub plans: Vec<Plan>,
    pub final_text: String,
    pub tool_executed_flag: bool,
}

impl Turn {
    pub fn new(user_text: impl Into<String>, enriched_text: impl Into<String>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4(),
            user_text: user_text.into(),
            enriched_text: enriched_text.into(),
            start_ts: Utc::now(),
            plans: Vec::new(),
            final_text: String::new(),
            tool_executed_flag: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_numbers_valid_detects_gaps_and_duplicates() {
        let mk = |nums: &[u32]| Plan {
            is_skills: true,
            description: vec![],
            excute_plan: nums
                .iter()
                .map(|&n| Step {
                    step: n,
                    desc: String::new(),
                    skill: SkillCall { name: "x".into(), arguments: Value::Null },
                    step_results: None,
                    check: None,
                })
                .collect(),
            thinking: String::new(),
            error: None,
            is_back: None,
            review_passed: None,
        };
        assert!(mk(&[1, 2, 3]).step_numbers_valid());
        assert!(!mk(&[1, 3]).step_numbers_valid());
        assert!(!mk(&[1, 1, 2]).step_numbers_valid());
        assert!(mk(&[]).step_numbers_valid());
    }

    #[test]
    fn all_steps_succeeded_requires_results_present() {
        let mut plan = Plan::degraded("x");
        plan.excute_plan.push(Step {
            step: 1,
            desc: "d".into(),
            skill: SkillCall { name: "read_file".into(), arguments: Value::Null },
            step_results: None,
            check: None,
        });
        assert!(!plan.all_steps_succeeded());
        plan.excute_plan[0].step_results = Some(StepResult {
            success: true,
            message: "ok".into(),
            data: Value::Null,
            error: None,
        });
        assert!(plan.all_steps_succeeded());
    }
}
