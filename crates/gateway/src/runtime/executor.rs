//! Executor (`spec.md` §4.6): walks a Plan's steps in order, binding each
//! step's arguments via the LLM against accumulated context, invoking the
//! skill, and writing `step_results` back in place.

use std::sync::Arc;
use std::time::Duration;

use lg_domain::error::Error;
use lg_domain::message::Message;
use lg_domain::plan::{Plan, StepResult};
use lg_domain::skill::{SkillFull, SkillOutcome};
use lg_providers::{ChatRequest, LlmProvider};
use lg_skills::SkillRegistry;
use serde::Deserialize;
use serde_json::Value;

use super::cancel::CancelToken;
use super::transport::SessionTransport;

const CONTEXT_MEMORY_BUDGET_BYTES: usize = 8 * 1024;
const ARGUMENT_SKETCH_BUDGET_BYTES: usize = 2 * 1024;

#[derive(Deserialize)]
struct BoundToolCall {
    #[allow(dead_code)]
    action: String,
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// One entry of the Executor's growing context, mirroring `spec.md` §4.6's
/// `[{step, desc, skill, result}]` list fed back into later step-bind
/// prompts.
#[derive(serde::Serialize)]
struct ContextEntry<'a> {
    step: u32,
    desc: &'a str,
    skill: &'a str,
    result: &'a StepResult,
}

pub struct Executor {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<SkillRegistry>,
    skill_timeout_seconds: u64,
}

impl Executor {
    pub fn new(provider: Arc<dyn LlmProvider>, registry: Arc<SkillRegistry>, skill_timeout_seconds: u64) -> Self {
        Self { provider, registry, skill_timeout_seconds }
    }

    /// Executes every step of `plan` in place. Returns whether any tool was
    /// actually invoked (the Turn Driver's `tool_executed_in_last_chat`
    /// flag), fed from the Executor's own fallback path too.
    pub async fn execute(
        &self,
        plan: &mut Plan,
        ledger: &lg_memory::TokenLedger,
        transport: &SessionTransport,
        cancel: &CancelToken,
    ) -> Result<bool, Error> {
        let mut tool_executed = false;
        let mut context: Vec<(u32, String, String, StepResult)> = Vec::new();

        for step in &mut plan.excute_plan {
            if cancel.is_cancelled() {
                return Err(lg_domain::error::ErrorKind::Cancelled.into());
            }

            let entries: Vec<ContextEntry> = context
                .iter()
                .map(|(s, d, k, r)| ContextEntry { step: *s, desc: d, skill: k, result: r })
                .collect();
            let context_json = truncate_json(&entries, CONTEXT_MEMORY_BUDGET_BYTES);
            let sketch_json = truncate_json(&step.skill.arguments, ARGUMENT_SKETCH_BUDGET_BYTES);

            let schema = self.registry.list_full().into_iter().find(|s| s.name == step.skill.name);
            let bind_prompt = build_bind_prompt(&step.desc, &step.skill.name, &sketch_json, schema.as_ref(), &context_json);

            let req = ChatRequest {
                messages: vec![
                    Message::system(
                        "你是一个参数绑定助手。请根据步骤描述和已有结果，输出严格 JSON：\
                         {\"action\":\"call_skill\",\"name\":string,\"arguments\":object}。\
                         参数中的占位描述（例如“步骤1返回的文件”）必须替换为此前步骤结果中的具体值。",
                    ),
                    Message::user(bind_prompt),
                ],
                model: None,
                temperature: None,
                max_tokens: None,
            };

            let (name, arguments, bound) = match self.provider.call(req).await {
                Ok(resp) => {
                    if let Some(usage) = resp.usage {
                        ledger.record(usage);
                    }
                    match serde_json::from_str::<BoundToolCall>(resp.content.trim()) {
                        Ok(call) => (call.name, call.arguments, true),
                        Err(_) => (step.skill.name.clone(), step.skill.arguments.clone(), false),
                    }
                }
                Err(_) => (step.skill.name.clone(), step.skill.arguments.clone(), false),
            };

            let normalized = self.registry.normalize(&name, arguments);
            let timeout = Duration::from_secs(self.skill_timeout_seconds);
            let outcome = tokio::time::timeout(timeout, self.registry.invoke(&name, normalized)).await;
            tool_executed = true;
            let _ = bound; // the fallback path still executes a skill, so `tool_executed` stays true either way.

            let result = match outcome {
                Ok(Ok(outcome)) => analyze_outcome(outcome),
                Ok(Err(e)) => StepResult { success: false, message: e.to_string(), data: Value::Null, error: Some(e.to_string()) },
                Err(_) => StepResult {
                    success: false,
                    message: format!("技能{name}执行超时（{}秒）", self.skill_timeout_seconds),
                    data: Value::Null,
                    error: Some(lg_domain::error::ErrorKind::SkillTimeout.to_string()),
                },
            };

            transport.publish_text(format!("步骤{}：调用技能{}\n", step.step, name));
            transport.publish_text(format!("步骤{}：{}\n", step.step, result.message));

            context.push((step.step, step.desc.clone(), name, result.clone()));
            step.step_results = Some(result);
        }

        Ok(tool_executed)
    }
}

fn build_bind_prompt(desc: &str, skill_name: &str, sketch_json: &str, schema: Option<&SkillFull>, context_json: &str) -> String {
    let schema_json = schema.map(|s| serde_json::to_string(s).unwrap_or_default()).unwrap_or_default();
    format!(
        "步骤描述：{desc}\n技能名称：{skill_name}\n原始参数草图：{sketch_json}\n技能完整 schema：{schema_json}\n已执行步骤上下文：{context_json}"
    )
}

fn truncate_json<T: serde::Serialize>(value: &T, budget_bytes: usize) -> String {
    let full = serde_json::to_string(value).unwrap_or_default();
    if full.len() <= budget_bytes {
        full
    } else {
        // Truncate on a char boundary so multi-byte UTF-8 never splits.
        let mut end = budget_bytes;
        while !full.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…(truncated)", &full[..end])
    }
}

/// `spec.md` §4.6's success analyzer, shared between the Executor (to decide
/// `StepResult.success`) and the Reviewer (to set `Step.check`).
pub fn analyze_outcome(outcome: SkillOutcome) -> StepResult {
    match outcome {
        SkillOutcome::Err { message } => StepResult { success: false, message: message.clone(), data: Value::Null, error: Some(message) },
        SkillOutcome::Ok { message, data } => analyze_value(message, data),
    }
}

fn analyze_value(message: String, data: Value) -> StepResult {
    match &data {
        Value::Object(map) => {
            let is_error_status = map.get("status").and_then(Value::as_str) == Some("error");
            let is_explicit_failure = map.get("success").and_then(Value::as_bool) == Some(false);
            if is_error_status || is_explicit_failure {
                let msg = map.get("message").and_then(Value::as_str).unwrap_or(&message).to_string();
                StepResult { success: false, message: msg.clone(), data, error: Some(msg) }
            } else {
                StepResult { success: true, message, data, error: None }
            }
        }
        Value::Array(items) => {
            let failed = items
                .iter()
                .filter(|item| item.get("success").and_then(Value::as_bool) == Some(false))
                .count();
            if failed > 0 {
                let msg = format!("{failed} 项执行失败");
                StepResult { success: false, message: msg.clone(), data, error: Some(msg) }
            } else {
                StepResult { success: true, message, data, error: None }
            }
        }
        _ => StepResult { success: true, message: "执行完成".to_string(), data, error: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn analyzes_error_status_dict_as_failure() {
        let result = analyze_outcome(SkillOutcome::Ok {
            message: "ignored".into(),
            data: json!({"status": "error", "message": "bad path"}),
        });
        assert!(!result.success);
        assert_eq!(result.message, "bad path");
    }

    #[test]
    fn analyzes_plain_dict_as_success() {
        let result = analyze_outcome(SkillOutcome::Ok { message: "done".into(), data: json!({"path": "/tmp/x"}) });
        assert!(result.success);
        assert_eq!(result.message, "done");
    }

    #[test]
    fn analyzes_list_with_failed_element() {
        let result = analyze_outcome(SkillOutcome::Ok {
            message: "batch".into(),
            data: json!([{"success": true}, {"success": false}]),
        });
        assert!(!result.success);
        assert!(result.message.contains('1'));
    }

    #[test]
    fn analyzes_scalar_as_generic_success() {
        let result = analyze_outcome(SkillOutcome::Ok { message: "x".into(), data: json!(42) });
        assert!(result.success);
        assert_eq!(result.message, "执行完成");
    }

    #[test]
    fn outcome_err_is_always_failure() {
        let result = analyze_outcome(SkillOutcome::Err { message: "boom".into() });
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn truncate_json_respects_budget_and_char_boundaries() {
        let long = "x".repeat(100);
        let out = truncate_json(&long, 10);
        assert!(out.len() < long.len() + 20);
    }
}
