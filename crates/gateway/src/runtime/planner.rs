//! Planner (`spec.md` §4.5): user text + optional prior trace → Plan JSON,
//! streaming its `"thinking"` field to the transport as it arrives and
//! optionally consulting read-only skills along the way.

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use lg_domain::error::{Error, ErrorKind};
use lg_domain::message::Message;
use lg_domain::plan::Plan;
use lg_domain::skill::{SkillBrief, SkillPermission};
use lg_domain::stream::StreamEvent;
use lg_providers::{ChatRequest, LlmProvider};
use lg_skills::SkillRegistry;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::cancel::CancelToken;
use super::thinking::ThinkingExtractor;
use super::transport::SessionTransport;

const MAX_SUBLOOP_ITERATIONS: u32 = 3;

/// Names starting with one of these prefixes, and containing none of the
/// forbidden substrings, may be called during the Planner's information-
/// gathering sub-loop (`spec.md` §4.5 point 3).
const READ_ONLY_PREFIXES: &[&str] = &["read_", "get_", "list_", "search_", "query_", "check_"];
const WRITE_LIKE_SUBSTRINGS: &[&str] =
    &["delete", "remove", "update", "write", "create", "append", "set_", "move_", "copy_", "upload", "push", "merge"];

pub fn passes_read_only_gate(name: &str) -> bool {
    READ_ONLY_PREFIXES.iter().any(|p| name.starts_with(p)) && !WRITE_LIKE_SUBSTRINGS.iter().any(|f| name.contains(f))
}

#[derive(Deserialize)]
struct ToolCallRequest {
    action: String,
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<SkillRegistry>,
}

impl Planner {
    pub fn new(provider: Arc<dyn LlmProvider>, registry: Arc<SkillRegistry>) -> Self {
        Self { provider, registry }
    }

    /// Produce a Plan for `enriched_user_text`. `prior_trace` is the
    /// previous round's executed Plan, used only to build the "pre-review"
    /// exclusion rule — steps that already succeeded must not be re-planned.
    pub async fn plan(
        &self,
        enriched_user_text: &str,
        prior_trace: Option<&Plan>,
        transport: &SessionTransport,
        cancel: &CancelToken,
        ledger: &lg_memory::TokenLedger,
    ) -> Result<Plan, Error> {
        let summary = ledger.summary();
        let task_stat = format!("今日已调用模型 {} 次", summary.today.calls);
        let token_usage_snippet = format!(
            "累计输入(缓存/未缓存)：{}/{}，累计输出：{}，累计花费：{:.8}",
            summary.total.input_cached, summary.total.input_uncached, summary.total.output, summary.total.cost
        );
        let system_prompt = build_system_prompt(&self.registry.list_brief(), prior_trace, &task_stat, &token_usage_snippet);
        let mut messages = vec![Message::system(system_prompt), Message::user(enriched_user_text)];

        for iteration in 0..MAX_SUBLOOP_ITERATIONS {
            if cancel.is_cancelled() {
                return Err(ErrorKind::Cancelled.into());
            }

            let (raw_text, usage) = self.stream_one_completion(messages.clone(), transport, cancel).await?;
            if let Some(usage) = usage {
                ledger.record(usage);
            }

            match serde_json::from_str::<Value>(raw_text.trim()) {
                Ok(value) => {
                    if let Ok(tool_call) = serde_json::from_value::<ToolCallRequest>(value.clone()) {
                        if tool_call.action == "call_skill" {
                            if iteration + 1 == MAX_SUBLOOP_ITERATIONS {
                                // Sub-loop exhausted; degrade rather than force failure
                                // (open question decided in favor of the source's behavior).
                                return Ok(Plan::degraded(raw_text));
                            }
                            let tool_result = self.run_gated_tool_call(&tool_call).await;
                            messages.push(Message::assistant(raw_text));
                            messages.push(Message::system(tool_result));
                            continue;
                        }
                    }
                    return Ok(parse_plan_with_defaults(value, raw_text));
                }
                Err(_) => return Ok(Plan::degraded(raw_text)),
            }
        }

        // Unreachable in practice: the loop above always returns by its last
        // iteration, but keep an explicit fallback for the type checker.
        Ok(Plan::degraded(String::new()))
    }

    async fn run_gated_tool_call(&self, tool_call: &ToolCallRequest) -> String {
        if !passes_read_only_gate(&tool_call.name) {
            return serde_json::json!({
                "error": format!("禁止调用修改类技能:{}", tool_call.name)
            })
            .to_string();
        }
        match self.registry.permission(&tool_call.name) {
            Some(SkillPermission::Read) => {}
            Some(SkillPermission::Write) => {
                return serde_json::json!({ "error": format!("禁止调用修改类技能:{}", tool_call.name) }).to_string();
            }
            None => {
                return serde_json::json!({ "error": format!("missing_skill:{}", tool_call.name) }).to_string();
            }
        }
        match self.registry.invoke(&tool_call.name, tool_call.arguments.clone()).await {
            Ok(outcome) => match outcome {
                lg_domain::skill::SkillOutcome::Ok { message, data } => {
                    serde_json::json!({ "message": message, "data": data }).to_string()
                }
                lg_domain::skill::SkillOutcome::Err { message } => serde_json::json!({ "error": message }).to_string(),
            },
            Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
        }
    }

    /// Stream one completion, extracting and forwarding the `"thinking"`
    /// field to the transport as it arrives; returns the full raw text and
    /// the terminal usage record, if any.
    async fn stream_one_completion(
        &self,
        messages: Vec<Message>,
        transport: &SessionTransport,
        cancel: &CancelToken,
    ) -> Result<(String, Option<lg_domain::stream::Usage>), Error> {
        let req = ChatRequest { messages, model: None, temperature: None, max_tokens: None };
        let mut stream = self.provider.call_stream(req).await?;
        let mut full = String::new();
        let mut extractor = ThinkingExtractor::new();
        let mut usage = None;

        while let Some(event) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(ErrorKind::Cancelled.into());
            }
            match event? {
                StreamEvent::Token(delta) => {
                    full.push_str(&delta);
                    let extracted = extractor.feed(&delta);
                    if !extracted.is_empty() {
                        transport.publish_text(extracted);
                    }
                }
                StreamEvent::Done { usage: u, .. } => {
                    usage = u;
                }
                StreamEvent::Error(message) => {
                    warn!(%message, "planner stream reported an error event");
                }
            }
        }
        Ok((full, usage))
    }
}

fn parse_plan_with_defaults(value: Value, raw_text: String) -> Plan {
    serde_json::from_value::<Plan>(value).unwrap_or_else(|_| Plan::degraded(raw_text))
}

fn build_system_prompt(skills: &[SkillBrief], prior_trace: Option<&Plan>, task_stat: &str, token_usage_snippet: &str) -> String {
    let skills_json = serde_json::to_string(skills).unwrap_or_default();
    let now = Utc::now().to_rfc3339();

    let mut prompt = String::new();
    prompt.push_str(
        "你是一个工具使用型对话代理的规划模块。根据用户的问题和可用技能，产出一个严格的 JSON 计划。\n\n",
    );
    prompt.push_str("可用技能（name, description）：\n");
    prompt.push_str(&skills_json);
    prompt.push_str("\n\n");
    prompt.push_str(task_stat);
    prompt.push('\n');
    prompt.push_str(token_usage_snippet);
    prompt.push_str("\n\n当前时间：");
    prompt.push_str(&now);
    prompt.push_str(
        "\n\n输出必须是严格的 JSON，且仅包含以下两种形态之一：\n\
         1) 工具调用：{\"action\": \"call_skill\", \"name\": \"<skill name>\", \"arguments\": {...}}\n\
            你可以在最终计划前调用只读技能来收集信息；只读技能名称必须以 \
            read_/get_/list_/search_/query_/check_ 之一开头，且不得包含 \
            delete/remove/update/write/create/append/set_/move_/copy_/upload/push/merge。\n\
            禁止在规划阶段调用写类技能。\n\
         2) 最终计划：{\"is_skills\": bool, \"description\": [string], \
            \"excute_plan\": [{\"step\": int, \"desc\": string, \"skill\": {\"name\": string, \"arguments\": object}}], \
            \"thinking\": string}\n\n",
    );

    if let Some(trace) = prior_trace {
        let succeeded: Vec<&str> = trace
            .excute_plan
            .iter()
            .filter(|s| s.step_results.as_ref().is_some_and(|r| r.success))
            .map(|s| s.desc.as_str())
            .collect();
        if !succeeded.is_empty() {
            prompt.push_str("以下步骤在上一轮已经成功执行，请不要在新计划中重复包含它们：\n");
            for desc in succeeded {
                prompt.push_str("- ");
                prompt.push_str(desc);
                prompt.push('\n');
            }
            prompt.push('\n');
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_gate_accepts_declared_prefixes() {
        assert!(passes_read_only_gate("read_file"));
        assert!(passes_read_only_gate("list_tasks"));
        assert!(passes_read_only_gate("check_software"));
    }

    #[test]
    fn read_only_gate_rejects_write_like_names_even_with_read_prefix() {
        assert!(!passes_read_only_gate("list_and_delete_paths"));
        assert!(!passes_read_only_gate("get_and_update_profile"));
    }

    #[test]
    fn read_only_gate_rejects_names_without_allowed_prefix() {
        assert!(!passes_read_only_gate("delete_paths"));
        assert!(!passes_read_only_gate("send_email"));
    }

    #[test]
    fn system_prompt_lists_previously_succeeded_steps() {
        use lg_domain::plan::{SkillCall, Step, StepResult};
        let mut trace = Plan::degraded("");
        trace.excute_plan.push(Step {
            step: 1,
            desc: "create a.md".into(),
            skill: SkillCall { name: "create_folder".into(), arguments: Value::Null },
            step_results: Some(StepResult { success: true, message: "ok".into(), data: Value::Null, error: None }),
            check: None,
        });
        let prompt = build_system_prompt(&[], Some(&trace), "", "");
        assert!(prompt.contains("create a.md"));
    }
}
