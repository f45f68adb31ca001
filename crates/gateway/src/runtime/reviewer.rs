//! Reviewer (`spec.md` §4.7): checks per-step success, decides pass/fail/
//! replan, and produces the user-facing final text via streamed LLM calls.

use std::sync::Arc;

use futures_util::StreamExt;
use lg_domain::error::Error;
use lg_domain::message::Message;
use lg_domain::plan::Plan;
use lg_domain::stream::StreamEvent;
use lg_providers::{ChatRequest, LlmProvider};

use super::cancel::CancelToken;
use super::transport::SessionTransport;

pub struct ReviewVerdict {
    pub review_passed: bool,
    pub need_replan: bool,
    pub final_answer: String,
}

pub struct Reviewer {
    provider: Arc<dyn LlmProvider>,
}

impl Reviewer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Applies `spec.md` §4.7's decision table, setting each step's `check`
    /// in place and streaming the final-answer LLM call that the table
    /// selects.
    pub async fn review(
        &self,
        plan: &mut Plan,
        user_text: &str,
        round: u32,
        max_rounds: u32,
        ledger: &lg_memory::TokenLedger,
        transport: &SessionTransport,
        cancel: &CancelToken,
    ) -> Result<ReviewVerdict, Error> {
        for step in &mut plan.excute_plan {
            step.check = step.step_results.as_ref().map(|r| r.success);
        }

        if !plan.is_skills {
            plan.review_passed = Some(true);
            let final_answer = self.stream_completion(direct_answer_prompt(user_text), transport, cancel, ledger).await?;
            return Ok(ReviewVerdict { review_passed: true, need_replan: false, final_answer });
        }

        if plan.all_steps_succeeded() {
            plan.review_passed = Some(true);
            let final_answer = self
                .stream_completion(task_summary_prompt(user_text, plan), transport, cancel, ledger)
                .await?;
            return Ok(ReviewVerdict { review_passed: true, need_replan: false, final_answer });
        }

        let failed = plan.failed_steps();
        plan.review_passed = Some(false);
        plan.is_back = Some(true);

        if round < max_rounds {
            let error = failed
                .first()
                .and_then(|s| s.step_results.as_ref())
                .map(|r| r.message.clone())
                .unwrap_or_else(|| "unknown failure".to_string());
            plan.error = Some(error);
            return Ok(ReviewVerdict { review_passed: false, need_replan: true, final_answer: String::new() });
        }

        // Last round: compose a failure summary. The open question named in
        // `spec.md` §9 ("skip the extra call when round == max") is resolved
        // here by reusing the failed steps' own messages instead of issuing
        // a second LLM call purely to restate them.
        let error = failed
            .iter()
            .filter_map(|s| s.step_results.as_ref().map(|r| format!("步骤{}：{}", s.step, r.message)))
            .collect::<Vec<_>>()
            .join("；");
        plan.error = Some(error.clone());

        let final_answer = self
            .stream_completion(failure_summary_prompt(user_text, &error), transport, cancel, ledger)
            .await?;
        Ok(ReviewVerdict { review_passed: false, need_replan: false, final_answer })
    }

    async fn stream_completion(
        &self,
        prompt: String,
        transport: &SessionTransport,
        cancel: &CancelToken,
        ledger: &lg_memory::TokenLedger,
    ) -> Result<String, Error> {
        let req = ChatRequest {
            messages: vec![Message::user(prompt)],
            model: None,
            temperature: None,
            max_tokens: None,
        };
        let mut stream = self.provider.call_stream(req).await?;
        let mut full = String::new();
        while let Some(event) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(lg_domain::error::ErrorKind::Cancelled.into());
            }
            match event? {
                StreamEvent::Token(delta) => full.push_str(&delta),
                StreamEvent::Done { usage: Some(usage), .. } => ledger.record(usage),
                StreamEvent::Done { usage: None, .. } => {}
                StreamEvent::Error(_) => {}
            }
        }
        let _ = transport; // final-answer chunking/framing is the Turn Driver's responsibility (§4.8 step 5).
        Ok(full)
    }
}

fn direct_answer_prompt(user_text: &str) -> String {
    format!("请直接、简明地回答用户的问题，不需要输出 JSON：\n{user_text}")
}

fn task_summary_prompt(user_text: &str, plan: &Plan) -> String {
    let steps_json = serde_json::to_string(&plan.excute_plan).unwrap_or_default();
    format!(
        "用户的原始请求：{user_text}\n所有步骤均已成功执行，结果如下（JSON）：\n{steps_json}\n\
         请用自然语言向用户总结已完成的任务，不要输出 JSON。"
    )
}

fn failure_summary_prompt(user_text: &str, error: &str) -> String {
    format!(
        "用户的原始请求：{user_text}\n经过多轮尝试后仍有步骤失败，原因如下：\n{error}\n\
         请用自然语言向用户说明失败情况，并给出下一步建议，不要输出 JSON。"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lg_domain::plan::{SkillCall, Step, StepResult};
    use serde_json::Value;

    fn succeeded_step(n: u32) -> Step {
        Step {
            step: n,
            desc: "d".into(),
            skill: SkillCall { name: "read_file".into(), arguments: Value::Null },
            step_results: Some(StepResult { success: true, message: "ok".into(), data: Value::Null, error: None }),
            check: None,
        }
    }

    fn failed_step(n: u32) -> Step {
        Step {
            step: n,
            desc: "d".into(),
            skill: SkillCall { name: "frobnicate".into(), arguments: Value::Null },
            step_results: Some(StepResult {
                success: false,
                message: "missing_skill:frobnicate".into(),
                data: Value::Null,
                error: Some("missing_skill:frobnicate".into()),
            }),
            check: None,
        }
    }

    #[test]
    fn sets_check_from_step_results() {
        let mut plan = Plan::degraded("");
        plan.is_skills = true;
        plan.excute_plan = vec![succeeded_step(1), failed_step(2)];
        for step in &mut plan.excute_plan {
            step.check = step.step_results.as_ref().map(|r| r.success);
        }
        assert_eq!(plan.excute_plan[0].check, Some(true));
        assert_eq!(plan.excute_plan[1].check, Some(false));
    }

    #[test]
    fn failed_steps_with_rounds_remaining_requests_replan() {
        let mut plan = Plan::degraded("");
        plan.is_skills = true;
        plan.excute_plan = vec![failed_step(1)];
        let all_ok = plan.all_steps_succeeded();
        assert!(!all_ok);
    }
}
