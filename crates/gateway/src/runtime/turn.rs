//! Turn Driver (`spec.md` §4.8): owns the per-turn lifecycle, running the
//! bounded Planner → Executor → Reviewer loop and framing its output with
//! the control-token protocol.

use std::sync::Arc;

use chrono::Duration;
use lg_domain::error::Error;
use lg_domain::plan::{Plan, Turn};
use lg_memory::{DialogMemory, TokenLedger};

use super::cancel::CancelToken;
use super::executor::Executor;
use super::planner::Planner;
use super::reviewer::Reviewer;
use super::transport::SessionTransport;

const FINAL_CHUNK_SIZE: usize = 120;

pub struct TurnDriver {
    planner: Planner,
    executor: Executor,
    reviewer: Reviewer,
    memory: Arc<DialogMemory>,
    ledger: Arc<TokenLedger>,
    max_review_rounds: u32,
}

/// Outcome of one full turn, beyond the bytes already pushed to the
/// transport — the Turn Driver's entry point is a stream of side effects, so
/// the only thing callers need back is the tool-execution flag (`spec.md`
/// §3's `Turn.tool_executed_flag`) for downstream UI hints.
pub struct TurnOutcome {
    pub final_text: String,
    pub tool_executed_flag: bool,
}

impl TurnDriver {
    pub fn new(
        planner: Planner,
        executor: Executor,
        reviewer: Reviewer,
        memory: Arc<DialogMemory>,
        ledger: Arc<TokenLedger>,
        max_review_rounds: u32,
    ) -> Self {
        Self { planner, executor, reviewer, memory, ledger, max_review_rounds }
    }

    /// `spec.md` §4.8's `chat(text, stream)` entry point. All output is
    /// pushed to `transport` as it's produced; the returned `TurnOutcome`
    /// only carries what the caller needs after the stream ends.
    pub async fn chat(&self, user_text: &str, transport: &SessionTransport, cancel: &CancelToken) -> Result<TurnOutcome, Error> {
        let enriched_text = self.build_enriched_text(user_text);
        let mut turn = Turn::new(user_text, enriched_text.clone());
        self.ledger.start_session(&turn.session_id.to_string());

        transport.publish_text("[[PROGRESS_START]]");

        let mut prior_plan: Option<Plan> = None;
        let mut final_answer = String::new();
        let mut tool_executed_flag = false;

        for round in 1..=self.max_review_rounds {
            if cancel.is_cancelled() {
                break;
            }

            transport.publish_text(format!("规划思考（第{round}轮）:\n"));
            let mut plan = self
                .planner
                .plan(&turn.enriched_text, prior_plan.as_ref(), transport, cancel, &self.ledger)
                .await?;

            transport.publish_text("\n执行结果:\n");
            let step_tool_executed = if plan.is_skills {
                self.executor.execute(&mut plan, &self.ledger, transport, cancel).await?
            } else {
                false
            };
            tool_executed_flag = tool_executed_flag || step_tool_executed;

            transport.publish_text("\n审查结果:\n");
            let verdict = self
                .reviewer
                .review(&mut plan, user_text, round, self.max_review_rounds, &self.ledger, transport, cancel)
                .await?;
            if let Ok(pretty) = serde_json::to_string_pretty(&plan) {
                transport.publish_text(format!("{pretty}\n"));
            }

            turn.plans.push(plan.clone());
            prior_plan = Some(plan);

            if verdict.review_passed || !verdict.need_replan {
                final_answer = verdict.final_answer;
                break;
            }
        }

        if cancel.is_cancelled() {
            final_answer = format!("{final_answer}[用户已停止生成]");
        }

        transport.publish_text("[[PROGRESS_END]][[FINAL_START]]");
        for chunk in chunk_str(&final_answer, FINAL_CHUNK_SIZE) {
            transport.publish_text(chunk);
        }
        transport.publish_text("[[FINAL_END]]");

        turn.final_text = final_answer.clone();
        turn.tool_executed_flag = tool_executed_flag;

        // Persist what subscribers actually saw this turn, not a fabricated
        // stand-in — `spec.md` §4.8's memory window reconstructs the real
        // progress narrative on the next turn, not a template.
        let full_output = transport.take_text_log();
        self.memory.append(user_text, &full_output);

        transport.publish(super::transport::TransportEvent::Stats(self.ledger.summary()));

        Ok(TurnOutcome { final_text: final_answer, tool_executed_flag })
    }

    /// `spec.md` §4.8 step 1: prepend the last-hour memory window as
    /// alternating `用户:`/`助手:` lines under `[历史对话]`, followed by the
    /// current question under `[当前问题]`.
    fn build_enriched_text(&self, user_text: &str) -> String {
        let window = Duration::hours(1);
        let recent = self.memory.recent(window);
        if recent.is_empty() {
            return user_text.to_string();
        }

        let mut out = String::new();
        out.push_str("[历史对话]\n");
        for record in &recent {
            out.push_str("用户: ");
            out.push_str(&record.question);
            out.push('\n');
            out.push_str("助手: ");
            out.push_str(&record.response);
            out.push('\n');
        }
        out.push_str("[当前问题]\n");
        out.push_str(user_text);
        out
    }
}

fn chunk_str(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max_chars).map(|c| c.iter().collect()).collect()
}
