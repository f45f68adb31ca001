//! Realtime daily-first-start email task (`spec.md` §4.10): on process
//! start, if today's greeting hasn't gone out yet, ask the LLM to compose
//! one from `email.daily_prompt` and send it. Tracked via a singleton
//! `EmailTaskKind::Realtime` task whose `last_run_date` gates resends
//! within the same day — a restart an hour later is a no-op, a restart the
//! next morning fires again.

use chrono::Utc;
use lg_domain::message::Message;
use lg_domain::schedule::{EmailTaskKind, EmailTaskStatus, ScheduledEmailTask};
use lg_domain::skill::SkillOutcome;
use lg_providers::{ChatRequest, LlmProvider};
use lg_skills::builtin::email::SendEmail;
use lg_skills::invoker::SkillInvoker;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::store::ScheduleStore;

pub async fn run_daily_greeting(store: &ScheduleStore, llm: &dyn LlmProvider, sender: &SendEmail, daily_prompt: &str, recipient: &str) {
    if daily_prompt.trim().is_empty() || recipient.trim().is_empty() {
        return;
    }

    let today = Utc::now().date_naive();
    let existing = store.all().into_iter().find(|t| t.kind == EmailTaskKind::Realtime);
    if existing.as_ref().and_then(|t| t.last_run_date).map(|d| d == today).unwrap_or(false) {
        return;
    }

    let request = ChatRequest {
        messages: vec![
            Message::system("Reply with a compact JSON object {\"subject\": string, \"body\": string} and nothing else."),
            Message::user(daily_prompt),
        ],
        model: None,
        temperature: None,
        max_tokens: None,
    };
    let composed = match llm.call(request).await {
        Ok(resp) => resp.content,
        Err(e) => {
            warn!(error = %e, "daily greeting: LLM composition failed");
            return;
        }
    };
    let parsed: Value = match serde_json::from_str(composed.trim()) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, raw = %composed, "daily greeting: could not parse composed subject/body");
            return;
        }
    };
    let args = serde_json::json!({
        "to": recipient,
        "subject": parsed.get("subject").and_then(Value::as_str).unwrap_or("每日问候"),
        "body": parsed.get("body").and_then(Value::as_str).unwrap_or(""),
    });

    let outcome = sender.call(args).await;
    let sent = matches!(outcome, SkillOutcome::Ok { .. });
    if sent {
        info!("daily greeting sent");
    } else if let SkillOutcome::Err { message } = &outcome {
        error!(%message, "daily greeting send failed");
    }

    let task_id = existing.as_ref().map(|t| t.task_id).unwrap_or_else(Uuid::new_v4);
    if existing.is_some() {
        let _ = store.update(task_id, |t| t.last_run_date = Some(today));
    } else {
        let task = ScheduledEmailTask {
            task_id,
            kind: EmailTaskKind::Realtime,
            status: EmailTaskStatus::Sent,
            created_at: Utc::now(),
            scheduled_at: None,
            recurrence: None,
            args: Value::Null,
            last_run_date: Some(today),
        };
        let _ = store.insert(task);
    }
}
