//! Email skills — grounded on `ai_time_tools/ai_email.py`: direct send plus
//! a scheduling entry point. `schedule_email` never sends itself; it hands
//! the task off to the [`EmailScheduleSink`] (the gateway's schedule store,
//! §4.10) and returns the new task id.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as MailMessage, Tokio1Executor};
use lg_domain::config::EmailConfig;
use lg_domain::schedule::{EmailScheduleSink, Recurrence};
use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde_json::{json, Value};

use crate::invoker::SkillInvoker;

fn build_message(cfg: &EmailConfig, args: &Value) -> Result<MailMessage, String> {
    let to = args.get("to").and_then(Value::as_str).filter(|s| !s.is_empty()).unwrap_or(&cfg.default_recipient);
    if to.is_empty() {
        return Err("to_empty: recipient must not be empty".to_string());
    }
    let sender = args
        .get("sender_email")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(&cfg.default_sender);
    let subject = args.get("subject").and_then(Value::as_str).unwrap_or_default();
    let body = args.get("body").and_then(Value::as_str).unwrap_or_default().to_string();

    let to_box: Mailbox = to.parse().map_err(|e| format!("invalid recipient: {e}"))?;
    let from_box: Mailbox = sender.parse().map_err(|e| format!("invalid sender: {e}"))?;

    MailMessage::builder()
        .from(from_box)
        .to(to_box)
        .subject(subject)
        .body(body)
        .map_err(|e| format!("message build failed: {e}"))
}

pub struct SendEmail {
    config: EmailConfig,
}

impl SendEmail {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SkillInvoker for SendEmail {
    fn name(&self) -> &str {
        "send_email"
    }
    fn description(&self) -> &str {
        "Send an email immediately via the configured SMTP account."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["to".to_string(), "subject".to_string(), "body".to_string()],
            parameters: json!({
                "to": {"type": "string"},
                "subject": {"type": "string"},
                "body": {"type": "string"},
                "sender_email": {"type": "string"},
            }),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let auth_code = match &self.config.smtp_auth_code {
            Some(code) if !code.is_empty() => code.clone(),
            _ => return SkillOutcome::Err { message: "auth_code_missing: SMTP auth code not configured".to_string() },
        };
        let message = match build_message(&self.config, &args) {
            Ok(m) => m,
            Err(e) => return SkillOutcome::Err { message: e },
        };
        let user = if self.config.smtp_user.is_empty() { self.config.default_sender.clone() } else { self.config.smtp_user.clone() };
        let creds = Credentials::new(user, auth_code);

        let transport = if self.config.smtp_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
        };
        let transport = match transport {
            Ok(t) => t.port(self.config.smtp_port).credentials(creds).build(),
            Err(e) => return SkillOutcome::Err { message: format!("send_failed: {e}") },
        };

        match transport.send(message).await {
            Ok(_) => SkillOutcome::Ok { message: "邮件发送成功".to_string(), data: json!({ "sent": true }) },
            Err(e) => SkillOutcome::Err { message: format!("send_failed: {e}") },
        }
    }
}

pub struct ScheduleEmail {
    sink: Arc<dyn EmailScheduleSink>,
}

impl ScheduleEmail {
    pub fn new(sink: Arc<dyn EmailScheduleSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl SkillInvoker for ScheduleEmail {
    fn name(&self) -> &str {
        "schedule_email"
    }
    fn description(&self) -> &str {
        "Schedule an email to be sent later, once or on a recurrence."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["to".to_string(), "subject".to_string(), "body".to_string()],
            parameters: json!({
                "to": {"type": "string"},
                "subject": {"type": "string"},
                "body": {"type": "string"},
                "scheduled_at": {"type": "string", "format": "date-time"},
                "recurrence": {"type": "object"},
            }),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let scheduled_at = args
            .get("scheduled_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let recurrence: Option<Recurrence> = args
            .get("recurrence")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());

        let task_id = self.sink.submit(recurrence, scheduled_at, args).await;
        SkillOutcome::Ok { message: "已创建定时发送任务".to_string(), data: json!({ "task_id": task_id }) }
    }
}
