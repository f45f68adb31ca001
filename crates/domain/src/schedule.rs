use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTaskKind {
    Scheduled,
    Realtime,
}

/// `created → scheduled → firing → (sent | failed) → (terminal | scheduled)`
/// — the last transition depends on whether the task recurs. `Skipped` is a
/// separate terminal reached only by the startup replay pass, for a
/// non-recurring task that was already overdue when the process restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTaskStatus {
    Created,
    Scheduled,
    Firing,
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    /// 0 = Sunday .. 6 = Saturday; only meaningful for `Weekly`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<u8>,
}

/// A durable scheduled (or realtime daily-first-start) email task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEmailTask {
    pub task_id: Uuid,
    #[serde(rename = "type")]
    pub kind: EmailTaskKind,
    pub status: EmailTaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_date: Option<chrono::NaiveDate>,
}

/// Narrow interface the `schedule_email` skill submits new tasks through,
/// implemented by the gateway's schedule store. Kept in `lg-domain` so
/// `lg-skills` can depend on the abstraction without depending on the
/// gateway binary crate.
#[async_trait::async_trait]
pub trait EmailScheduleSink: Send + Sync {
    async fn submit(
        &self,
        recurrence: Option<Recurrence>,
        scheduled_at: Option<DateTime<Utc>>,
        args: Value,
    ) -> Uuid;
}
