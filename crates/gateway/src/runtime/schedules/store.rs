//! Durable store for [`ScheduledEmailTask`]s.
//!
//! Same single-writer, atomic write-then-rename persistence pattern as
//! `lg-memory`'s `TokenLedger`/`DialogMemory`: an in-memory map guarded by a
//! `parking_lot::RwLock`, flushed to `email_tasks.json` on every mutation.
//! Unlike the ancestor gateway's `schedules/store.rs` this carries no
//! cooldown/backoff/source-state machinery — there is exactly one source
//! (this process) and one sink (SMTP), so a task is either due or it isn't.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lg_domain::error::{Error, ErrorKind};
use lg_domain::schedule::{EmailScheduleSink, EmailTaskKind, EmailTaskStatus, Recurrence, ScheduledEmailTask};
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

pub struct ScheduleStore {
    path: PathBuf,
    tasks: RwLock<Vec<ScheduledEmailTask>>,
}

impl ScheduleStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let tasks = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            Vec::new()
        };
        Ok(Self { path, tasks: RwLock::new(tasks) })
    }

    fn flush(&self) -> Result<(), Error> {
        let tasks = self.tasks.read();
        let serialized = serde_json::to_string_pretty(&*tasks)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn insert(&self, task: ScheduledEmailTask) -> Result<(), Error> {
        self.tasks.write().push(task);
        self.flush()
    }

    pub fn all(&self) -> Vec<ScheduledEmailTask> {
        self.tasks.read().clone()
    }

    pub fn due(&self, now: DateTime<Utc>) -> Vec<ScheduledEmailTask> {
        self.tasks
            .read()
            .iter()
            .filter(|t| {
                matches!(t.status, EmailTaskStatus::Scheduled | EmailTaskStatus::Created)
                    && t.scheduled_at.map(|at| at <= now).unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    pub fn update<F>(&self, task_id: Uuid, mutate: F) -> Result<(), Error>
    where
        F: FnOnce(&mut ScheduledEmailTask),
    {
        {
            let mut tasks = self.tasks.write();
            match tasks.iter_mut().find(|t| t.task_id == task_id) {
                Some(task) => mutate(task),
                None => return Err(Error::Kind(ErrorKind::MissingSkill(task_id.to_string()))),
            }
        }
        self.flush()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Implements the `schedule_email` skill's submission interface over this
/// store so `lg-skills` never depends on `lg-gateway` directly.
pub struct StoreScheduleSink {
    store: Arc<ScheduleStore>,
}

impl StoreScheduleSink {
    pub fn new(store: Arc<ScheduleStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl EmailScheduleSink for StoreScheduleSink {
    async fn submit(&self, recurrence: Option<Recurrence>, scheduled_at: Option<DateTime<Utc>>, args: Value) -> Uuid {
        let task_id = Uuid::new_v4();
        let status = if scheduled_at.is_some() || recurrence.is_some() { EmailTaskStatus::Scheduled } else { EmailTaskStatus::Created };
        let task = ScheduledEmailTask {
            task_id,
            kind: EmailTaskKind::Scheduled,
            status,
            created_at: Utc::now(),
            scheduled_at,
            recurrence,
            args,
            last_run_date: None,
        };
        // A store write failure here is surfaced to the caller only as a
        // missing task on the next `due()` poll; the skill's contract is
        // "returns a task id", not "guarantees persistence succeeded".
        let _ = self.store.insert(task);
        task_id
    }
}
