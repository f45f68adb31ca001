//! Task skills — grounded on `ai_tools/ai_task_manager.py`: create, list,
//! and mark tasks complete over a JSON file.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::builtin::store::JsonListStore;
use crate::invoker::SkillInvoker;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Task {
    id: Uuid,
    title: String,
    done: bool,
    created_at: DateTime<Utc>,
    due_at: Option<DateTime<Utc>>,
}

pub struct CreateTask {
    store: Arc<JsonListStore<Task>>,
}

impl CreateTask {
    pub fn new(state_dir: &std::path::Path) -> Self {
        Self { store: Arc::new(JsonListStore::load(state_dir.join("tasks.json"))) }
    }

    pub fn shared_store(&self) -> Arc<JsonListStore<Task>> {
        self.store.clone()
    }
}

#[async_trait]
impl SkillInvoker for CreateTask {
    fn name(&self) -> &str {
        "create_task"
    }
    fn description(&self) -> &str {
        "Create a task, optionally with a due date."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["title".to_string()],
            parameters: json!({"title": {"type": "string"}, "due_at": {"type": "string", "format": "date-time"}}),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let Some(title) = args.get("title").and_then(Value::as_str) else {
            return SkillOutcome::Err { message: "missing required argument: title".to_string() };
        };
        let due_at = args
            .get("due_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let task = Task { id: Uuid::new_v4(), title: title.to_string(), done: false, created_at: Utc::now(), due_at };
        let id = task.id;
        self.store.push(task);
        SkillOutcome::Ok { message: "task created".to_string(), data: json!({ "id": id }) }
    }
}

pub struct ListTasks {
    store: Arc<JsonListStore<Task>>,
}

impl ListTasks {
    pub fn new(store: Arc<JsonListStore<Task>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SkillInvoker for ListTasks {
    fn name(&self) -> &str {
        "list_tasks"
    }
    fn description(&self) -> &str {
        "List tasks, including whether each is done."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema { required: vec![], parameters: json!({}) }
    }
    async fn call(&self, _args: Value) -> SkillOutcome {
        let tasks = self.store.list();
        SkillOutcome::Ok { message: format!("{} task(s)", tasks.len()), data: json!({ "tasks": tasks }) }
    }
}

pub struct CompleteTask {
    store: Arc<JsonListStore<Task>>,
}

impl CompleteTask {
    pub fn new(store: Arc<JsonListStore<Task>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SkillInvoker for CompleteTask {
    fn name(&self) -> &str {
        "complete_task"
    }
    fn description(&self) -> &str {
        "Mark a task as done by id."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema { required: vec!["id".to_string()], parameters: json!({"id": {"type": "string"}}) }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let Some(id_str) = args.get("id").and_then(Value::as_str) else {
            return SkillOutcome::Err { message: "missing required argument: id".to_string() };
        };
        let Ok(id) = Uuid::parse_str(id_str) else {
            return SkillOutcome::Err { message: "invalid id: not a uuid".to_string() };
        };
        let found = self.store.update(
            |t: &Task| t.id == id,
            |t: &mut Task| {
                if t.done {
                    false
                } else {
                    t.done = true;
                    true
                }
            },
        );
        if found {
            SkillOutcome::Ok { message: "task completed".to_string(), data: json!({ "id": id }) }
        } else {
            SkillOutcome::Err { message: "task_not_found".to_string() }
        }
    }
}
