//! Note skills — grounded on the note-adjacent helpers in
//! `ai_tools/ai_task_manager.py`, reduced to create/list over a JSON file
//! (the richer desktop notes UI/persistence is out of scope per `spec.md` §1).

use std::path::PathBuf;
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
struct Note {
    id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

pub struct CreateNote {
    store: Arc<JsonListStore<Note>>,
}

impl CreateNote {
    pub fn new(state_dir: &std::path::Path) -> Self {
        Self { store: Arc::new(JsonListStore::load(state_dir.join("notes.json"))) }
    }

    pub fn shared_store(&self) -> Arc<JsonListStore<Note>> {
        self.store.clone()
    }
}

#[async_trait]
impl SkillInvoker for CreateNote {
    fn name(&self) -> &str {
        "create_note"
    }
    fn description(&self) -> &str {
        "Save a short text note."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema { required: vec!["text".to_string()], parameters: json!({"text": {"type": "string"}}) }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let Some(text) = args.get("text").and_then(Value::as_str) else {
            return SkillOutcome::Err { message: "missing required argument: text".to_string() };
        };
        let note = Note { id: Uuid::new_v4(), text: text.to_string(), created_at: Utc::now() };
        let id = note.id;
        self.store.push(note);
        SkillOutcome::Ok { message: "note saved".to_string(), data: json!({ "id": id }) }
    }
}

pub struct ListNotes {
    store: Arc<JsonListStore<Note>>,
}

impl ListNotes {
    pub fn new(store: Arc<JsonListStore<Note>>) -> Self {
        Self { store }
    }

    pub fn standalone(path: PathBuf) -> Self {
        Self { store: Arc::new(JsonListStore::load(path)) }
    }
}

#[async_trait]
impl SkillInvoker for ListNotes {
    fn name(&self) -> &str {
        "list_notes"
    }
    fn description(&self) -> &str {
        "List previously saved notes."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema { required: vec![], parameters: json!({}) }
    }
    async fn call(&self, _args: Value) -> SkillOutcome {
        let notes = self.store.list();
        SkillOutcome::Ok { message: format!("{} note(s)", notes.len()), data: json!({ "notes": notes }) }
    }
}
