//! Knowledge-query skills — grounded on `ai_konwledge/soft_konwledge/ai_soft_check.py`
//! and `ai_konwledge/web_konwledge/ai_web_check.py`: both read a JSON history file of
//! previously observed usage records and filter by keyword/date. The passive
//! monitors that populate that history (`soft_monitor_sys.py`/`web_monitor_sys.py`)
//! are out of scope (`spec.md` §1, "no ambient OS/browser monitoring") — these
//! skills only query whatever history file is present.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::invoker::SkillInvoker;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UsageRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    duration: f64,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

fn load_history(path: &std::path::Path) -> Vec<UsageRecord> {
    std::fs::read_to_string(path).ok().and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

fn matches_keyword(record: &UsageRecord, keyword: &str, extra_keys: &[&str]) -> bool {
    if keyword.is_empty() {
        return true;
    }
    let keyword = keyword.to_lowercase();
    if record.title.to_lowercase().contains(&keyword) {
        return true;
    }
    extra_keys.iter().any(|k| {
        record
            .extra
            .get(*k)
            .and_then(Value::as_str)
            .map(|v| v.to_lowercase().contains(&keyword))
            .unwrap_or(false)
    })
}

fn matches_date(record: &UsageRecord, date: &str) -> bool {
    if date.is_empty() {
        return true;
    }
    record.start_time.starts_with(date)
}

fn query(path: &std::path::Path, keyword: &str, date: &str, extra_keys: &[&str], limit: usize) -> Value {
    let mut matched: Vec<&UsageRecord> = vec![];
    let history = load_history(path);
    for record in &history {
        if matches_keyword(record, keyword, extra_keys) && matches_date(record, date) {
            matched.push(record);
        }
    }
    matched.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    let limited: Vec<&&UsageRecord> = if limit > 0 { matched.iter().take(limit).collect() } else { matched.iter().collect() };
    json!({ "items": limited, "total": matched.len() })
}

fn parse_args<'a>(args: &'a Value) -> (String, String, usize) {
    let keyword = args.get("keyword").and_then(Value::as_str).unwrap_or_default().to_string();
    let date = args.get("date").and_then(Value::as_str).unwrap_or_default().to_string();
    if !date.is_empty() && NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
        return (keyword, String::new(), 0);
    }
    let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(0) as usize;
    (keyword, date, limit)
}

pub struct CheckSoftware {
    history_path: PathBuf,
}

impl CheckSoftware {
    pub fn new(state_dir: &std::path::Path) -> Self {
        Self { history_path: state_dir.join("soft_knowledge.json") }
    }
}

#[async_trait]
impl SkillInvoker for CheckSoftware {
    fn name(&self) -> &str {
        "check_software"
    }
    fn description(&self) -> &str {
        "Search recorded application-usage history by keyword and/or date."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec![],
            parameters: json!({
                "keyword": {"type": "string"},
                "date": {"type": "string", "format": "date"},
                "limit": {"type": "integer"},
            }),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let (keyword, date, limit) = parse_args(&args);
        let data = query(&self.history_path, &keyword, &date, &["app_name", "process_name", "exe_path"], limit);
        let total = data.get("total").and_then(Value::as_u64).unwrap_or(0);
        SkillOutcome::Ok { message: format!("{total} matching record(s)"), data }
    }
}

pub struct CheckWebsite {
    history_path: PathBuf,
}

impl CheckWebsite {
    pub fn new(state_dir: &std::path::Path) -> Self {
        Self { history_path: state_dir.join("web_knowledge.json") }
    }
}

#[async_trait]
impl SkillInvoker for CheckWebsite {
    fn name(&self) -> &str {
        "check_website"
    }
    fn description(&self) -> &str {
        "Search recorded browsing history by keyword and/or date."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec![],
            parameters: json!({
                "keyword": {"type": "string"},
                "date": {"type": "string", "format": "date"},
                "limit": {"type": "integer"},
            }),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let (keyword, date, limit) = parse_args(&args);
        let data = query(&self.history_path, &keyword, &date, &["url", "browser_type"], limit);
        let total = data.get("total").and_then(Value::as_u64).unwrap_or(0);
        SkillOutcome::Ok { message: format!("{total} matching record(s)"), data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_history(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn check_software_filters_by_keyword() {
        let dir = tempfile::tempdir().unwrap();
        write_history(
            &dir,
            "soft_knowledge.json",
            r#"[{"title":"Visual Studio Code","app_name":"Code.exe","start_time":"2026-01-01T10:00:00"},
               {"title":"Notepad","app_name":"notepad.exe","start_time":"2026-01-02T10:00:00"}]"#,
        );
        let skill = CheckSoftware { history_path: dir.path().join("soft_knowledge.json") };
        let outcome = skill.call(json!({"keyword": "code"})).await;
        match outcome {
            SkillOutcome::Ok { data, .. } => assert_eq!(data["total"], 1),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_website_rejects_malformed_date_silently() {
        let dir = tempfile::tempdir().unwrap();
        write_history(&dir, "web_knowledge.json", "[]");
        let skill = CheckWebsite { history_path: dir.path().join("web_knowledge.json") };
        let outcome = skill.call(json!({"date": "not-a-date"})).await;
        match outcome {
            SkillOutcome::Ok { data, .. } => assert_eq!(data["total"], 0),
            other => panic!("expected Ok, got {other:?}"),
        }
    }
}
