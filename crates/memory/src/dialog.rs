//! Dialog Memory — grounded in persistence shape on the skills crate's
//! `JsonListStore` pattern (write-then-rename, single writer), holding the
//! append-only `{dialog_id, question, response, time}` log named in
//! `spec.md` §3/§4.4.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use lg_domain::memory::MemoryRecord;
use parking_lot::Mutex;
use uuid::Uuid;

/// Strips the Turn Driver's control-token framing (`[[PROGRESS_*]]`,
/// `[[FINAL_*]]`) from a response before it's persisted, so a later
/// `recent()` replay never re-injects stray control tokens into the
/// enriched prompt (`spec.md` §4.4/§4.8).
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' && chars.peek() == Some(&'[') {
            let mut lookahead = String::new();
            let mut rest_chars = chars.clone();
            rest_chars.next(); // consume the second '['
            let mut closed = false;
            for lc in rest_chars.by_ref() {
                lookahead.push(lc);
                if lookahead.ends_with("]]") {
                    closed = true;
                    break;
                }
                if lookahead.len() > 64 {
                    break;
                }
            }
            if closed && (lookahead.starts_with("PROGRESS_") || lookahead.starts_with("FINAL_")) {
                chars = rest_chars;
                continue;
            }
        }
        out.push(c);
    }
    out
}

pub struct DialogMemory {
    path: PathBuf,
    records: Mutex<Vec<MemoryRecord>>,
    max_records: Option<usize>,
}

impl DialogMemory {
    pub fn load(path: PathBuf, max_records: Option<usize>) -> Self {
        let records = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self { path, records: Mutex::new(records), max_records }
    }

    /// §4.4: returns every record with `time >= now - window`, oldest first.
    pub fn recent(&self, window: Duration) -> Vec<MemoryRecord> {
        let cutoff = Utc::now() - window;
        let mut records = self.records.lock();
        records.sort_by_key(|r| r.time);
        records.iter().filter(|r| r.time >= cutoff).cloned().collect()
    }

    pub fn append(&self, question: impl Into<String>, response: &str) {
        let record = MemoryRecord {
            dialog_id: Uuid::new_v4(),
            question: question.into(),
            response: sanitize(response),
            time: Utc::now(),
        };
        let mut records = self.records.lock();
        records.push(record);
        if let Some(max) = self.max_records {
            let len = records.len();
            if len > max {
                records.drain(0..len - max);
            }
        }
        if let Err(e) = self.flush(&records) {
            tracing::warn!(error = %e, "dialog memory flush failed; keeping in-memory state");
        }
    }

    pub fn clear(&self) {
        let mut records = self.records.lock();
        records.clear();
        let _ = self.flush(&records);
    }

    fn flush(&self, records: &[MemoryRecord]) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(records).unwrap_or_default();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }
}

pub fn state_path(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join("dialog_memory.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_progress_and_final_tokens() {
        let out = sanitize("[[PROGRESS_STEP]]thinking...[[FINAL_ANSWER]]done");
        assert_eq!(out, "thinking...done");
    }

    #[test]
    fn sanitize_leaves_ordinary_brackets_alone() {
        let out = sanitize("see [[not_a_control_token]] here");
        assert_eq!(out, "see [[not_a_control_token]] here");
    }

    #[test]
    fn recent_filters_by_window() {
        let dir = tempfile::tempdir().unwrap();
        let memory = DialogMemory::load(dir.path().join("d.json"), None);
        memory.append("q1", "r1");
        let recent = memory.recent(Duration::hours(1));
        assert_eq!(recent.len(), 1);
        let none = memory.recent(Duration::seconds(-1));
        assert_eq!(none.len(), 0);
    }

    #[test]
    fn max_records_caps_retained_history() {
        let dir = tempfile::tempdir().unwrap();
        let memory = DialogMemory::load(dir.path().join("d.json"), Some(2));
        memory.append("q1", "r1");
        memory.append("q2", "r2");
        memory.append("q3", "r3");
        let recent = memory.recent(Duration::hours(1));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].question, "q2");
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.json");
        {
            let memory = DialogMemory::load(path.clone(), None);
            memory.append("q1", "r1");
        }
        let reloaded = DialogMemory::load(path, None);
        assert_eq!(reloaded.recent(Duration::hours(1)).len(), 1);
    }
}
