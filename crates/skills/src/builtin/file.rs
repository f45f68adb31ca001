//! File skills — grounded on `ai_files_tools/*.py` (create/delete/move/list/
//! read under a workspace root). All paths are resolved relative to a
//! configured workspace root to keep the catalog's side effects contained.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde_json::{json, Value};

use crate::invoker::SkillInvoker;
use crate::normalize::coerce_paths_list;

fn resolve(root: &Path, rel: &str) -> Option<PathBuf> {
    let joined = root.join(rel.trim_start_matches('/'));
    let canon_root = root.canonicalize().ok()?;
    // Allow non-existent target paths (create_folder) by checking the
    // resolved *parent* stays under the root.
    let check = if joined.exists() { joined.clone() } else { joined.parent()?.to_path_buf() };
    let canon_check = check.canonicalize().ok().unwrap_or(check);
    if canon_check.starts_with(&canon_root) || joined.starts_with(&canon_root) {
        Some(joined)
    } else {
        None
    }
}

pub struct ReadFile {
    root: Arc<PathBuf>,
}

impl ReadFile {
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl SkillInvoker for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read the text contents of a file under the workspace."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["path".to_string()],
            parameters: json!({"path": {"type": "string"}}),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let Some(path) = args.get("path").and_then(Value::as_str) else {
            return SkillOutcome::Err { message: "missing required argument: path".to_string() };
        };
        let Some(resolved) = resolve(&self.root, path) else {
            return SkillOutcome::Err { message: format!("path escapes workspace: {path}") };
        };
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => SkillOutcome::Ok { message: "read complete".to_string(), data: json!({ "path": path, "content": content }) },
            Err(e) => SkillOutcome::Err { message: format!("read failed: {e}") },
        }
    }
}

pub struct ListFiles {
    root: Arc<PathBuf>,
}

impl ListFiles {
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl SkillInvoker for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }
    fn description(&self) -> &str {
        "List entries in a directory under the workspace."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Read
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["path".to_string()],
            parameters: json!({"path": {"type": "string"}}),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let path = args.get("path").and_then(Value::as_str).unwrap_or(".");
        let Some(resolved) = resolve(&self.root, path) else {
            return SkillOutcome::Err { message: format!("path escapes workspace: {path}") };
        };
        let mut entries = Vec::new();
        let mut rd = match tokio::fs::read_dir(&resolved).await {
            Ok(rd) => rd,
            Err(e) => return SkillOutcome::Err { message: format!("list failed: {e}") },
        };
        loop {
            match rd.next_entry().await {
                Ok(Some(entry)) => entries.push(entry.file_name().to_string_lossy().to_string()),
                Ok(None) => break,
                Err(e) => return SkillOutcome::Err { message: format!("list failed: {e}") },
            }
        }
        SkillOutcome::Ok { message: format!("{} entries", entries.len()), data: json!({ "entries": entries }) }
    }
}

pub struct CreateFolder {
    root: Arc<PathBuf>,
}

impl CreateFolder {
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl SkillInvoker for CreateFolder {
    fn name(&self) -> &str {
        "create_folder"
    }
    fn description(&self) -> &str {
        "Create a folder (and parents) under the workspace."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["path".to_string()],
            parameters: json!({"path": {"type": "string"}}),
        }
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let Some(path) = args.get("path").and_then(Value::as_str) else {
            return SkillOutcome::Err { message: "missing required argument: path".to_string() };
        };
        let Some(resolved) = resolve(&self.root, path) else {
            return SkillOutcome::Err { message: format!("path escapes workspace: {path}") };
        };
        match tokio::fs::create_dir_all(&resolved).await {
            Ok(()) => SkillOutcome::Ok { message: format!("created {path}"), data: json!({ "path": path }) },
            Err(e) => SkillOutcome::Err { message: format!("create failed: {e}") },
        }
    }
}

pub struct DeletePaths {
    root: Arc<PathBuf>,
}

impl DeletePaths {
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl SkillInvoker for DeletePaths {
    fn name(&self) -> &str {
        "delete_paths"
    }
    fn description(&self) -> &str {
        "Delete one or more files/folders under the workspace."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["paths_list".to_string()],
            parameters: json!({"paths_list": {"type": "array", "items": {"type": "string"}}}),
        }
    }
    fn normalize(&self, args: Value) -> Value {
        coerce_paths_list(args)
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let Some(paths) = args.get("paths_list").and_then(Value::as_array) else {
            return SkillOutcome::Err { message: "missing required argument: paths_list".to_string() };
        };
        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for p in paths {
            let Some(p) = p.as_str() else { continue };
            let Some(resolved) = resolve(&self.root, p) else {
                failures.push(format!("{p}: escapes workspace"));
                continue;
            };
            let result = if resolved.is_dir() {
                tokio::fs::remove_dir_all(&resolved).await
            } else {
                tokio::fs::remove_file(&resolved).await
            };
            match result {
                Ok(()) => deleted.push(p.to_string()),
                Err(e) => failures.push(format!("{p}: {e}")),
            }
        }
        if failures.is_empty() {
            SkillOutcome::Ok { message: format!("deleted {} item(s)", deleted.len()), data: json!({ "deleted": deleted }) }
        } else {
            SkillOutcome::Err { message: format!("{} failure(s): {}", failures.len(), failures.join("; ")) }
        }
    }
}

pub struct MovePaths {
    root: Arc<PathBuf>,
}

impl MovePaths {
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl SkillInvoker for MovePaths {
    fn name(&self) -> &str {
        "move_paths"
    }
    fn description(&self) -> &str {
        "Move one or more files/folders to a destination directory under the workspace."
    }
    fn permission(&self) -> SkillPermission {
        SkillPermission::Write
    }
    fn schema(&self) -> SkillSchema {
        SkillSchema {
            required: vec!["paths_list".to_string(), "destination".to_string()],
            parameters: json!({
                "paths_list": {"type": "array", "items": {"type": "string"}},
                "destination": {"type": "string"},
            }),
        }
    }
    fn normalize(&self, args: Value) -> Value {
        coerce_paths_list(args)
    }
    async fn call(&self, args: Value) -> SkillOutcome {
        let (Some(paths), Some(dest)) = (
            args.get("paths_list").and_then(Value::as_array),
            args.get("destination").and_then(Value::as_str),
        ) else {
            return SkillOutcome::Err { message: "missing required argument: paths_list/destination".to_string() };
        };
        let Some(dest_resolved) = resolve(&self.root, dest) else {
            return SkillOutcome::Err { message: format!("destination escapes workspace: {dest}") };
        };
        let mut moved = Vec::new();
        let mut failures = Vec::new();
        for p in paths {
            let Some(p) = p.as_str() else { continue };
            let Some(src) = resolve(&self.root, p) else {
                failures.push(format!("{p}: escapes workspace"));
                continue;
            };
            let Some(name) = src.file_name() else {
                failures.push(format!("{p}: no file name"));
                continue;
            };
            let target = dest_resolved.join(name);
            match tokio::fs::rename(&src, &target).await {
                Ok(()) => moved.push(p.to_string()),
                Err(e) => failures.push(format!("{p}: {e}")),
            }
        }
        if failures.is_empty() {
            SkillOutcome::Ok { message: format!("moved {} item(s) to {dest}", moved.len()), data: json!({ "moved": moved }) }
        } else {
            SkillOutcome::Err { message: format!("{} failure(s): {}", failures.len(), failures.join("; ")) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_read_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let root = Arc::new(dir.path().to_path_buf());
        let create = CreateFolder::new(root.clone());
        let outcome = create.call(json!({"path": "sub"})).await;
        assert!(matches!(outcome, SkillOutcome::Ok { .. }));

        tokio::fs::write(dir.path().join("sub/a.txt"), "hello").await.unwrap();
        let read = ReadFile::new(root.clone());
        let outcome = read.call(json!({"path": "sub/a.txt"})).await;
        let SkillOutcome::Ok { data, .. } = outcome else { panic!("expected Ok") };
        assert_eq!(data["content"], "hello");

        let delete = DeletePaths::new(root.clone());
        let outcome = delete.call(json!({"files": ["sub/a.txt"]})).await;
        assert!(matches!(outcome, SkillOutcome::Ok { .. }));
    }

    #[tokio::test]
    async fn rejects_path_escaping_workspace() {
        let dir = tempdir().unwrap();
        let root = Arc::new(dir.path().to_path_buf());
        let read = ReadFile::new(root);
        let outcome = read.call(json!({"path": "../../../etc/passwd"})).await;
        assert!(matches!(outcome, SkillOutcome::Err { .. }));
    }

    #[tokio::test]
    async fn missing_skill_name_fails_step_not_crash() {
        let registry = crate::registry::SkillRegistry::new();
        let outcome = registry.invoke("frobnicate", json!({})).await;
        assert!(outcome.is_err());
    }
}
