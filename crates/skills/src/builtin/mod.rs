pub mod email;
pub mod file;
pub mod knowledge;
pub mod note;
pub mod screen;
pub mod store;
pub mod task;
pub mod vcs;
pub mod web;

use std::path::PathBuf;
use std::sync::Arc;

use lg_domain::config::EmailConfig;
use lg_domain::schedule::EmailScheduleSink;

use crate::registry::SkillRegistry;

/// Everything the built-in catalog needs beyond the registry itself. `state_dir`
/// is the root both file skills are sandboxed to and note/task/knowledge data
/// is written under (`spec.md` §6's `state_dir`); `github_token` is optional
/// (anonymous GitHub API access still works, rate-limited).
pub struct BuiltinContext {
    pub state_dir: PathBuf,
    pub email: EmailConfig,
    pub email_sink: Arc<dyn EmailScheduleSink>,
    pub github_token: Option<String>,
}

/// Registers the full skill catalog named in `spec.md` §4.3. Order doesn't
/// matter — `SkillRegistry` keys by name — but note/task share a store so
/// `CreateNote`/`CreateTask` are constructed first and their stores handed to
/// the paired list skills.
pub fn register_builtin_skills(registry: &mut SkillRegistry, ctx: &BuiltinContext) {
    let workspace_root = Arc::new(ctx.state_dir.join("workspace"));
    std::fs::create_dir_all(workspace_root.as_path()).ok();

    registry.register(Arc::new(file::ReadFile::new(workspace_root.clone())));
    registry.register(Arc::new(file::ListFiles::new(workspace_root.clone())));
    registry.register(Arc::new(file::CreateFolder::new(workspace_root.clone())));
    registry.register(Arc::new(file::DeletePaths::new(workspace_root.clone())));
    registry.register(Arc::new(file::MovePaths::new(workspace_root.clone())));

    registry.register(Arc::new(web::ReadUrl::new()));

    registry.register(Arc::new(email::SendEmail::new(ctx.email.clone())));
    registry.register(Arc::new(email::ScheduleEmail::new(ctx.email_sink.clone())));

    registry.register(Arc::new(screen::DescribeScreen));

    let create_note = note::CreateNote::new(&ctx.state_dir);
    let notes_store = create_note.shared_store();
    registry.register(Arc::new(create_note));
    registry.register(Arc::new(note::ListNotes::new(notes_store)));

    let create_task = task::CreateTask::new(&ctx.state_dir);
    let tasks_store = create_task.shared_store();
    registry.register(Arc::new(create_task));
    registry.register(Arc::new(task::ListTasks::new(tasks_store.clone())));
    registry.register(Arc::new(task::CompleteTask::new(tasks_store)));

    registry.register(Arc::new(knowledge::CheckSoftware::new(&ctx.state_dir)));
    registry.register(Arc::new(knowledge::CheckWebsite::new(&ctx.state_dir)));

    registry.register(Arc::new(vcs::GithubReadFile::new(ctx.github_token.clone())));
    registry.register(Arc::new(vcs::GithubListBranches::new(ctx.github_token.clone())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use uuid::Uuid;

    struct NullSink;

    #[async_trait]
    impl EmailScheduleSink for NullSink {
        async fn submit(
            &self,
            _recurrence: Option<lg_domain::schedule::Recurrence>,
            _scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
            _args: Value,
        ) -> Uuid {
            Uuid::nil()
        }
    }

    #[test]
    fn catalog_registers_every_named_skill() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SkillRegistry::new();
        let ctx = BuiltinContext {
            state_dir: dir.path().to_path_buf(),
            email: EmailConfig::default(),
            email_sink: Arc::new(NullSink),
            github_token: None,
        };
        register_builtin_skills(&mut registry, &ctx);
        let names: Vec<String> = registry.list_brief().into_iter().map(|b| b.name).collect();
        for expected in [
            "read_file",
            "list_files",
            "create_folder",
            "delete_paths",
            "move_paths",
            "read_url",
            "send_email",
            "schedule_email",
            "describe_screen",
            "create_note",
            "list_notes",
            "create_task",
            "list_tasks",
            "complete_task",
            "check_software",
            "check_website",
            "github_read_file",
            "github_list_branches",
        ] {
            assert!(names.contains(&expected.to_string()), "missing skill: {expected}");
        }
    }
}
