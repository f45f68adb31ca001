use std::collections::HashMap;
use std::sync::Arc;

use lg_domain::error::{ErrorKind, Result};
use lg_domain::skill::{SkillBrief, SkillFull, SkillOutcome, SkillPermission};
use serde_json::Value;

use crate::invoker::SkillInvoker;

/// Name→callable map with schema, permission, and normalizer per entry.
/// Immutable after registration (`spec.md` §5: "Skill Registry is immutable
/// after boot").
pub struct SkillRegistry {
    entries: HashMap<String, Arc<dyn SkillInvoker>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn register(&mut self, invoker: Arc<dyn SkillInvoker>) {
        self.entries.insert(invoker.name().to_string(), invoker);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SkillInvoker>> {
        self.entries.get(name).cloned()
    }

    pub fn permission(&self, name: &str) -> Option<SkillPermission> {
        self.entries.get(name).map(|e| e.permission())
    }

    pub fn normalize(&self, name: &str, args: Value) -> Value {
        match self.entries.get(name) {
            Some(e) => e.normalize(args),
            None => args,
        }
    }

    /// The Planner's view: name + description only.
    pub fn list_brief(&self) -> Vec<SkillBrief> {
        let mut out: Vec<SkillBrief> = self
            .entries
            .values()
            .map(|e| SkillBrief { name: e.name().to_string(), description: e.description().to_string() })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// The Executor's view: full schema + permission, used when asking the
    /// LLM to bind missing arguments.
    pub fn list_full(&self) -> Vec<SkillFull> {
        let mut out: Vec<SkillFull> = self
            .entries
            .values()
            .map(|e| SkillFull {
                name: e.name().to_string(),
                description: e.description().to_string(),
                permission: e.permission(),
                schema: e.schema(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Normalize then invoke. `spec.md` §3 invariant: a name absent from the
    /// Registry fails the step with `missing_skill:<name>`, never a crash.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<SkillOutcome> {
        let invoker = self
            .get(name)
            .ok_or_else(|| ErrorKind::MissingSkill(name.to_string()))?;
        let normalized = invoker.normalize(args);
        Ok(invoker.call(normalized).await)
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lg_domain::skill::SkillSchema;
    use serde_json::json;

    struct Dummy(&'static str, SkillPermission);

    #[async_trait]
    impl SkillInvoker for Dummy {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "dummy"
        }
        fn permission(&self) -> SkillPermission {
            self.1
        }
        fn schema(&self) -> SkillSchema {
            SkillSchema { required: vec![], parameters: json!({}) }
        }
        async fn call(&self, _args: Value) -> SkillOutcome {
            SkillOutcome::Ok { message: "ok".into(), data: Value::Null }
        }
    }

    #[tokio::test]
    async fn missing_skill_errors_without_crashing() {
        let registry = SkillRegistry::new();
        let err = registry.invoke("frobnicate", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("frobnicate"));
    }

    #[tokio::test]
    async fn registered_skill_invokes_successfully() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(Dummy("read_file", SkillPermission::Read)));
        let outcome = registry.invoke("read_file", json!({})).await.unwrap();
        assert!(matches!(outcome, SkillOutcome::Ok { .. }));
    }

    #[test]
    fn permission_lookup_reflects_registration() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(Dummy("delete_paths", SkillPermission::Write)));
        assert_eq!(registry.permission("delete_paths"), Some(SkillPermission::Write));
        assert_eq!(registry.permission("missing"), None);
    }

    #[test]
    fn list_brief_is_sorted_and_hides_schema() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(Dummy("zeta", SkillPermission::Read)));
        registry.register(Arc::new(Dummy("alpha", SkillPermission::Read)));
        let brief = registry.list_brief();
        assert_eq!(brief[0].name, "alpha");
        assert_eq!(brief[1].name, "zeta");
    }
}
