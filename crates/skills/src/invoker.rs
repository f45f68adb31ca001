use lg_domain::skill::{SkillOutcome, SkillPermission, SkillSchema};
use serde_json::Value;

/// `spec.md` §9's redesign of "dynamic tool dispatch by name": an interface
/// abstraction in place of a string→function lookup. The Registry owns a
/// map from name to `Arc<dyn SkillInvoker>`.
///
/// Implementations must not panic/throw on bad input — invalid or
/// unresolvable arguments are reported as `SkillOutcome::Err`, matching the
/// skill contract in `spec.md` §6 ("skills must not throw").
#[async_trait::async_trait]
pub trait SkillInvoker: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn permission(&self) -> SkillPermission;
    fn schema(&self) -> SkillSchema;

    /// Rewrite an arbitrary-keyed argument object into one keyed by the
    /// declared parameter names (`spec.md` §4.3). The default impl is the
    /// identity — most skills don't need aliasing.
    fn normalize(&self, args: Value) -> Value {
        args
    }

    async fn call(&self, args: Value) -> SkillOutcome;
}
