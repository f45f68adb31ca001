pub mod builtin;
pub mod invoker;
pub mod normalize;
pub mod registry;

pub use builtin::{register_builtin_skills, BuiltinContext};
pub use invoker::SkillInvoker;
pub use registry::SkillRegistry;
