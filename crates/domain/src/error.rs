use serde::Serialize;

/// Error kinds from the core error-handling design: each variant is one row
/// of the recovery-policy table and carries enough context to render the
/// user-visible behavior for that row.
#[derive(thiserror::Error, Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("config: {0}")]
    Config(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("upstream: {0}")]
    Upstream(String),

    #[error("plan_parse: {0}")]
    PlanParse(String),

    #[error("missing_skill:{0}")]
    MissingSkill(String),

    #[error("skill_timeout")]
    SkillTimeout,

    #[error("skill_runtime: {0}")]
    SkillRuntime(String),

    #[error("review_exhausted")]
    ReviewExhausted,

    #[error("cancelled")]
    Cancelled,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Kind(#[from] ErrorKind),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
