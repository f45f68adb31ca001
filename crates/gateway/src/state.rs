use std::sync::Arc;

use lg_domain::config::Config;
use lg_memory::{DialogMemory, TokenLedger};
use lg_providers::LlmProvider;
use lg_skills::SkillRegistry;

use crate::runtime::schedules::ScheduleStore;
use crate::runtime::{CancelMap, SessionLockMap, Transport};

/// Shared application state passed to every API handler. Deliberately much
/// narrower than a general-purpose agent gateway's: no sessions/identity/
/// lifecycle/transcripts/workspace/bootstrap/MCP/node-registry/processes —
/// this system's only persistent actors are the ones named in `spec.md`
/// §2/§6 (Memory, Ledger, Skill Registry, Schedule Store) plus the runtime
/// machinery that drives a turn.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<dyn LlmProvider>,
    pub skills: Arc<SkillRegistry>,
    pub memory: Arc<DialogMemory>,
    pub ledger: Arc<TokenLedger>,
    pub schedules: Arc<ScheduleStore>,
    pub transport: Arc<Transport>,
    pub cancel_map: Arc<CancelMap>,
    pub session_locks: Arc<SessionLockMap>,
}
