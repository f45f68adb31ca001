use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only dialog record. Readers filter by wall-clock age; writers
/// append monotonically but readers tolerate clock regressions by sorting
/// (`spec.md` §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub dialog_id: Uuid,
    pub question: String,
    pub response: String,
    pub time: DateTime<Utc>,
}
