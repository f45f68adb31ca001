//! Token Ledger — grounded on the ancestor gateway's `QuotaTracker` flush
//! pattern (`runtime/quota.rs`): a `parking_lot`-guarded in-memory map with
//! atomic write-then-rename persistence, generalized from a single daily
//! bucket to the total/year/month/day calendar hierarchy plus a transient
//! per-session bucket named in `spec.md` §4.2.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Utc};
use lg_domain::config::TokenRatesConfig;
use lg_domain::ledger::LedgerBucket;
use lg_domain::stream::Usage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedBuckets {
    total: LedgerBucket,
    #[serde(default)]
    years: HashMap<String, LedgerBucket>,
    #[serde(default)]
    months: HashMap<String, LedgerBucket>,
    #[serde(default)]
    days: HashMap<String, LedgerBucket>,
}

/// Read-only summary for `GET /v1/stats` (`spec.md` §4.8).
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub total: LedgerBucket,
    pub today: LedgerBucket,
    pub session: Option<LedgerBucket>,
}

pub struct TokenLedger {
    path: PathBuf,
    rates: TokenRatesConfig,
    buckets: RwLock<PersistedBuckets>,
    session: RwLock<HashMap<String, LedgerBucket>>,
    active_session: RwLock<Option<String>>,
}

impl TokenLedger {
    pub fn load(path: PathBuf, rates: TokenRatesConfig) -> Self {
        let buckets = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self {
            path,
            rates,
            buckets: RwLock::new(buckets),
            session: RwLock::new(HashMap::new()),
            active_session: RwLock::new(None),
        }
    }

    /// Marks `session_id` as the ledger's active session — the bucket that
    /// subsequent `record` calls also fold into, until the next
    /// `start_session`/`set_active(None)`.
    pub fn start_session(&self, session_id: &str) {
        self.session.write().entry(session_id.to_string()).or_default();
        *self.active_session.write() = Some(session_id.to_string());
    }

    pub fn set_active(&self, session_id: Option<&str>) {
        *self.active_session.write() = session_id.map(str::to_string);
    }

    /// §4.2 steps 1-3: derive cached/uncached/out from raw `usage`, compute
    /// cost, and fold atomically into every live bucket (total, current
    /// day/month/year, and the active session if any).
    pub fn record(&self, usage: Usage) {
        let prompt = usage.prompt_tokens;
        let cached = usage.cached_tokens.min(prompt);
        let uncached = prompt.saturating_sub(cached);
        let output = usage.completion_tokens;

        let cost = (cached as f64 * self.rates.input_cached_per_million
            + uncached as f64 * self.rates.input_uncached_per_million
            + output as f64 * self.rates.output_per_million)
            / 1_000_000.0;
        let cost = round8(cost);

        let today = Utc::now().date_naive();
        {
            let mut buckets = self.buckets.write();
            buckets.total.add(cached, uncached, output, cost);
            buckets.years.entry(year_key(today)).or_default().add(cached, uncached, output, cost);
            buckets.months.entry(month_key(today)).or_default().add(cached, uncached, output, cost);
            buckets.days.entry(day_key(today)).or_default().add(cached, uncached, output, cost);
        }
        if let Some(session_id) = self.active_session.read().clone() {
            self.session.write().entry(session_id).or_default().add(cached, uncached, output, cost);
        }

        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "token ledger flush failed; keeping in-memory state");
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        let today = Utc::now().date_naive();
        let buckets = self.buckets.read();
        let total = buckets.total;
        let day_bucket = buckets.days.get(&day_key(today)).copied().unwrap_or_default();
        let session = self
            .active_session
            .read()
            .clone()
            .and_then(|id| self.session.read().get(&id).copied());
        LedgerSummary { total, today: day_bucket, session }
    }

    pub fn session_bucket(&self, session_id: &str) -> Option<LedgerBucket> {
        self.session.read().get(session_id).copied()
    }

    fn flush(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&*self.buckets.read()).unwrap_or_default();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }
}

fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}

fn year_key(d: NaiveDate) -> String {
    format!("{:04}", d.year())
}
fn month_key(d: NaiveDate) -> String {
    format!("{:04}-{:02}", d.year(), d.month())
}
fn day_key(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn state_path(state_dir: &Path) -> PathBuf {
    state_dir.join("token_usage.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> TokenRatesConfig {
        TokenRatesConfig { input_cached_per_million: 1.0, input_uncached_per_million: 2.0, output_per_million: 4.0 }
    }

    #[test]
    fn missing_cached_tokens_treated_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::load(dir.path().join("l.json"), rates());
        ledger.record(Usage { prompt_tokens: 100, completion_tokens: 10, cached_tokens: 0 });
        let summary = ledger.summary();
        assert_eq!(summary.total.input_cached, 0);
        assert_eq!(summary.total.input_uncached, 100);
    }

    #[test]
    fn cached_greater_than_prompt_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::load(dir.path().join("l.json"), rates());
        ledger.record(Usage { prompt_tokens: 50, completion_tokens: 0, cached_tokens: 999 });
        let summary = ledger.summary();
        assert_eq!(summary.total.input_cached, 50);
        assert_eq!(summary.total.input_uncached, 0);
    }

    #[test]
    fn cost_formula_matches_spec_and_rounds_to_8_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::load(dir.path().join("l.json"), rates());
        ledger.record(Usage { prompt_tokens: 1_000_000, completion_tokens: 1_000_000, cached_tokens: 500_000 });
        let summary = ledger.summary();
        // cached=500k*1.0 + uncached=500k*2.0 + out=1M*4.0, all /1e6 = 0.5+1.0+4.0 = 5.5
        assert_eq!(summary.total.cost, 5.5);
    }

    #[test]
    fn total_reconciles_with_today_bucket_on_first_call() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::load(dir.path().join("l.json"), rates());
        ledger.record(Usage { prompt_tokens: 10, completion_tokens: 5, cached_tokens: 2 });
        let summary = ledger.summary();
        assert_eq!(summary.total.calls, summary.today.calls);
        assert_eq!(summary.total.output, summary.today.output);
    }

    #[test]
    fn session_bucket_accumulates_only_while_active() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::load(dir.path().join("l.json"), rates());
        ledger.start_session("s1");
        ledger.record(Usage { prompt_tokens: 10, completion_tokens: 0, cached_tokens: 0 });
        ledger.set_active(None);
        ledger.record(Usage { prompt_tokens: 10, completion_tokens: 0, cached_tokens: 0 });
        let bucket = ledger.session_bucket("s1").unwrap();
        assert_eq!(bucket.calls, 1);
    }

    #[test]
    fn persists_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l.json");
        {
            let ledger = TokenLedger::load(path.clone(), rates());
            ledger.record(Usage { prompt_tokens: 10, completion_tokens: 0, cached_tokens: 0 });
        }
        let reloaded = TokenLedger::load(path, rates());
        assert_eq!(reloaded.summary().total.calls, 1);
    }
}
