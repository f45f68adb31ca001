use serde::{Deserialize, Serialize};

/// Call count and token/cost counters at one time scale. Field names are
/// abbreviated to match the persisted wire shape (`spec.md` §6):
/// `n`=calls, `i_c`=input_cached, `i_u`=input_uncached, `o`=output, `c`=cost.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LedgerBucket {
    #[serde(rename = "n")]
    pub calls: u64,
    #[serde(rename = "i_c")]
    pub input_cached: u64,
    #[serde(rename = "i_u")]
    pub input_uncached: u64,
    #[serde(rename = "o")]
    pub output: u64,
    #[serde(rename = "c")]
    pub cost: f64,
}

impl LedgerBucket {
    pub fn add(&mut self, cached: u64, uncached: u64, output: u64, cost: f64) {
        self.calls += 1;
        self.input_cached += cached;
        self.input_uncached += uncached;
        self.output += output;
        self.cost += cost;
    }
}
