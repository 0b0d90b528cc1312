// 8.0.1: ledger bookkeeping options. none of these change escrow rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // oldest events are dropped past this
    pub max_events: usize,
    // settled batches kept for inspection; 0 keeps none
    pub max_settlements: usize,
    // committed events logged at info instead of debug
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            max_settlements: 10_000,
            verbose: false,
        }
    }
}
