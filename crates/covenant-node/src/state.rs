//! Shared node state, accessible from HTTP handlers.

use covenant_engine::ContractEngine;
use covenant_ledger::Ledger;
use std::time::Instant;

use crate::storage::RocksStore;

pub struct NodeState {
    /// Ledger host every invocation runs through.
    pub ledger: Ledger<RocksStore>,
    pub engine: ContractEngine,
    /// When the node started.
    pub start_time: Instant,
}

impl NodeState {
    pub fn new(ledger: Ledger<RocksStore>, engine: ContractEngine) -> Self {
        Self {
            ledger,
            engine,
            start_time: Instant::now(),
        }
    }
}
