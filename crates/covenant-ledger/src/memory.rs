use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::LedgerError;
use crate::store::{KvPair, KvStore, WriteBatch, WriteOp};

/// In-memory ordered store. Used by tests and embedded hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        let entries = self.entries.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, LedgerError> {
        let entries = self.entries.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write(&self, batch: WriteBatch) -> Result<(), LedgerError> {
        let mut entries = self.entries.write().map_err(|_| LedgerError::LockPoisoned)?;
        for op in batch.into_ops() {
            match op {
                WriteOp::Put(k, v) => {
                    entries.insert(k, v);
                }
                WriteOp::Delete(k) => {
                    entries.remove(&k);
                }
            }
        }
        Ok(())
    }
}
