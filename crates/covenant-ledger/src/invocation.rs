//! One atomic unit of work against the ledger.
//!
//! Writes are buffered in an overlay and only reach the store when the
//! owning [`Ledger`](crate::Ledger) commits. Reads see the overlay first,
//! so an invocation observes its own deletes and creates.

use std::collections::BTreeMap;

use covenant_core::CompositeKey;
use serde::Serialize;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::store::{KvStore, WriteBatch};

/// Execution context handed to every engine operation.
pub struct Invocation<'a> {
    store: &'a dyn KvStore,
    tx_id: Uuid,
    timestamp: i64,
    /// Pending writes: `Some` = put, `None` = delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    events: Vec<LedgerEvent>,
}

impl<'a> Invocation<'a> {
    /// Open an invocation over `store` with a fixed timestamp.
    pub fn new(store: &'a dyn KvStore, timestamp: i64) -> Self {
        Self {
            store,
            tx_id: Uuid::now_v7(),
            timestamp,
            writes: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    /// Deterministic invocation timestamp (seconds).
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn build_composite_key(
        &self,
        tag: &str,
        components: &[&str],
    ) -> Result<CompositeKey, LedgerError> {
        Ok(CompositeKey::new(tag, components)?)
    }

    pub fn get(&self, key: &CompositeKey) -> Result<Option<Vec<u8>>, LedgerError> {
        match self.writes.get(key.as_bytes()) {
            Some(pending) => Ok(pending.clone()),
            None => self.store.get(key.as_bytes()),
        }
    }

    pub fn put(&mut self, key: &CompositeKey, value: Vec<u8>) {
        self.writes.insert(key.as_bytes().to_vec(), Some(value));
    }

    pub fn delete(&mut self, key: &CompositeKey) {
        self.writes.insert(key.as_bytes().to_vec(), None);
    }

    /// Every entry under `tag` whose leading components equal `components`,
    /// in key order, with this invocation's pending writes applied.
    pub fn range_by_prefix(
        &self,
        tag: &str,
        components: &[&str],
    ) -> Result<Vec<(CompositeKey, Vec<u8>)>, LedgerError> {
        let prefix = CompositeKey::new(tag, components)?;
        let prefix = prefix.as_bytes();

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(prefix)?.into_iter().collect();
        for (key, pending) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged
            .into_iter()
            .map(|(k, v)| Ok((CompositeKey::from_bytes(&k)?, v)))
            .collect()
    }

    /// Buffer an event; it is published only if the invocation commits.
    pub fn emit_event<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        payload: &T,
    ) -> Result<(), LedgerError> {
        let payload = serde_json::to_vec(payload)?;
        self.events.push(LedgerEvent {
            tx_id: self.tx_id,
            timestamp: self.timestamp,
            name: name.to_string(),
            payload,
        });
        Ok(())
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Number of distinct keys this invocation will write.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    pub(crate) fn into_parts(self) -> (WriteBatch, Vec<LedgerEvent>) {
        let mut batch = WriteBatch::new();
        for (key, pending) in self.writes {
            match pending {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        (batch, self.events)
    }
}
