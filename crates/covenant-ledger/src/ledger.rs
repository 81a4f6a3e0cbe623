use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::invocation::Invocation;
use crate::store::KvStore;

/// Default capacity of the committed-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Outcome of a committed invocation.
#[derive(Debug, Clone)]
pub struct Receipt<T> {
    pub tx_id: Uuid,
    pub timestamp: i64,
    pub output: T,
    /// Events published by this invocation, in emission order.
    pub events: Vec<LedgerEvent>,
}

/// Hosts invocations over a [`KvStore`].
///
/// Invocations are serialized. Each one either commits every buffered
/// write and publishes its events, or (when the operation returns `Err`)
/// leaves the store untouched and publishes nothing.
pub struct Ledger<S: KvStore> {
    store: S,
    /// Serializes invocations; holds the last committed timestamp.
    clock: Mutex<i64>,
    events_tx: broadcast::Sender<LedgerEvent>,
}

impl<S: KvStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self::with_event_capacity(store, EVENT_CHANNEL_CAPACITY)
    }

    pub fn with_event_capacity(store: S, capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel(capacity);
        Self {
            store,
            clock: Mutex::new(0),
            events_tx,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Subscribe to events of invocations committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events_tx.subscribe()
    }

    /// Run `f` as one invocation stamped with the wall clock.
    ///
    /// Timestamps never go backwards: if the clock reads earlier than the
    /// last committed invocation, that invocation's timestamp is reused.
    pub fn invoke<T, E, F>(&self, f: F) -> Result<Receipt<T>, E>
    where
        F: FnOnce(&mut Invocation<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut last = self.clock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let timestamp = Utc::now().timestamp().max(*last);
        self.run(&mut last, timestamp, f)
    }

    /// Run `f` as one invocation with an explicit timestamp.
    pub fn invoke_at<T, E, F>(&self, timestamp: i64, f: F) -> Result<Receipt<T>, E>
    where
        F: FnOnce(&mut Invocation<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut last = self.clock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        self.run(&mut last, timestamp, f)
    }

    /// Run a read-only query. Any writes or events are discarded.
    pub fn evaluate<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Invocation<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let last = self.clock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let inv = Invocation::new(&self.store, Utc::now().timestamp().max(*last));
        f(&inv)
    }

    fn run<T, E, F>(&self, last: &mut i64, timestamp: i64, f: F) -> Result<Receipt<T>, E>
    where
        F: FnOnce(&mut Invocation<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut inv = Invocation::new(&self.store, timestamp);
        let tx_id = inv.tx_id();

        let output = match f(&mut inv) {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(%tx_id, timestamp, "invocation failed; discarding writes");
                return Err(e);
            }
        };

        let (batch, events) = inv.into_parts();
        let writes = batch.len();
        if !batch.is_empty() {
            self.store.write(batch)?;
        }
        *last = (*last).max(timestamp);

        for event in &events {
            // No subscribers is not an error.
            let _ = self.events_tx.send(event.clone());
        }

        tracing::debug!(%tx_id, timestamp, writes, events = events.len(), "invocation committed");

        Ok(Receipt {
            tx_id,
            timestamp,
            output,
            events,
        })
    }
}
