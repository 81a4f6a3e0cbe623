//! The Covenant node orchestrator.
//!
//! Opens storage, hosts the ledger and engine, serves the HTTP gateway in
//! a background task, and logs every committed ledger event.

use anyhow::Result;
use covenant_engine::{ContractEngine, UnderwritingRules};
use covenant_ledger::{Ledger, LedgerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::CovenantConfig;
use crate::state::NodeState;
use crate::storage::RocksStore;

pub struct CovenantNode {
    config: CovenantConfig,
    /// Shared state accessible from HTTP handlers.
    node_state: Option<Arc<NodeState>>,
    /// Committed ledger events.
    event_rx: Option<broadcast::Receiver<LedgerEvent>>,
}

impl CovenantNode {
    pub fn new(config: CovenantConfig) -> Self {
        Self {
            config,
            node_state: None,
            event_rx: None,
        }
    }

    /// Open storage, build the ledger host and engine, start the gateway.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting Covenant node");

        let store = RocksStore::open(&self.config.storage.data_dir)?;
        tracing::info!(path = %self.config.storage.data_dir.display(), "storage initialized");

        let ledger = Ledger::with_event_capacity(store, self.config.storage.event_capacity);
        let event_rx = ledger.subscribe();
        let engine = ContractEngine::new(UnderwritingRules::new(self.config.underwriting.clone()));
        let node_state = Arc::new(NodeState::new(ledger, engine));

        let api_addr: SocketAddr = self.config.api_addr().parse()?;
        let api_state = node_state.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::api::start_api_server(api_addr, api_state).await {
                tracing::error!(error = %e, "HTTP gateway error");
            }
        });

        self.node_state = Some(node_state);
        self.event_rx = Some(event_rx);
        Ok(())
    }

    /// Log committed ledger events until the channel closes.
    pub async fn run(&mut self) -> Result<()> {
        let mut event_rx = self
            .event_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;

        tracing::info!("listening for ledger events");

        loop {
            match event_rx.recv().await {
                Ok(ev) => Self::handle_ledger_event(&ev),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("ledger event channel closed");
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_ledger_event(ev: &LedgerEvent) {
        tracing::info!(
            event = %ev.name,
            tx_id = %ev.tx_id,
            timestamp = ev.timestamp,
            payload = %ev.payload_str(),
            "ledger event"
        );
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down Covenant node");
        self.event_rx = None;
        if self.node_state.take().is_some() {
            tracing::info!("storage released");
        }
        Ok(())
    }

    pub fn state(&self) -> Option<&Arc<NodeState>> {
        self.node_state.as_ref()
    }
}
