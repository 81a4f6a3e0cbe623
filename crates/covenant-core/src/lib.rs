//! Covenant Core: value types, the contract state machine, the
//! composite-key scheme, and underwriting thresholds shared by the
//! ledger host and the settlement engine.

pub mod amount;
pub mod composite_key;
pub mod config;
pub mod contract_state;
pub mod error;
pub mod types;

pub use amount::{Amount, Rate};
pub use composite_key::CompositeKey;
pub use config::UnderwritingPolicy;
pub use contract_state::{ContractEvent, ContractState, ContractStateMachine};
pub use error::CoreError;
pub use types::{ApplicantSignals, Coin, Contract, ContractKind, Provenance};
