//! Covenant Engine
//!
//! Settlement logic that runs inside ledger invocations: the UTXO-style
//! [`CoinLedger`], the pure [`UnderwritingRules`], and the
//! [`ContractEngine`] that drives loans and insurances through their
//! lifecycle and settles value through the coin ledger.

pub mod coins;
pub mod contracts;
pub mod error;
pub mod events;
pub mod underwriting;

pub use coins::{CoinLedger, TransferReceipt};
pub use contracts::{ContractEngine, NewContract};
pub use error::EngineError;
pub use underwriting::UnderwritingRules;
