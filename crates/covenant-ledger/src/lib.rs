//! Covenant Ledger
//!
//! The ordered key-value ledger the settlement engine runs on: a
//! pluggable [`KvStore`], per-invocation write overlays that commit
//! atomically, deterministic invocation timestamps, event emission,
//! and a typed [`Repository`] over composite keys.

pub mod error;
pub mod events;
pub mod invocation;
pub mod ledger;
pub mod memory;
pub mod repository;
pub mod store;

pub use error::LedgerError;
pub use events::LedgerEvent;
pub use invocation::Invocation;
pub use ledger::{Ledger, Receipt};
pub use memory::MemoryStore;
pub use repository::Repository;
pub use store::{KvPair, KvStore, WriteBatch, WriteOp};
