use covenant_core::CoreError;

/// Ledger-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("key error: {0}")]
    Key(#[from] CoreError),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}
