use covenant_core::{Amount, ContractState, CoreError};
use covenant_ledger::LedgerError;

/// Settlement engine errors.
///
/// Any error aborts the invocation it was raised in; nothing it wrote
/// is committed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("contract {business_id} is {state}, expected {expected}")]
    InvalidState {
        business_id: String,
        state: ContractState,
        expected: ContractState,
    },

    #[error("owner {0} holds no coins")]
    NoFunds(String),

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("contract {0} is not claimable")]
    NotClaimable(String),

    #[error("unknown contract kind: {0}")]
    UnknownKind(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// An owner, id or business id that cannot be part of a key.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("malformed stored record: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error(transparent)]
    Core(CoreError),

    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Serialization(e) => Self::Serialization(e),
            LedgerError::Key(e) => Self::from(e),
            other => Self::Ledger(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnknownKind(kind) => Self::UnknownKind(kind),
            CoreError::InvalidAmount(msg) => Self::InvalidAmount(msg),
            CoreError::InvalidKeyComponent(component) => Self::InvalidIdentifier(component),
            other => Self::Core(other),
        }
    }
}
