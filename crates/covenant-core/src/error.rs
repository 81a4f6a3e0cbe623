use crate::contract_state::ContractState;

/// Core value and protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: ContractState,
        to: ContractState,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid rate: {0}")]
    InvalidRate(String),

    #[error("unknown contract kind: {0}")]
    UnknownKind(String),

    #[error("invalid composite key component: {0:?}")]
    InvalidKeyComponent(String),

    #[error("malformed composite key")]
    MalformedKey,
}
