use std::fmt;

use crate::error::CoreError;

/// The states of a loan or insurance contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ContractState {
    /// Contract has been created and awaits underwriting.
    Applied,
    /// Underwriting accepted the contract and the initial funds moved.
    Approved,
    /// Underwriting refused the contract. Final state.
    Rejected,
    /// The contract was settled by repayment or payout. Final state.
    Claimed,
}

impl ContractState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Rejected | Self::Claimed)
    }
}

impl fmt::Display for ContractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "Applied"),
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Claimed => write!(f, "Claimed"),
        }
    }
}

/// Events that trigger contract state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractEvent {
    /// Underwriting accepted the application.
    Approve,
    /// Underwriting refused the application.
    Reject,
    /// The claim condition held and settlement completed.
    Claim,
}

impl ContractEvent {
    fn target(&self) -> ContractState {
        match self {
            Self::Approve => ContractState::Approved,
            Self::Reject => ContractState::Rejected,
            Self::Claim => ContractState::Claimed,
        }
    }
}

/// Manages contract state transitions.
///
/// Valid transitions:
/// - Applied → Approved (Approve)
/// - Applied → Rejected (Reject)
/// - Approved → Claimed (Claim)
pub struct ContractStateMachine;

impl ContractStateMachine {
    /// Attempt a state transition based on an event.
    /// Returns the new state on success, or an error for invalid transitions.
    pub fn transition(
        current: ContractState,
        event: ContractEvent,
    ) -> Result<ContractState, CoreError> {
        let new_state = match (current, event) {
            (ContractState::Applied, ContractEvent::Approve) => ContractState::Approved,
            (ContractState::Applied, ContractEvent::Reject) => ContractState::Rejected,
            (ContractState::Approved, ContractEvent::Claim) => ContractState::Claimed,
            _ => {
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: event.target(),
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "contract state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: ContractState, event: ContractEvent) -> bool {
        matches!(
            (current, event),
            (ContractState::Applied, ContractEvent::Approve)
                | (ContractState::Applied, ContractEvent::Reject)
                | (ContractState::Approved, ContractEvent::Claim)
        )
    }
}
