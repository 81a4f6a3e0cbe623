//! Names of the events the engine emits. Every payload is the JSON
//! encoding of the entity after the transition.

use covenant_core::ContractKind;

pub const CREATE_COIN: &str = "CreateCoin";
pub const TRANSFER: &str = "Transfer";
pub const CREATE_LOAN: &str = "CreateLoan";
pub const CREATE_INSURANCE: &str = "CreateInsurance";
pub const START_LOAN: &str = "StartLoan";
pub const START_INSURANCE: &str = "StartInsurance";
pub const LOAN_CONTRACT_CHECK: &str = "LoanContractCheck";
pub const INSURANCE_CONTRACT_CHECK: &str = "InsuranceContractCheck";

pub fn create_event(kind: ContractKind) -> &'static str {
    match kind {
        ContractKind::Loan => CREATE_LOAN,
        ContractKind::Insurance => CREATE_INSURANCE,
    }
}

pub fn start_event(kind: ContractKind) -> &'static str {
    match kind {
        ContractKind::Loan => START_LOAN,
        ContractKind::Insurance => START_INSURANCE,
    }
}

pub fn check_event(kind: ContractKind) -> &'static str {
    match kind {
        ContractKind::Loan => LOAN_CONTRACT_CHECK,
        ContractKind::Insurance => INSURANCE_CONTRACT_CHECK,
    }
}
