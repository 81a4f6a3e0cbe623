//! Integration test: loan and insurance lifecycles across crates.
//!
//! Drives ContractEngine through committed ledger invocations and checks
//! balances, persisted state and published events after every step.

use covenant_core::{
    Amount, ApplicantSignals, Contract, ContractKind, ContractState, Rate, UnderwritingPolicy,
};
use covenant_engine::{EngineError, NewContract};
use covenant_integration_tests::Harness;

const T0: i64 = 1_700_000_000;
const DAY: i64 = 86_400;

fn units(n: u64) -> Amount {
    Amount::from_units(n)
}

fn signals(credit: f64, income: u64) -> ApplicantSignals {
    ApplicantSignals::new(credit, units(income))
}

fn create(h: &Harness, timestamp: i64, new: NewContract) -> Result<Contract, EngineError> {
    h.ledger
        .invoke_at(timestamp, |inv| h.engine.create_contract(inv, new))
        .map(|r| r.output)
}

fn loan(business_id: &str, amount: u64, period_days: u32, rate_bp: u32) -> NewContract {
    NewContract {
        applicant: "alice".into(),
        business_id: business_id.into(),
        kind: ContractKind::Loan,
        amount: units(amount),
        issuer: "bank".into(),
        rate: Rate::from_basis_points(rate_bp),
        period_days,
    }
}

fn insurance(business_id: &str, amount: u64, rate_bp: u32) -> NewContract {
    NewContract {
        applicant: "alice".into(),
        business_id: business_id.into(),
        kind: ContractKind::Insurance,
        amount: units(amount),
        issuer: "insurer".into(),
        rate: Rate::from_basis_points(rate_bp),
        period_days: 0,
    }
}

fn start_loan(h: &Harness, timestamp: i64, id: &str, s: ApplicantSignals) -> Result<bool, EngineError> {
    h.ledger
        .invoke_at(timestamp, |inv| h.engine.start_loan(inv, "alice", id, &s))
        .map(|r| r.output)
}

fn read(h: &Harness, kind: ContractKind, id: &str) -> Contract {
    h.ledger
        .evaluate(|inv| h.engine.read_contract(inv, kind, "alice", id))
        .unwrap()
}

// =========================================================================
// Loans
// =========================================================================

#[test]
fn test_loan_approved_moves_principal() {
    let h = Harness::new();
    h.deposit_at(T0, "bank", units(20_000)).unwrap();
    create(&h, T0, loan("L-1", 5_000, 30, 0)).unwrap();

    assert!(start_loan(&h, T0 + 10, "L-1", signals(70.0, 6_000)).unwrap());

    assert_eq!(h.balance("bank").unwrap(), units(15_000));
    assert_eq!(h.balance("alice").unwrap(), units(5_000));
    let contract = read(&h, ContractKind::Loan, "L-1");
    assert_eq!(contract.state, ContractState::Approved);
    assert_eq!(contract.created_at, T0);
    assert_eq!(contract.updated_at, T0 + 10);
}

#[test]
fn test_loan_rejected_moves_nothing() {
    let h = Harness::new();
    h.deposit_at(T0, "bank", units(20_000)).unwrap();
    create(&h, T0, loan("L-1", 5_000, 30, 0)).unwrap();

    assert!(!start_loan(&h, T0 + 10, "L-1", signals(50.0, 6_000)).unwrap());

    assert_eq!(h.balance("bank").unwrap(), units(20_000));
    assert_eq!(h.balance("alice").unwrap(), Amount::ZERO);
    assert_eq!(read(&h, ContractKind::Loan, "L-1").state, ContractState::Rejected);
}

#[test]
fn test_loan_over_principal_cap_rejected() {
    let h = Harness::new();
    h.deposit_at(T0, "bank", units(50_000)).unwrap();
    create(&h, T0, loan("L-big", 10_001, 30, 0)).unwrap();
    assert!(!start_loan(&h, T0 + 1, "L-big", signals(90.0, 9_000)).unwrap());
}

#[test]
fn test_unfunded_issuer_aborts_whole_start() {
    let h = Harness::new();
    h.deposit_at(T0, "bank", units(100)).unwrap();
    create(&h, T0, loan("L-1", 5_000, 30, 0)).unwrap();
    let mut rx = h.ledger.subscribe();

    let err = start_loan(&h, T0 + 1, "L-1", signals(70.0, 6_000)).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));

    // Still applicable once the issuer is funded.
    assert_eq!(read(&h, ContractKind::Loan, "L-1").state, ContractState::Applied);
    assert!(rx.try_recv().is_err());
    h.deposit_at(T0 + 2, "bank", units(5_000)).unwrap();
    assert!(start_loan(&h, T0 + 3, "L-1", signals(70.0, 6_000)).unwrap());
}

#[test]
fn test_loan_repaid_with_interest_when_overdue() {
    let h = Harness::new();
    h.deposit_at(T0, "bank", units(10_000)).unwrap();
    h.deposit_at(T0, "alice", units(100)).unwrap();
    create(&h, T0, loan("L-1", 2_000, 30, 500)).unwrap();
    assert!(start_loan(&h, T0 + 1, "L-1", signals(60.0, 6_000)).unwrap());

    // Within the term and healthy signals: nothing to claim.
    let early = h.ledger.invoke_at(T0 + DAY, |inv| {
        h.engine
            .loan_contract_check(inv, "alice", "L-1", &signals(60.0, 6_000), T0 + 30 * DAY)
    });
    assert!(matches!(early, Err(EngineError::NotClaimable(_))));

    let receipt = h
        .ledger
        .invoke_at(T0 + 31 * DAY, |inv| {
            h.engine
                .loan_contract_check(inv, "alice", "L-1", &signals(60.0, 6_000), T0 + 30 * DAY + 1)
        })
        .unwrap();
    assert!(receipt.output);

    // 2000 × 1.05 = 2100 back to the bank.
    assert_eq!(h.balance("bank").unwrap(), units(10_100));
    assert_eq!(h.balance("alice").unwrap(), Amount::ZERO);

    let contract = read(&h, ContractKind::Loan, "L-1");
    assert_eq!(contract.state, ContractState::Claimed);
    assert_eq!(contract.updated_at, T0 + 31 * DAY);

    let last = receipt.events.last().unwrap();
    assert_eq!(last.name, "LoanContractCheck");
    let payload: Contract = last.payload_as().unwrap();
    assert_eq!(payload.state, ContractState::Claimed);
}

#[test]
fn test_approved_loan_cap_uses_configured_policy() {
    let h = Harness::with_policy(UnderwritingPolicy {
        max_approved_loans: 1,
        ..UnderwritingPolicy::default()
    });
    h.deposit_at(T0, "bank", units(1_000)).unwrap();

    for (i, expected) in [true, true, false].into_iter().enumerate() {
        let id = format!("L-{}", i);
        create(&h, T0, loan(&id, 100, 30, 0)).unwrap();
        assert_eq!(start_loan(&h, T0 + 1, &id, signals(70.0, 6_000)).unwrap(), expected);
    }
    let count = h
        .ledger
        .evaluate(|inv| h.engine.count_approved_loans_by_owner(inv, "alice"))
        .unwrap();
    assert_eq!(count, 2);
}

// =========================================================================
// Insurance
// =========================================================================

#[test]
fn test_insurance_premium_then_payout() {
    let h = Harness::new();
    h.deposit_at(T0, "alice", units(800)).unwrap();
    h.deposit_at(T0, "insurer", units(5_000)).unwrap();
    create(&h, T0, insurance("I-1", 500, 2_000)).unwrap();

    let started = h
        .ledger
        .invoke_at(T0 + 1, |inv| {
            h.engine
                .start_insurance(inv, "alice", "I-1", &signals(65.0, 7_000))
        })
        .unwrap();
    assert!(started.output);
    assert_eq!(h.balance("alice").unwrap(), units(300));
    assert_eq!(h.balance("insurer").unwrap(), units(5_500));

    let claimed = h
        .ledger
        .invoke_at(T0 + 2, |inv| {
            h.engine.insurance_contract_check(
                inv,
                "alice",
                "I-1",
                &signals(65.0, 7_000),
                true,
                "storm damage",
            )
        })
        .unwrap();
    assert!(claimed.output);

    // 500 × 1.2 = 600 paid out.
    assert_eq!(h.balance("alice").unwrap(), units(900));
    assert_eq!(h.balance("insurer").unwrap(), units(4_900));
    let contract = read(&h, ContractKind::Insurance, "I-1");
    assert_eq!(contract.state, ContractState::Claimed);
    assert_eq!(contract.contingency.as_deref(), Some("storm damage"));
}

#[test]
fn test_insurance_rejected_by_credit() {
    let h = Harness::new();
    h.deposit_at(T0, "alice", units(800)).unwrap();
    create(&h, T0, insurance("I-1", 500, 0)).unwrap();

    let started = h
        .ledger
        .invoke_at(T0 + 1, |inv| {
            h.engine
                .start_insurance(inv, "alice", "I-1", &signals(40.0, 7_000))
        })
        .unwrap();
    assert!(!started.output);
    assert_eq!(started.events.len(), 1);
    assert_eq!(started.events[0].name, "StartInsurance");
    assert_eq!(h.balance("alice").unwrap(), units(800));
}

// =========================================================================
// Invariants
// =========================================================================

#[test]
fn test_duplicate_create_is_rejected_and_first_kept() {
    let h = Harness::new();
    let first = create(&h, T0, loan("L-1", 1_000, 30, 0)).unwrap();
    let err = create(&h, T0 + 5, loan("L-1", 2_000, 10, 100)).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyExists(_)));
    assert_eq!(read(&h, ContractKind::Loan, "L-1"), first);
}

#[test]
fn test_terminal_states_never_move() {
    let h = Harness::new();
    h.deposit_at(T0, "bank", units(10_000)).unwrap();
    create(&h, T0, loan("L-rej", 1_000, 30, 0)).unwrap();
    create(&h, T0, loan("L-app", 1_000, 30, 0)).unwrap();
    assert!(!start_loan(&h, T0 + 1, "L-rej", signals(10.0, 0)).unwrap());

    // Applied cannot jump straight to Claimed.
    let jump = h.ledger.invoke_at(T0 + 2, |inv| {
        h.engine
            .loan_contract_check(inv, "alice", "L-app", &signals(99.0, 0), T0 + 999 * DAY)
    });
    assert!(matches!(
        jump,
        Err(EngineError::InvalidState { state: ContractState::Applied, .. })
    ));

    // Rejected is final for both transitions.
    assert!(matches!(
        start_loan(&h, T0 + 3, "L-rej", signals(99.0, 9_000)),
        Err(EngineError::InvalidState { state: ContractState::Rejected, .. })
    ));
    let check = h.ledger.invoke_at(T0 + 4, |inv| {
        h.engine
            .loan_contract_check(inv, "alice", "L-rej", &signals(99.0, 0), T0 + 999 * DAY)
    });
    assert!(matches!(
        check,
        Err(EngineError::InvalidState { state: ContractState::Rejected, .. })
    ));
    assert_eq!(read(&h, ContractKind::Loan, "L-rej").state, ContractState::Rejected);
}

#[test]
fn test_contract_flows_conserve_supply() {
    let h = Harness::new();
    let owners = ["alice", "bank", "insurer"];
    h.deposit_at(T0, "bank", units(10_000)).unwrap();
    h.deposit_at(T0, "insurer", units(10_000)).unwrap();
    h.deposit_at(T0, "alice", units(1_000)).unwrap();
    let supply = h.supply(&owners).unwrap();

    create(&h, T0, loan("L-1", 3_000, 30, 1_000)).unwrap();
    create(&h, T0, insurance("I-1", 400, 5_000)).unwrap();
    start_loan(&h, T0 + 1, "L-1", signals(70.0, 6_000)).unwrap();
    h.ledger
        .invoke_at(T0 + 2, |inv| {
            h.engine
                .start_insurance(inv, "alice", "I-1", &signals(70.0, 6_000))
        })
        .unwrap();
    h.ledger
        .invoke_at(T0 + 3, |inv| {
            h.engine
                .loan_contract_check(inv, "alice", "L-1", &signals(70.0, 6_000), T0 + 3)
        })
        .unwrap();
    h.ledger
        .invoke_at(T0 + 4, |inv| {
            h.engine
                .insurance_contract_check(inv, "alice", "I-1", &signals(70.0, 6_000), true, "")
        })
        .unwrap();

    assert_eq!(h.supply(&owners).unwrap(), supply);
}

#[test]
fn test_listing_across_kinds() {
    let h = Harness::new();
    create(&h, T0, insurance("I-1", 10, 0)).unwrap();
    create(&h, T0, loan("L-2", 10, 30, 0)).unwrap();
    create(&h, T0, loan("L-1", 10, 30, 0)).unwrap();

    let all = h
        .ledger
        .evaluate(|inv| h.engine.list_all_contracts_by_owner(inv, "alice"))
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|c| c.business_id.as_str()).collect();
    assert_eq!(ids, vec!["L-1", "L-2", "I-1"]);
}

#[test]
fn test_unknown_kind_string_is_rejected() {
    let kind = "Annuity".parse::<ContractKind>().map_err(EngineError::from);
    assert!(matches!(kind, Err(EngineError::UnknownKind(k)) if k == "Annuity"));
}
