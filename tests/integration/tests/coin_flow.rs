//! Integration test: currency accounting through committed invocations.
//!
//! Exercises CoinLedger over the ledger host: atomic commit, change
//! making, conservation and the no-partial-spend guarantee.

use covenant_core::{Amount, Coin, Provenance};
use covenant_engine::{EngineError, TransferReceipt};
use covenant_integration_tests::Harness;
use proptest::prelude::*;

const T0: i64 = 1_700_000_000;
const T1: i64 = T0 + 60;

fn units(n: u64) -> Amount {
    Amount::from_units(n)
}

fn transfer(
    h: &Harness,
    timestamp: i64,
    from: &str,
    to: &str,
    amount: Amount,
) -> Result<TransferReceipt, EngineError> {
    h.ledger
        .invoke_at(timestamp, |inv| {
            h.engine
                .coins()
                .transfer(inv, from, to, amount, Provenance::Transfer)
        })
        .map(|r| r.output)
}

fn ids(coins: &[Coin]) -> Vec<String> {
    coins.iter().map(|c| c.id.clone()).collect()
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_transfer_spends_both_coins_and_returns_change() {
    let h = Harness::new();
    h.deposit_at(T0, "alice", units(70)).unwrap();
    h.deposit_at(T0, "alice", units(50)).unwrap();
    let spent_before = ids(&h.coins("alice").unwrap());

    let receipt = transfer(&h, T1, "alice", "bob", units(100)).unwrap();

    assert_eq!(receipt.spent, spent_before);
    assert_eq!(h.balance("bob").unwrap(), units(100));

    let alice = h.coins("alice").unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].amount, units(20));
    assert_eq!(alice[0].created_via, Provenance::Change);
    assert_eq!(alice[0].created_at, T1);
}

#[test]
fn test_same_second_transfer_does_not_revive_spent_coin() {
    let h = Harness::new();
    let deposited = h.deposit_at(T0, "alice", units(70)).unwrap();

    let receipt = transfer(&h, T0, "alice", "bob", units(30)).unwrap();

    assert_eq!(receipt.spent, vec![deposited.id.clone()]);
    let change = receipt.change.unwrap();
    assert_ne!(change.id, deposited.id);

    let alice = h.coins("alice").unwrap();
    assert_eq!(ids(&alice), vec![change.id]);
    assert_eq!(h.balance("alice").unwrap(), units(40));
    assert_eq!(h.balance("bob").unwrap(), units(30));
}

#[test]
fn test_transfer_events_published_in_order() {
    let h = Harness::new();
    h.deposit_at(T0, "alice", units(70)).unwrap();
    let mut rx = h.ledger.subscribe();

    transfer(&h, T1, "alice", "bob", units(30)).unwrap();

    let names: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["CreateCoin", "CreateCoin", "Transfer"]);
}

#[test]
fn test_refused_transfer_commits_nothing() {
    let h = Harness::new();
    h.deposit_at(T0, "alice", units(70)).unwrap();
    let before = ids(&h.coins("alice").unwrap());
    let mut rx = h.ledger.subscribe();

    let err = transfer(&h, T1, "alice", "bob", units(71)).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    assert_eq!(ids(&h.coins("alice").unwrap()), before);
    assert!(h.coins("bob").unwrap().is_empty());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_invocation_failing_late_rolls_back_earlier_writes() {
    let h = Harness::new();
    h.deposit_at(T0, "alice", units(10)).unwrap();

    // The deposit succeeds inside the invocation, the transfer does not:
    // neither may survive.
    let result = h.ledger.invoke_at(T1, |inv| {
        h.engine.coins().deposit(inv, "alice", units(5))?;
        h.engine
            .coins()
            .transfer(inv, "alice", "bob", units(1_000), Provenance::Transfer)
    });
    assert!(result.is_err());
    assert_eq!(h.balance("alice").unwrap(), units(10));
    assert_eq!(h.coins("alice").unwrap().len(), 1);
}

#[test]
fn test_read_your_writes_within_invocation() {
    let h = Harness::new();
    let receipt = h
        .ledger
        .invoke_at(T0, |inv| {
            h.engine.coins().deposit(inv, "alice", units(40))?;
            h.engine
                .coins()
                .transfer(inv, "alice", "bob", units(40), Provenance::Transfer)
        })
        .unwrap();
    assert!(receipt.output.change.is_none());
    assert_eq!(h.balance("alice").unwrap(), Amount::ZERO);
    assert_eq!(h.balance("bob").unwrap(), units(40));
}

#[test]
fn test_chain_of_transfers_conserves_supply() {
    let h = Harness::new();
    let owners = ["alice", "bob", "carol"];
    h.deposit_at(T0, "alice", units(300)).unwrap();
    h.deposit_at(T0, "bob", units(120)).unwrap();
    let supply = h.supply(&owners).unwrap();

    transfer(&h, T0 + 1, "alice", "bob", units(150)).unwrap();
    transfer(&h, T0 + 2, "bob", "carol", units(200)).unwrap();
    transfer(&h, T0 + 3, "carol", "alice", Amount::from_cents(12_345)).unwrap();
    let _ = transfer(&h, T0 + 4, "carol", "bob", units(1_000));

    assert_eq!(h.supply(&owners).unwrap(), supply);
}

#[test]
fn test_unknown_owner_has_empty_balance() {
    let h = Harness::new();
    assert_eq!(h.balance("ghost").unwrap(), Amount::ZERO);
    assert!(matches!(
        transfer(&h, T0, "ghost", "bob", units(1)),
        Err(EngineError::NoFunds(_))
    ));
}

// =========================================================================
// Properties
// =========================================================================

fn arb_coins() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..=10_000, 1..8)
}

proptest! {
    /// Transfers neither create nor destroy value, whether they succeed
    /// or are refused.
    #[test]
    fn transfer_conserves_value(coins in arb_coins(), amount in 1u64..=60_000) {
        let h = Harness::new();
        for cents in &coins {
            h.deposit_at(T0, "alice", Amount::from_cents(*cents)).unwrap();
        }
        let before = h.supply(&["alice", "bob"]).unwrap();

        let result = transfer(&h, T1, "alice", "bob", Amount::from_cents(amount));

        prop_assert_eq!(result.is_ok(), amount <= before.cents());
        prop_assert_eq!(h.supply(&["alice", "bob"]).unwrap(), before);
    }

    /// Spent coins disappear; the payee holds exactly the amount and the
    /// payer keeps exactly the difference. Holds whether or not the
    /// transfer lands in the same second as the deposits.
    #[test]
    fn transfer_spends_and_makes_exact_change(
        coins in arb_coins(),
        amount in 1u64..=60_000,
        same_second in any::<bool>(),
    ) {
        let h = Harness::new();
        for cents in &coins {
            h.deposit_at(T0, "alice", Amount::from_cents(*cents)).unwrap();
        }
        let total: u64 = coins.iter().sum();
        prop_assume!(amount <= total);

        let at = if same_second { T0 } else { T1 };
        let receipt = transfer(&h, at, "alice", "bob", Amount::from_cents(amount)).unwrap();

        let remaining = ids(&h.coins("alice").unwrap());
        for id in &receipt.spent {
            prop_assert!(!remaining.contains(id));
        }
        prop_assert_eq!(h.balance("bob").unwrap(), Amount::from_cents(amount));
        prop_assert_eq!(h.balance("alice").unwrap(), Amount::from_cents(total - amount));

        let spent_total: u64 = coins[..receipt.spent.len()].iter().sum();
        match receipt.change {
            Some(change) => {
                prop_assert!(!receipt.spent.contains(&change.id));
                prop_assert_eq!(change.amount.cents(), spent_total - amount);
            }
            None => prop_assert_eq!(spent_total, amount),
        }
    }

    /// A refused transfer leaves the payer's coin set untouched.
    #[test]
    fn insufficient_funds_leave_coins_untouched(coins in arb_coins(), excess in 1u64..=1_000) {
        let h = Harness::new();
        for cents in &coins {
            h.deposit_at(T0, "alice", Amount::from_cents(*cents)).unwrap();
        }
        let total: u64 = coins.iter().sum();
        let before = h.coins("alice").unwrap();

        let err = transfer(&h, T1, "alice", "bob", Amount::from_cents(total + excess)).unwrap_err();

        let is_insufficient = matches!(err, EngineError::InsufficientBalance { .. });
        prop_assert!(is_insufficient);
        prop_assert_eq!(h.coins("alice").unwrap(), before);
        prop_assert!(h.coins("bob").unwrap().is_empty());
    }
}
