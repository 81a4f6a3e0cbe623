//! Loan and insurance contracts.
//!
//! Contracts live under `<Kind>/<applicant>/<business_id>` and move
//! through `Applied → {Approved, Rejected}` and `Approved → Claimed`.
//! Every value movement goes through the [`CoinLedger`] inside the same
//! invocation that updates the contract.

use covenant_core::{
    Amount, ApplicantSignals, Contract, ContractEvent, ContractKind, ContractState,
    ContractStateMachine, Rate,
};
use covenant_ledger::{Invocation, Repository};
use serde::{Deserialize, Serialize};

use crate::coins::CoinLedger;
use crate::error::EngineError;
use crate::events;
use crate::underwriting::UnderwritingRules;

/// Terms of a contract application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContract {
    pub applicant: String,
    pub business_id: String,
    pub kind: ContractKind,
    pub amount: Amount,
    pub issuer: String,
    #[serde(default)]
    pub rate: Rate,
    /// Loan term in days. Ignored for insurance.
    #[serde(default)]
    pub period_days: u32,
}

/// Drives contracts through underwriting, funding and claims.
#[derive(Debug)]
pub struct ContractEngine {
    coins: CoinLedger,
    rules: UnderwritingRules,
    loans: Repository<Contract>,
    insurances: Repository<Contract>,
}

impl ContractEngine {
    pub fn new(rules: UnderwritingRules) -> Self {
        Self {
            coins: CoinLedger::new(),
            rules,
            loans: Repository::new(ContractKind::Loan.tag()),
            insurances: Repository::new(ContractKind::Insurance.tag()),
        }
    }

    pub fn coins(&self) -> &CoinLedger {
        &self.coins
    }

    pub fn rules(&self) -> &UnderwritingRules {
        &self.rules
    }

    fn records(&self, kind: ContractKind) -> &Repository<Contract> {
        match kind {
            ContractKind::Loan => &self.loans,
            ContractKind::Insurance => &self.insurances,
        }
    }

    /// Record a new application in `Applied` and emit `Create<Kind>`.
    pub fn create_contract(
        &self,
        inv: &mut Invocation<'_>,
        new: NewContract,
    ) -> Result<Contract, EngineError> {
        if new.amount.is_zero() {
            return Err(EngineError::InvalidAmount(format!(
                "contract {} must carry a positive amount",
                new.business_id
            )));
        }

        let records = self.records(new.kind);
        if records.exists(inv, &[new.applicant.as_str(), new.business_id.as_str()])? {
            return Err(EngineError::AlreadyExists(format!(
                "{} {} of {}",
                new.kind, new.business_id, new.applicant
            )));
        }

        let now = inv.timestamp();
        let contract = Contract {
            period_days: match new.kind {
                ContractKind::Loan => Some(new.period_days),
                ContractKind::Insurance => None,
            },
            business_id: new.business_id,
            kind: new.kind,
            amount: new.amount,
            issuer: new.issuer,
            applicant: new.applicant,
            rate: new.rate,
            state: ContractState::Applied,
            created_at: now,
            updated_at: now,
            contingency: None,
        };

        records.put(
            inv,
            &[contract.applicant.as_str(), contract.business_id.as_str()],
            &contract,
        )?;
        inv.emit_event(events::create_event(contract.kind), &contract)?;

        tracing::info!(
            kind = %contract.kind,
            applicant = %contract.applicant,
            business_id = %contract.business_id,
            amount = %contract.amount,
            "contract created"
        );
        Ok(contract)
    }

    pub fn read_contract(
        &self,
        inv: &Invocation<'_>,
        kind: ContractKind,
        applicant: &str,
        business_id: &str,
    ) -> Result<Contract, EngineError> {
        self.records(kind)
            .get(inv, &[applicant, business_id])?
            .ok_or_else(|| {
                EngineError::NotFound(format!("{} {} of {}", kind, business_id, applicant))
            })
    }

    /// Contracts of one kind held by `applicant`, in business-id order.
    pub fn list_contracts_by_owner(
        &self,
        inv: &Invocation<'_>,
        kind: ContractKind,
        applicant: &str,
    ) -> Result<Vec<Contract>, EngineError> {
        let mut contracts = self.records(kind).scan(inv, &[applicant])?;
        contracts.retain(|c| c.applicant == applicant);
        Ok(contracts)
    }

    /// Loans followed by insurances.
    pub fn list_all_contracts_by_owner(
        &self,
        inv: &Invocation<'_>,
        applicant: &str,
    ) -> Result<Vec<Contract>, EngineError> {
        let mut all = self.list_contracts_by_owner(inv, ContractKind::Loan, applicant)?;
        all.extend(self.list_contracts_by_owner(inv, ContractKind::Insurance, applicant)?);
        Ok(all)
    }

    pub fn count_approved_loans_by_owner(
        &self,
        inv: &Invocation<'_>,
        applicant: &str,
    ) -> Result<usize, EngineError> {
        Ok(self
            .list_contracts_by_owner(inv, ContractKind::Loan, applicant)?
            .iter()
            .filter(|c| c.state == ContractState::Approved)
            .count())
    }

    /// Underwrite a loan. On approval the issuer funds the applicant.
    ///
    /// Returns `false` when underwriting rejected the loan; that outcome
    /// is committed like any other.
    pub fn start_loan(
        &self,
        inv: &mut Invocation<'_>,
        applicant: &str,
        business_id: &str,
        signals: &ApplicantSignals,
    ) -> Result<bool, EngineError> {
        self.start(inv, ContractKind::Loan, applicant, business_id, signals)
    }

    /// Underwrite an insurance. On approval the applicant pays the
    /// premium to the issuer.
    pub fn start_insurance(
        &self,
        inv: &mut Invocation<'_>,
        applicant: &str,
        business_id: &str,
        signals: &ApplicantSignals,
    ) -> Result<bool, EngineError> {
        self.start(inv, ContractKind::Insurance, applicant, business_id, signals)
    }

    fn start(
        &self,
        inv: &mut Invocation<'_>,
        kind: ContractKind,
        applicant: &str,
        business_id: &str,
        signals: &ApplicantSignals,
    ) -> Result<bool, EngineError> {
        let mut contract =
            self.load_in_state(inv, kind, applicant, business_id, ContractState::Applied)?;

        let approved_loans = match kind {
            ContractKind::Loan => self.count_approved_loans_by_owner(inv, applicant)?,
            ContractKind::Insurance => 0,
        };
        let accepted = self
            .rules
            .originate(kind, signals, contract.amount, approved_loans);

        if !accepted {
            self.advance(inv, &mut contract, ContractEvent::Reject, events::start_event(kind))?;
            tracing::info!(%kind, applicant, business_id, "application rejected");
            return Ok(false);
        }

        let (payer, payee) = match kind {
            ContractKind::Loan => (&contract.issuer, &contract.applicant),
            ContractKind::Insurance => (&contract.applicant, &contract.issuer),
        };
        self.coins
            .transfer(inv, payer, payee, contract.amount, kind.provenance())?;

        self.advance(inv, &mut contract, ContractEvent::Approve, events::start_event(kind))?;
        tracing::info!(%kind, applicant, business_id, amount = %contract.amount, "application approved");
        Ok(true)
    }

    /// Force repayment of an approved loan: principal plus interest flows
    /// from the applicant back to the issuer.
    ///
    /// `current_time` is the caller's clock, compared against the loan's
    /// creation time and term.
    pub fn loan_contract_check(
        &self,
        inv: &mut Invocation<'_>,
        applicant: &str,
        business_id: &str,
        signals: &ApplicantSignals,
        current_time: i64,
    ) -> Result<bool, EngineError> {
        let kind = ContractKind::Loan;
        let mut contract =
            self.load_in_state(inv, kind, applicant, business_id, ContractState::Approved)?;

        let overdue = UnderwritingRules::is_overdue(
            contract.created_at,
            contract.period_days.unwrap_or(0),
            current_time,
        );
        if !self.rules.loan_claim(signals, overdue) {
            tracing::warn!(applicant, business_id, "loan not claimable");
            return Err(EngineError::NotClaimable(business_id.to_string()));
        }

        let due = contract.amount.with_rate(contract.rate)?;
        self.coins.transfer(
            inv,
            &contract.applicant,
            &contract.issuer,
            due,
            kind.provenance(),
        )?;

        self.advance(inv, &mut contract, ContractEvent::Claim, events::check_event(kind))?;
        tracing::info!(applicant, business_id, overdue, repaid = %due, "loan claimed");
        Ok(true)
    }

    /// Pay out an approved insurance: coverage plus premium rate flows
    /// from the issuer to the applicant. `contingency_info` is recorded
    /// on the contract.
    pub fn insurance_contract_check(
        &self,
        inv: &mut Invocation<'_>,
        applicant: &str,
        business_id: &str,
        signals: &ApplicantSignals,
        is_sudden: bool,
        contingency_info: &str,
    ) -> Result<bool, EngineError> {
        let kind = ContractKind::Insurance;
        let mut contract =
            self.load_in_state(inv, kind, applicant, business_id, ContractState::Approved)?;

        if !self.rules.insurance_claim(signals, is_sudden) {
            tracing::warn!(applicant, business_id, is_sudden, "insurance not claimable");
            return Err(EngineError::NotClaimable(business_id.to_string()));
        }

        let payout = contract.amount.with_rate(contract.rate)?;
        self.coins.transfer(
            inv,
            &contract.issuer,
            &contract.applicant,
            payout,
            kind.provenance(),
        )?;

        if !contingency_info.is_empty() {
            contract.contingency = Some(contingency_info.to_string());
        }
        self.advance(inv, &mut contract, ContractEvent::Claim, events::check_event(kind))?;
        tracing::info!(applicant, business_id, payout = %payout, "insurance claimed");
        Ok(true)
    }

    fn load_in_state(
        &self,
        inv: &Invocation<'_>,
        kind: ContractKind,
        applicant: &str,
        business_id: &str,
        expected: ContractState,
    ) -> Result<Contract, EngineError> {
        let contract = self.read_contract(inv, kind, applicant, business_id)?;
        if contract.state != expected {
            return Err(EngineError::InvalidState {
                business_id: business_id.to_string(),
                state: contract.state,
                expected,
            });
        }
        Ok(contract)
    }

    /// Apply `event`, stamp, persist, and emit `event_name` with the
    /// updated contract.
    fn advance(
        &self,
        inv: &mut Invocation<'_>,
        contract: &mut Contract,
        event: ContractEvent,
        event_name: &str,
    ) -> Result<(), EngineError> {
        contract.state = ContractStateMachine::transition(contract.state, event)?;
        contract.updated_at = inv.timestamp();

        let components = [contract.applicant.as_str(), contract.business_id.as_str()];
        self.records(contract.kind).put(inv, &components, contract)?;
        inv.emit_event(event_name, &*contract)?;
        Ok(())
    }
}

impl Default for ContractEngine {
    fn default() -> Self {
        Self::new(UnderwritingRules::default())
    }
}
