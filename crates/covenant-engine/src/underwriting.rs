use covenant_core::{Amount, ApplicantSignals, ContractKind, UnderwritingPolicy};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Pure accept/reject and claim decisions. Never touches the ledger.
#[derive(Debug, Clone, Default)]
pub struct UnderwritingRules {
    policy: UnderwritingPolicy,
}

impl UnderwritingRules {
    pub fn new(policy: UnderwritingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UnderwritingPolicy {
        &self.policy
    }

    /// Decide whether an application in `Applied` is accepted.
    ///
    /// `approved_loans` is how many loans the applicant already holds in
    /// `Approved`; it only matters for loans.
    pub fn originate(
        &self,
        kind: ContractKind,
        signals: &ApplicantSignals,
        amount: Amount,
        approved_loans: usize,
    ) -> bool {
        let creditworthy = signals.credit >= self.policy.credit_cutoff
            && signals.income >= self.policy.min_income;

        match kind {
            ContractKind::Loan => {
                creditworthy
                    && amount <= self.policy.max_loan_principal
                    && approved_loans <= self.policy.max_approved_loans
            }
            ContractKind::Insurance => creditworthy,
        }
    }

    /// A loan is overdue once strictly more than its term has elapsed
    /// since creation.
    pub fn is_overdue(created_at: i64, period_days: u32, now: i64) -> bool {
        let elapsed = now.saturating_sub(created_at);
        elapsed > i64::from(period_days) * SECONDS_PER_DAY
    }

    /// Whether an approved loan must be repaid now.
    pub fn loan_claim(&self, signals: &ApplicantSignals, overdue: bool) -> bool {
        signals.credit > self.policy.credit_cutoff
            || signals.income < self.policy.min_income
            || overdue
    }

    /// Whether an approved insurance pays out.
    pub fn insurance_claim(&self, signals: &ApplicantSignals, is_sudden: bool) -> bool {
        signals.credit > self.policy.credit_cutoff
            && signals.income < self.policy.payout_income_ceiling
            && is_sudden
    }
}
