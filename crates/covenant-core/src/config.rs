use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Underwriting thresholds applied at origination and claim time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnderwritingPolicy {
    /// Credit score cutoff. Origination needs `credit >= cutoff`;
    /// claims test `credit > cutoff`.
    pub credit_cutoff: f64,
    /// Minimum income to originate. A loan whose applicant earns less
    /// becomes claimable.
    pub min_income: Amount,
    /// Largest loan principal that can be approved.
    pub max_loan_principal: Amount,
    /// Most approved loans an applicant may already hold when a new one
    /// is approved.
    pub max_approved_loans: usize,
    /// Insurance pays out only below this income.
    pub payout_income_ceiling: Amount,
}

impl Default for UnderwritingPolicy {
    fn default() -> Self {
        Self {
            credit_cutoff: 60.0,
            min_income: Amount::from_units(5_000),
            max_loan_principal: Amount::from_units(10_000),
            max_approved_loans: 3,
            payout_income_ceiling: Amount::from_units(10_000),
        }
    }
}
