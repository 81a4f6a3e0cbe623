use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount::{Amount, Rate};
use crate::contract_state::ContractState;
use crate::error::CoreError;

/// Why a coin came into existence (or was last touched).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Moved by a loan funding or repayment.
    Loan,
    /// Moved by an insurance premium or payout.
    Insurance,
    /// Plain payment between two owners.
    Transfer,
    /// Value deposited into the system by its owner.
    Deposit,
    /// Remainder returned to the payer by a transfer.
    Change,
    /// Issued by the system itself.
    System,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loan => write!(f, "Loan"),
            Self::Insurance => write!(f, "Insurance"),
            Self::Transfer => write!(f, "Transfer"),
            Self::Deposit => write!(f, "Deposit"),
            Self::Change => write!(f, "Change"),
            Self::System => write!(f, "System"),
        }
    }
}

/// A currency record: the indivisible unit of value transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique within the owner's scope: `"Currency" + owner + timestamp`.
    pub id: String,
    pub amount: Amount,
    pub owner: String,
    pub created_at: i64,
    pub created_via: Provenance,
    pub updated_at: i64,
    pub updated_via: Provenance,
}

impl Coin {
    /// Create a coin whose created/updated stamps are both `timestamp`.
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        amount: Amount,
        via: Provenance,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            owner: owner.into(),
            created_at: timestamp,
            created_via: via,
            updated_at: timestamp,
            updated_via: via,
        }
    }
}

/// The two contract products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    Loan,
    Insurance,
}

impl ContractKind {
    /// Composite-key tag under which contracts of this kind are stored.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Loan => "Loan",
            Self::Insurance => "Insurance",
        }
    }

    /// Provenance stamped on coins moved on behalf of this kind.
    pub fn provenance(&self) -> Provenance {
        match self {
            Self::Loan => Provenance::Loan,
            Self::Insurance => Provenance::Insurance,
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContractKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Loan" => Ok(Self::Loan),
            "Insurance" => Ok(Self::Insurance),
            other => Err(CoreError::UnknownKind(other.to_string())),
        }
    }
}

/// A loan or insurance agreement between an issuer and an applicant.
///
/// `amount`, `issuer`, `rate` and `period_days` never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique within `(applicant, kind)`; supplied by the caller.
    pub business_id: String,
    pub kind: ContractKind,
    /// Principal for a loan, coverage for an insurance.
    pub amount: Amount,
    pub issuer: String,
    pub applicant: String,
    pub rate: Rate,
    /// Loan term in days. `None` for insurance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_days: Option<u32>,
    pub state: ContractState,
    pub created_at: i64,
    pub updated_at: i64,
    /// Contingency details recorded when an insurance claim pays out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contingency: Option<String>,
}

/// Financial signals about an applicant, supplied by the caller at
/// underwriting and claim time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApplicantSignals {
    /// Credit score.
    pub credit: f64,
    pub income: Amount,
}

impl ApplicantSignals {
    pub fn new(credit: f64, income: Amount) -> Self {
        Self { credit, income }
    }
}
