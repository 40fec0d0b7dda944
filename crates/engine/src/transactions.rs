//! Transaction primitives.
//!
//! A `Transaction` is created when the terminal step of a workflow is
//! committed. It carries a typed payload, is executed by a
//! [`TransactionGateway`](crate::TransactionGateway) and becomes immutable
//! once resolved with an [`Outcome`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Rupiah, aggregates::AggregateRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    LoanApplication,
    InvestmentPledge,
    ContractSignature,
    RentalBooking,
    Repayment,
    AccountCreation,
    AdvisorQuery,
    CropScan,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoanApplication => "LOAN_APPLICATION",
            Self::InvestmentPledge => "INVESTMENT_PLEDGE",
            Self::ContractSignature => "CONTRACT_SIGNATURE",
            Self::RentalBooking => "RENTAL_BOOKING",
            Self::Repayment => "REPAYMENT",
            Self::AccountCreation => "ACCOUNT_CREATION",
            Self::AdvisorQuery => "ADVISOR_QUERY",
            Self::CropScan => "CROP_SCAN",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanScheme {
    /// Profit sharing.
    #[default]
    Syariah,
    Konvensional,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepaymentMethod {
    Cash,
    HarvestInKind,
}

impl RepaymentMethod {
    /// Installment applied when the farmer does not type an amount.
    pub fn default_amount(self) -> Rupiah {
        match self {
            Self::Cash => Rupiah::new(500_000),
            Self::HarvestInKind => Rupiah::new(1_000_000),
        }
    }
}

impl TryFrom<&str> for RepaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "harvest" | "harvest_in_kind" | "in_kind" => Ok(Self::HarvestInKind),
            other => Err(EngineError::validation(
                "method",
                format!("unknown repayment method: {other}"),
            )),
        }
    }
}

/// What a transaction asks the backend to do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Payload {
    LoanApplication {
        amount: Rupiah,
        purpose: String,
        scheme: LoanScheme,
    },
    InvestmentPledge {
        project_id: u32,
        amount: Rupiah,
    },
    ContractSignature {
        contract_id: String,
    },
    RentalBooking {
        unit_id: u32,
        hours: u8,
    },
    Repayment {
        loan_id: String,
        method: RepaymentMethod,
        amount: Rupiah,
    },
    AccountCreation {
        phone: String,
    },
    AdvisorQuery {
        question: String,
    },
    CropScan,
}

impl Payload {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::LoanApplication { .. } => TransactionKind::LoanApplication,
            Self::InvestmentPledge { .. } => TransactionKind::InvestmentPledge,
            Self::ContractSignature { .. } => TransactionKind::ContractSignature,
            Self::RentalBooking { .. } => TransactionKind::RentalBooking,
            Self::Repayment { .. } => TransactionKind::Repayment,
            Self::AccountCreation { .. } => TransactionKind::AccountCreation,
            Self::AdvisorQuery { .. } => TransactionKind::AdvisorQuery,
            Self::CropScan => TransactionKind::CropScan,
        }
    }

    /// The aggregate this payload mutates, if any.
    pub fn target(&self) -> Option<AggregateRef> {
        match self {
            Self::InvestmentPledge { project_id, .. } => Some(AggregateRef::Project(*project_id)),
            Self::ContractSignature { contract_id } => {
                Some(AggregateRef::Contract(contract_id.clone()))
            }
            Self::RentalBooking { unit_id, .. } => Some(AggregateRef::Rental(*unit_id)),
            Self::Repayment { loan_id, .. } => Some(AggregateRef::Loan(loan_id.clone())),
            Self::LoanApplication { .. }
            | Self::AccountCreation { .. }
            | Self::AdvisorQuery { .. }
            | Self::CropScan => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub health: u8,
    pub issue: String,
    pub recommendation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// The backend accepted the request.
    Confirmed { reference: String },
    Reply { text: String },
    Diagnosis(Diagnosis),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
    pub latency_ms: Option<u64>,
    pub outcome: Option<Outcome>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: payload.kind(),
            payload,
            created_at: Utc::now(),
            latency_ms: None,
            outcome: None,
            resolved_at: None,
        }
    }

    pub fn target(&self) -> Option<AggregateRef> {
        self.payload.target()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    /// Records the outcome. A resolved transaction cannot be resolved again.
    pub fn resolve(mut self, outcome: Outcome, latency: Duration) -> ResultEngine<Self> {
        if self.is_resolved() {
            return Err(EngineError::InvalidState(format!(
                "transaction {} already resolved",
                self.id
            )));
        }
        self.latency_ms = Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
        self.outcome = Some(outcome);
        self.resolved_at = Some(Utc::now());
        Ok(self)
    }

    /// Reference issued by the backend for a confirmed transaction.
    pub fn reference(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Confirmed { reference }) => Some(reference.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_payload() {
        let tx = Transaction::new(Payload::RentalBooking {
            unit_id: 3,
            hours: 2,
        });
        assert_eq!(tx.kind, TransactionKind::RentalBooking);
        assert_eq!(tx.target(), Some(AggregateRef::Rental(3)));
        assert!(!tx.is_resolved());
    }

    #[test]
    fn loan_application_has_no_target() {
        let payload = Payload::LoanApplication {
            amount: Rupiah::new(2_000_000),
            purpose: "Pupuk".to_string(),
            scheme: LoanScheme::Syariah,
        };
        assert_eq!(payload.target(), None);
    }

    #[test]
    fn resolve_is_final() {
        let tx = Transaction::new(Payload::CropScan)
            .resolve(
                Outcome::Confirmed {
                    reference: "abc".to_string(),
                },
                Duration::from_millis(1500),
            )
            .unwrap();
        assert_eq!(tx.latency_ms, Some(1500));
        assert_eq!(tx.reference(), Some("abc"));

        let err = tx
            .resolve(
                Outcome::Reply {
                    text: "again".to_string(),
                },
                Duration::ZERO,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn repayment_method_defaults() {
        assert_eq!(
            RepaymentMethod::Cash.default_amount(),
            Rupiah::new(500_000)
        );
        assert_eq!(
            RepaymentMethod::try_from("harvest").unwrap(),
            RepaymentMethod::HarvestInKind
        );
    }
}
