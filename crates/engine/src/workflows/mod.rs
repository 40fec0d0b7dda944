//! The concrete step definitions driven by [`WizardEngine`].
//!
//! Every workflow owns its step list, a draft type and the store mutation
//! applied once its transaction resolves. Validators only read the fields of
//! their own step.
//!
//! [`WizardEngine`]: crate::WizardEngine

mod contract;
mod fields;
mod loan;
mod onboarding;
mod pledge;
mod rental;
mod repayment;

pub use contract::{ContractDraft, ContractSigning};
pub use fields::DraftFields;
pub use loan::{LoanApplication, LoanDraft};
pub use onboarding::{Onboarding, OnboardingDraft};
pub use pledge::{InvestmentPledge, PledgeDraft};
pub use rental::{MAX_RENTAL_HOURS, RentalBooking, RentalDraft};
pub use repayment::{Repayment, RepaymentDraft};

use crate::{EngineError, transactions::Transaction};

fn required(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<(), String> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(format!("unknown {field}: {value}"))
}

/// `transaction` carries a payload some other workflow built.
fn foreign(workflow: &str, transaction: &Transaction) -> EngineError {
    EngineError::InvalidState(format!(
        "{workflow} cannot apply a {} transaction",
        transaction.kind.as_str()
    ))
}
