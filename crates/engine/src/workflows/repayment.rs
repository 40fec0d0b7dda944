use serde::Serialize;

use super::foreign;
use crate::{
    ResultEngine, Rupiah,
    aggregates::{Aggregates, LoanAccount},
    transactions::{Payload, RepaymentMethod, Transaction},
    wizard::{Step, Workflow, always_valid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepaymentDraft {
    pub method: Option<RepaymentMethod>,
    /// Falls back to the method's default installment when unset.
    pub amount: Option<Rupiah>,
}

impl Default for RepaymentDraft {
    fn default() -> Self {
        Self {
            method: Some(RepaymentMethod::Cash),
            amount: None,
        }
    }
}

impl RepaymentDraft {
    pub fn effective_amount(&self) -> Option<Rupiah> {
        self.amount
            .or_else(|| self.method.map(RepaymentMethod::default_amount))
    }
}

#[derive(Clone, Debug)]
pub struct Repayment {
    pub loan_id: String,
}

impl Repayment {
    pub fn new(loan_id: impl Into<String>) -> Self {
        Self {
            loan_id: loan_id.into(),
        }
    }
}

const STEPS: &[Step<Repayment>] = &[
    Step::new("method", method),
    Step::new("confirm", always_valid),
];

fn method(_: &Repayment, draft: &RepaymentDraft) -> Result<(), String> {
    if draft.method.is_none() {
        return Err("payment method is required".to_string());
    }
    match draft.effective_amount() {
        Some(amount) if amount.is_positive() => Ok(()),
        _ => Err("amount must be greater than zero".to_string()),
    }
}

impl Workflow for Repayment {
    type Draft = RepaymentDraft;
    type Output = LoanAccount;

    fn name(&self) -> &'static str {
        "repayment"
    }

    fn steps(&self) -> &'static [Step<Self>] {
        STEPS
    }

    fn payload(&self, draft: &RepaymentDraft) -> ResultEngine<Payload> {
        let method = draft.method.unwrap_or(RepaymentMethod::Cash);
        Ok(Payload::Repayment {
            loan_id: self.loan_id.clone(),
            method,
            amount: draft.amount.unwrap_or(method.default_amount()),
        })
    }

    fn apply(
        &self,
        _: &RepaymentDraft,
        transaction: &Transaction,
        aggregates: &mut Aggregates,
    ) -> ResultEngine<LoanAccount> {
        let Payload::Repayment {
            loan_id,
            method,
            amount,
        } = &transaction.payload
        else {
            return Err(foreign(self.name(), transaction));
        };
        aggregates.apply_repayment(loan_id, *method, *amount)
    }

    fn success_message(&self, draft: &RepaymentDraft, _: &LoanAccount) -> String {
        match draft.method {
            Some(RepaymentMethod::HarvestInKind) => {
                "Pengajuan bayar dengan panen (In-Kind) diproses.".to_string()
            }
            _ => "Pembayaran tunai diterima.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_amount_follows_method() {
        let mut draft = RepaymentDraft::default();
        assert_eq!(draft.effective_amount(), Some(Rupiah::new(500_000)));
        draft.method = Some(RepaymentMethod::HarvestInKind);
        assert_eq!(draft.effective_amount(), Some(Rupiah::new(1_000_000)));
        draft.amount = Some(Rupiah::new(750_000));
        assert_eq!(draft.effective_amount(), Some(Rupiah::new(750_000)));
    }

    #[test]
    fn method_step_requires_method_and_positive_amount() {
        let repayment = Repayment::new("L-2024001");
        let mut draft = RepaymentDraft {
            method: None,
            amount: None,
        };
        assert!(method(&repayment, &draft).is_err());
        draft.method = Some(RepaymentMethod::Cash);
        assert!(method(&repayment, &draft).is_ok());
        draft.amount = Some(Rupiah::ZERO);
        assert!(method(&repayment, &draft).is_err());
    }

    #[test]
    fn apply_floors_remaining() {
        let mut aggregates = Aggregates::seeded();
        let repayment = Repayment::new("L-2024001");
        let draft = RepaymentDraft {
            method: Some(RepaymentMethod::HarvestInKind),
            amount: Some(Rupiah::new(3_000_000)),
        };
        let tx = Transaction::new(repayment.payload(&draft).unwrap());
        let loan = repayment.apply(&draft, &tx, &mut aggregates).unwrap();
        assert_eq!(loan.remaining, Rupiah::ZERO);
    }
}
