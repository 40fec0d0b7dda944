use serde::Serialize;

use super::{foreign, one_of};
use crate::{
    ResultEngine, Rupiah,
    aggregates::{Aggregates, LoanAccount},
    catalog,
    transactions::{LoanScheme, Payload, Transaction},
    wizard::{Step, Workflow, always_valid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoanDraft {
    pub amount: Rupiah,
    pub purpose: Option<String>,
    pub scheme: LoanScheme,
}

impl Default for LoanDraft {
    fn default() -> Self {
        Self {
            amount: Rupiah::new(2_000_000),
            purpose: Some("Pupuk".to_string()),
            scheme: LoanScheme::Syariah,
        }
    }
}

/// Working-capital loan request.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoanApplication;

const STEPS: &[Step<LoanApplication>] = &[
    Step::new("amount", amount),
    Step::new("purpose", purpose),
    Step::new("review", always_valid),
];

fn amount(_: &LoanApplication, draft: &LoanDraft) -> Result<(), String> {
    let value = draft.amount.value();
    if !(catalog::LOAN_MIN..=catalog::LOAN_MAX).contains(&value) {
        return Err(format!(
            "amount must be between {} and {}",
            Rupiah::new(catalog::LOAN_MIN),
            Rupiah::new(catalog::LOAN_MAX)
        ));
    }
    if value % catalog::LOAN_STEP != 0 {
        return Err(format!(
            "amount must be a multiple of {}",
            Rupiah::new(catalog::LOAN_STEP)
        ));
    }
    Ok(())
}

fn purpose(_: &LoanApplication, draft: &LoanDraft) -> Result<(), String> {
    match draft.purpose.as_deref() {
        Some(purpose) => one_of(purpose, catalog::LOAN_PURPOSES, "purpose"),
        None => Err("purpose is required".to_string()),
    }
}

impl Workflow for LoanApplication {
    type Draft = LoanDraft;
    type Output = LoanAccount;

    fn name(&self) -> &'static str {
        "loan"
    }

    fn steps(&self) -> &'static [Step<Self>] {
        STEPS
    }

    fn payload(&self, draft: &LoanDraft) -> ResultEngine<Payload> {
        Ok(Payload::LoanApplication {
            amount: draft.amount,
            purpose: draft.purpose.clone().unwrap_or_default(),
            scheme: draft.scheme,
        })
    }

    fn apply(
        &self,
        _: &LoanDraft,
        transaction: &Transaction,
        aggregates: &mut Aggregates,
    ) -> ResultEngine<LoanAccount> {
        let Payload::LoanApplication {
            amount,
            purpose,
            scheme,
        } = &transaction.payload
        else {
            return Err(foreign(self.name(), transaction));
        };
        aggregates.apply_loan_application(*amount, purpose, *scheme, transaction.created_at)
    }

    fn success_message(&self, _: &LoanDraft, _: &LoanAccount) -> String {
        "Pengajuan terkirim! Sistem sedang memverifikasi skor kredit Anda.".to_string()
    }
}
