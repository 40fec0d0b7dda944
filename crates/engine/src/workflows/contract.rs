use serde::Serialize;

use super::foreign;
use crate::{
    ResultEngine,
    aggregates::{Aggregates, Contract},
    transactions::{Payload, Transaction},
    wizard::{Step, Workflow, always_valid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContractDraft {
    pub terms_accepted: bool,
}

impl Default for ContractDraft {
    fn default() -> Self {
        Self {
            terms_accepted: true,
        }
    }
}

/// Digital signature of a buyer's contract request.
#[derive(Clone, Debug)]
pub struct ContractSigning {
    pub contract_id: String,
}

impl ContractSigning {
    pub fn new(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
        }
    }
}

const STEPS: &[Step<ContractSigning>] = &[
    Step::new("review", always_valid),
    Step::new("terms", terms),
    Step::new("sign", always_valid),
];

fn terms(_: &ContractSigning, draft: &ContractDraft) -> Result<(), String> {
    if draft.terms_accepted {
        Ok(())
    } else {
        Err("terms must be accepted".to_string())
    }
}

impl Workflow for ContractSigning {
    type Draft = ContractDraft;
    type Output = Contract;

    fn name(&self) -> &'static str {
        "contract"
    }

    fn steps(&self) -> &'static [Step<Self>] {
        STEPS
    }

    fn payload(&self, _: &ContractDraft) -> ResultEngine<Payload> {
        Ok(Payload::ContractSignature {
            contract_id: self.contract_id.clone(),
        })
    }

    fn apply(
        &self,
        _: &ContractDraft,
        transaction: &Transaction,
        aggregates: &mut Aggregates,
    ) -> ResultEngine<Contract> {
        let Payload::ContractSignature { contract_id } = &transaction.payload else {
            return Err(foreign(self.name(), transaction));
        };
        aggregates.apply_contract_signature(contract_id)
    }

    fn success_message(&self, _: &ContractDraft, _: &Contract) -> String {
        "Kontrak Digital Berhasil Ditandatangani & Masuk Blockchain!".to_string()
    }
}
