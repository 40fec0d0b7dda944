use serde::Serialize;

use super::foreign;
use crate::{
    EngineError, ResultEngine, Rupiah,
    aggregates::{Aggregates, InvestmentProject},
    transactions::{Payload, Transaction},
    wizard::{Step, Workflow, always_valid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PledgeDraft {
    pub amount: Rupiah,
}

impl Default for PledgeDraft {
    fn default() -> Self {
        Self {
            amount: Rupiah::new(50_000),
        }
    }
}

/// Peer funding of another farmer's project.
///
/// `remaining` is what the project still needed when the workflow started;
/// the amount step caps pledges at that value.
#[derive(Clone, Copy, Debug)]
pub struct InvestmentPledge {
    pub project_id: u32,
    pub remaining: Rupiah,
}

impl InvestmentPledge {
    pub fn for_project(aggregates: &Aggregates, project_id: u32) -> ResultEngine<Self> {
        let project = aggregates
            .project(project_id)
            .ok_or_else(|| EngineError::NotFound(format!("project {project_id}")))?;
        Ok(Self {
            project_id,
            remaining: project.remaining(),
        })
    }
}

const STEPS: &[Step<InvestmentPledge>] = &[
    Step::new("amount", amount),
    Step::new("confirm", always_valid),
];

fn amount(workflow: &InvestmentPledge, draft: &PledgeDraft) -> Result<(), String> {
    if !draft.amount.is_positive() {
        return Err("pledge must be greater than zero".to_string());
    }
    if draft.amount > workflow.remaining {
        return Err(format!(
            "pledge exceeds what the project still needs ({})",
            workflow.remaining
        ));
    }
    Ok(())
}

impl Workflow for InvestmentPledge {
    type Draft = PledgeDraft;
    type Output = InvestmentProject;

    fn name(&self) -> &'static str {
        "pledge"
    }

    fn steps(&self) -> &'static [Step<Self>] {
        STEPS
    }

    fn payload(&self, draft: &PledgeDraft) -> ResultEngine<Payload> {
        Ok(Payload::InvestmentPledge {
            project_id: self.project_id,
            amount: draft.amount,
        })
    }

    fn apply(
        &self,
        _: &PledgeDraft,
        transaction: &Transaction,
        aggregates: &mut Aggregates,
    ) -> ResultEngine<InvestmentProject> {
        let Payload::InvestmentPledge { project_id, amount } = &transaction.payload else {
            return Err(foreign(self.name(), transaction));
        };
        aggregates.apply_investment_pledge(*project_id, *amount)
    }

    fn success_message(&self, draft: &PledgeDraft, _: &InvestmentProject) -> String {
        format!(
            "Investasi {} berhasil! Terima kasih telah membantu petani lain.",
            draft.amount
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_project_reads_remaining() {
        let aggregates = Aggregates::seeded();
        let pledge = InvestmentPledge::for_project(&aggregates, 1).unwrap();
        assert_eq!(pledge.remaining, Rupiah::new(1_500_000));
        assert!(matches!(
            InvestmentPledge::for_project(&aggregates, 7),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn amount_is_capped_by_remaining() {
        let pledge = InvestmentPledge {
            project_id: 1,
            remaining: Rupiah::new(100_000),
        };
        let mut draft = PledgeDraft::default();
        assert!(amount(&pledge, &draft).is_ok());
        draft.amount = Rupiah::new(100_000);
        assert!(amount(&pledge, &draft).is_ok());
        draft.amount = Rupiah::new(100_001);
        assert!(amount(&pledge, &draft).is_err());
        draft.amount = Rupiah::ZERO;
        assert!(amount(&pledge, &draft).is_err());
    }

    #[test]
    fn success_message_formats_amount() {
        let pledge = InvestmentPledge {
            project_id: 1,
            remaining: Rupiah::new(1_500_000),
        };
        let project = Aggregates::seeded().project(1).cloned().unwrap();
        assert_eq!(
            pledge.success_message(&PledgeDraft::default(), &project),
            "Investasi Rp 50.000 berhasil! Terima kasih telah membantu petani lain."
        );
    }
}
