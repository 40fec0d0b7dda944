//! The asynchronous request → result-or-failure boundary.
//!
//! Workflows only ever talk to a [`TransactionGateway`]; the [`Simulator`]
//! is the in-process implementation, a real backend client can replace it
//! without touching the wizard.
//!
//! [`Simulator`]: crate::Simulator

use crate::{
    ResultEngine,
    transactions::{Outcome, Transaction},
};

#[allow(async_fn_in_trait)]
pub trait TransactionGateway {
    /// Executes `transaction` and returns its outcome.
    ///
    /// Implementations must not mutate aggregates; applying the outcome is
    /// the caller's job.
    async fn execute(&self, transaction: &Transaction) -> ResultEngine<Outcome>;
}

impl<G: TransactionGateway> TransactionGateway for &G {
    async fn execute(&self, transaction: &Transaction) -> ResultEngine<Outcome> {
        (**self).execute(transaction).await
    }
}
