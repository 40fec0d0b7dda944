//! Ordered-step workflow controller.
//!
//! A [`WizardEngine`] walks one [`Workflow`] from its first step to its
//! terminal step, gating every move on the current step's validator, and on
//! the terminal step submits a [`Transaction`] through the gateway.
//!
//! ```text
//! Editing(0) -> ... -> Editing(last) -> Submitting -> Resolved
//!                            ^               |
//!                            +--- Failed <---+
//! ```
//!
//! `Failed` behaves like `Editing` at the last step: the draft is kept and
//! the caller resubmits explicitly. `Resolved` and `Cancelled` are terminal.
//! Dropping a [`commit`](WizardEngine::commit) future mid-flight also lands
//! in `Failed` and frees the aggregate reservation.

use std::{fmt, time::Duration};

use serde::Serialize;
use tokio::time::Instant;

use crate::{
    EngineError, Notifier, ResultEngine, StateStore, TransactionGateway,
    aggregates::Aggregates,
    notifications::NotificationKind,
    transactions::{Outcome, Payload, Transaction},
};

/// Checks the fields one step owns. Returns a human readable reason on
/// rejection.
pub type Validator<W> = fn(&W, &<W as Workflow>::Draft) -> Result<(), String>;

pub struct Step<W: Workflow> {
    pub name: &'static str,
    validate: Validator<W>,
}

impl<W: Workflow> Step<W> {
    pub const fn new(name: &'static str, validate: Validator<W>) -> Self {
        Self { name, validate }
    }

    pub fn check(&self, workflow: &W, draft: &W::Draft) -> ResultEngine<()> {
        (self.validate)(workflow, draft).map_err(|reason| EngineError::validation(self.name, reason))
    }
}

impl<W: Workflow> fmt::Debug for Step<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// Validator for steps that only display information.
pub fn always_valid<W: Workflow>(_: &W, _: &W::Draft) -> Result<(), String> {
    Ok(())
}

/// One kind of multi-step transaction.
pub trait Workflow: Sized + 'static {
    type Draft: Clone + fmt::Debug + Serialize;
    type Output: Clone + fmt::Debug;

    fn name(&self) -> &'static str;

    /// Ordered steps; the last one is the terminal step.
    fn steps(&self) -> &'static [Step<Self>];

    /// Builds the transaction payload from a fully validated draft.
    fn payload(&self, draft: &Self::Draft) -> ResultEngine<Payload>;

    /// Applies a resolved transaction to the aggregates.
    fn apply(
        &self,
        draft: &Self::Draft,
        transaction: &Transaction,
        aggregates: &mut Aggregates,
    ) -> ResultEngine<Self::Output>;

    fn success_message(&self, draft: &Self::Draft, output: &Self::Output) -> String;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Editing { step: usize },
    Submitting,
    /// Last submission failed; editable at `step`, resubmit explicitly.
    Failed { step: usize },
    Resolved,
    Cancelled,
}

/// What the gateway-facing side of a workflow needs.
#[derive(Clone, Debug)]
pub struct Services<G> {
    pub store: StateStore,
    pub notifier: Notifier,
    pub gateway: G,
}

#[derive(Clone, Debug)]
pub struct Receipt<O> {
    pub transaction: Transaction,
    pub output: O,
}

#[derive(Clone, Debug)]
pub enum Progress<O> {
    Moved { step: usize },
    Committed(Receipt<O>),
}

/// Read-only projection for the presentation layer.
#[derive(Clone, Debug, Serialize)]
pub struct WizardView<D> {
    pub workflow: &'static str,
    pub phase: Phase,
    pub step_index: Option<usize>,
    pub step_name: Option<&'static str>,
    pub step_count: usize,
    pub draft: Option<D>,
    pub error: Option<String>,
}

pub struct WizardEngine<W: Workflow, G> {
    workflow: W,
    draft: Option<W::Draft>,
    phase: Phase,
    services: Services<G>,
    pending: Option<Transaction>,
    inline_error: Option<String>,
}

/// Borrow of an engine with a transaction at the gateway. Dropping it before
/// the outcome is applied abandons the submission.
struct InFlight<'a, W: Workflow, G: TransactionGateway> {
    engine: &'a mut WizardEngine<W, G>,
}

impl<W: Workflow, G: TransactionGateway> Drop for InFlight<'_, W, G> {
    fn drop(&mut self) {
        self.engine.abandon();
    }
}

impl<W, G> fmt::Debug for WizardEngine<W, G>
where
    W: Workflow,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardEngine")
            .field("workflow", &self.workflow.name())
            .field("phase", &self.phase)
            .field("draft", &self.draft)
            .finish()
    }
}

impl<W, G> WizardEngine<W, G>
where
    W: Workflow,
    G: TransactionGateway,
{
    pub fn start(workflow: W, initial: W::Draft, services: Services<G>) -> Self {
        tracing::info!(
            "workflow {} started ({} steps)",
            workflow.name(),
            workflow.steps().len()
        );
        Self {
            workflow,
            draft: Some(initial),
            phase: Phase::Editing { step: 0 },
            services,
            pending: None,
            inline_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn draft(&self) -> Option<&W::Draft> {
        self.draft.as_ref()
    }

    /// The step the user is on, `None` while submitting or once closed.
    pub fn step_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Editing { step } | Phase::Failed { step } => Some(step),
            _ => None,
        }
    }

    pub fn step_count(&self) -> usize {
        self.workflow.steps().len()
    }

    pub fn view(&self) -> WizardView<W::Draft> {
        let step_index = self.step_index();
        WizardView {
            workflow: self.workflow.name(),
            phase: self.phase,
            step_index,
            step_name: step_index
                .and_then(|index| self.workflow.steps().get(index))
                .map(|step| step.name),
            step_count: self.step_count(),
            draft: self.draft.clone(),
            error: self.inline_error.clone(),
        }
    }

    fn editable_step(&self) -> ResultEngine<usize> {
        match self.phase {
            Phase::Editing { step } | Phase::Failed { step } => Ok(step),
            Phase::Submitting => Err(EngineError::Busy),
            Phase::Resolved | Phase::Cancelled => Err(EngineError::Closed),
        }
    }

    fn last_step(&self) -> usize {
        self.step_count().saturating_sub(1)
    }

    fn check_step(&self, index: usize) -> ResultEngine<()> {
        let draft = self.draft.as_ref().ok_or(EngineError::Closed)?;
        match self.workflow.steps().get(index) {
            Some(step) => step.check(&self.workflow, draft),
            None => Err(EngineError::InvalidState(format!(
                "{} has no step {index}",
                self.workflow.name()
            ))),
        }
    }

    /// Merges `patch` into the draft. Never moves between steps.
    pub fn update_draft<F>(&mut self, patch: F) -> ResultEngine<()>
    where
        F: FnOnce(&mut W::Draft),
    {
        self.editable_step()?;
        let draft = self.draft.as_mut().ok_or(EngineError::Closed)?;
        patch(draft);
        self.inline_error = None;
        Ok(())
    }

    /// Validates the current step and moves forward; on the terminal step
    /// this is the same as [`commit`](Self::commit).
    pub async fn advance(&mut self) -> ResultEngine<Progress<W::Output>> {
        self.advance_with(|_| Ok(())).await
    }

    /// [`advance`](Self::advance) with a `persist` hook for the terminal
    /// step, see [`commit_with`](Self::commit_with).
    pub async fn advance_with<P>(&mut self, persist: P) -> ResultEngine<Progress<W::Output>>
    where
        P: FnOnce(&W::Output) -> ResultEngine<()>,
    {
        let step = self.editable_step()?;
        if let Err(err) = self.check_step(step) {
            tracing::debug!("{}: step {step} rejected: {err}", self.workflow.name());
            self.inline_error = Some(err.to_string());
            return Err(err);
        }
        self.inline_error = None;

        if step >= self.last_step() {
            return self.commit_with(persist).await.map(Progress::Committed);
        }

        let next = step + 1;
        self.phase = Phase::Editing { step: next };
        tracing::debug!("{}: moved to step {next}", self.workflow.name());
        Ok(Progress::Moved { step: next })
    }

    /// Moves one step back. At the first step this is a no-op reported as
    /// [`EngineError::Boundary`].
    pub fn back(&mut self) -> ResultEngine<usize> {
        let step = self.editable_step()?;
        if step == 0 {
            return Err(EngineError::Boundary);
        }
        let previous = step - 1;
        self.phase = Phase::Editing { step: previous };
        self.inline_error = None;
        tracing::debug!("{}: back to step {previous}", self.workflow.name());
        Ok(previous)
    }

    /// Discards the draft and closes the workflow.
    pub fn cancel(&mut self) -> ResultEngine<()> {
        self.editable_step()?;
        self.draft = None;
        self.inline_error = None;
        self.phase = Phase::Cancelled;
        tracing::info!("workflow {} cancelled", self.workflow.name());
        Ok(())
    }

    /// First half of [`commit`](Self::commit): validates every step, reserves
    /// the target aggregate and enters `Submitting`.
    pub async fn begin_commit(&mut self) -> ResultEngine<Transaction> {
        let step = self.editable_step()?;
        let last = self.last_step();
        if step != last {
            return Err(EngineError::InvalidState(format!(
                "commit is only allowed from the last step (at {} of {})",
                step + 1,
                last + 1
            )));
        }
        for index in 0..=last {
            if let Err(err) = self.check_step(index) {
                self.inline_error = Some(err.to_string());
                return Err(err);
            }
        }

        let draft = self.draft.as_ref().ok_or(EngineError::Closed)?;
        let transaction = Transaction::new(self.workflow.payload(draft)?);
        if let Some(target) = transaction.target() {
            let reserved = self
                .services
                .store
                .update(|aggregates| aggregates.reserve(target))
                .await;
            if let Err(err) = reserved {
                tracing::warn!("{}: commit rejected: {err}", self.workflow.name());
                self.services.notifier.error(err.to_string()).await;
                return Err(err);
            }
        }

        tracing::info!(
            "{}: submitting {} {}",
            self.workflow.name(),
            transaction.kind.as_str(),
            transaction.id
        );
        self.phase = Phase::Submitting;
        self.pending = Some(transaction.clone());
        Ok(transaction)
    }

    /// Second half of [`commit`](Self::commit): releases the reservation,
    /// applies the outcome and publishes a notification. Any failure lands in
    /// `Failed` at the last step.
    pub async fn complete_commit(
        &mut self,
        result: ResultEngine<Outcome>,
        latency: Duration,
    ) -> ResultEngine<Receipt<W::Output>> {
        self.finish(result, latency, |_| Ok(())).await
    }

    async fn finish<P>(
        &mut self,
        result: ResultEngine<Outcome>,
        latency: Duration,
        persist: P,
    ) -> ResultEngine<Receipt<W::Output>>
    where
        P: FnOnce(&W::Output) -> ResultEngine<()>,
    {
        if self.phase != Phase::Submitting || self.pending.is_none() {
            return Err(EngineError::InvalidState(
                "no transaction in flight".to_string(),
            ));
        }
        let last = self.last_step();

        // The pending transaction is only taken under the store lock, so a
        // drop while waiting for the lock still finds it to release.
        let workflow = &self.workflow;
        let draft = self.draft.as_ref();
        let pending = &mut self.pending;
        let applied = self
            .services
            .store
            .update(|aggregates: &mut Aggregates| -> ResultEngine<(Transaction, W::Output, String)> {
                let transaction = pending.take().ok_or_else(|| {
                    EngineError::InvalidState("no transaction in flight".to_string())
                })?;
                if let Some(target) = transaction.target() {
                    aggregates.release(&target);
                }
                let draft = draft.ok_or(EngineError::Closed)?;
                let transaction = transaction.resolve(result?, latency)?;
                let output = workflow.apply(draft, &transaction, aggregates)?;
                let message = workflow.success_message(draft, &output);
                Ok((transaction, output, message))
            })
            .await
            .and_then(|(transaction, output, message)| {
                persist(&output)?;
                Ok((transaction, output, message))
            });

        match applied {
            Ok((transaction, output, message)) => {
                self.phase = Phase::Resolved;
                self.draft = None;
                tracing::info!(
                    "{}: {} resolved in {}ms",
                    self.workflow.name(),
                    transaction.id,
                    transaction.latency_ms.unwrap_or_default()
                );
                self.services.notifier.success(message).await;
                Ok(Receipt {
                    transaction,
                    output,
                })
            }
            Err(err) => {
                tracing::warn!("{}: submission failed: {err}", self.workflow.name());
                self.phase = Phase::Failed { step: last };
                self.services.notifier.error(err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Submits the draft through the gateway and applies the outcome.
    ///
    /// No automatic retry: after a failure the caller must call `commit`
    /// again.
    pub async fn commit(&mut self) -> ResultEngine<Receipt<W::Output>> {
        self.commit_with(|_| Ok(())).await
    }

    /// [`commit`](Self::commit) that runs `persist` on the output before the
    /// workflow resolves. A `persist` error is handled like a failed
    /// submission: the draft stays and the wizard waits in `Failed`.
    pub async fn commit_with<P>(&mut self, persist: P) -> ResultEngine<Receipt<W::Output>>
    where
        P: FnOnce(&W::Output) -> ResultEngine<()>,
    {
        let transaction = self.begin_commit().await?;
        let mut in_flight = InFlight { engine: self };
        let started = Instant::now();
        let result = in_flight.engine.services.gateway.execute(&transaction).await;
        let receipt = in_flight
            .engine
            .finish(result, started.elapsed(), persist)
            .await;
        drop(in_flight);
        receipt
    }

    /// Leaves `Submitting` for `Failed` at the last step when the submission
    /// was dropped before its outcome was applied.
    fn abandon(&mut self) {
        if self.phase != Phase::Submitting {
            return;
        }
        let last = self.last_step();
        self.phase = Phase::Failed { step: last };
        let message = "submission interrupted before it resolved";
        self.inline_error = Some(message.to_string());
        if let Some(target) = self.pending.take().and_then(|transaction| transaction.target()) {
            self.services.store.release_detached(target);
        }
        tracing::warn!("{}: {message}", self.workflow.name());
        self.services
            .notifier
            .push_detached(message, NotificationKind::Error);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Clone, Debug, Default, Serialize)]
    struct Form {
        fields: [Option<String>; 5],
    }

    fn filled(draft: &Form, index: usize) -> Result<(), String> {
        match draft.fields.get(index) {
            Some(Some(value)) if !value.trim().is_empty() => Ok(()),
            _ => Err(format!("field {index} is required")),
        }
    }

    fn first(_: &Checklist, d: &Form) -> Result<(), String> {
        filled(d, 0)
    }
    fn second(_: &Checklist, d: &Form) -> Result<(), String> {
        filled(d, 1)
    }
    fn third(_: &Checklist, d: &Form) -> Result<(), String> {
        filled(d, 2)
    }
    fn fourth(_: &Checklist, d: &Form) -> Result<(), String> {
        filled(d, 3)
    }
    fn fifth(_: &Checklist, d: &Form) -> Result<(), String> {
        filled(d, 4)
    }

    const STEPS: &[Step<Checklist>] = &[
        Step::new("first", first),
        Step::new("second", second),
        Step::new("third", third),
        Step::new("fourth", fourth),
        Step::new("fifth", fifth),
    ];

    struct Checklist {
        len: usize,
    }

    impl Workflow for Checklist {
        type Draft = Form;
        type Output = usize;

        fn name(&self) -> &'static str {
            "checklist"
        }

        fn steps(&self) -> &'static [Step<Self>] {
            &STEPS[..self.len]
        }

        fn payload(&self, _: &Form) -> ResultEngine<Payload> {
            Ok(Payload::CropScan)
        }

        fn apply(&self, draft: &Form, _: &Transaction, _: &mut Aggregates) -> ResultEngine<usize> {
            Ok(draft.fields.iter().flatten().count())
        }

        fn success_message(&self, _: &Form, output: &usize) -> String {
            format!("{output} fields saved")
        }
    }

    #[derive(Clone, Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    impl TransactionGateway for Counting {
        async fn execute(&self, _: &Transaction) -> ResultEngine<Outcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(EngineError::TransactionFailed("offline".to_string()));
            }
            Ok(Outcome::Confirmed {
                reference: "ok".to_string(),
            })
        }
    }

    fn services(gateway: Counting) -> Services<Counting> {
        Services {
            store: StateStore::default(),
            notifier: Notifier::default(),
            gateway,
        }
    }

    fn complete_form() -> Form {
        Form {
            fields: std::array::from_fn(|i| Some(format!("value {i}"))),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn n_advances_commit_exactly_once() {
        for len in 1..=5 {
            let gateway = Counting::default();
            let mut wizard =
                WizardEngine::start(Checklist { len }, complete_form(), services(gateway.clone()));

            for step in 1..len {
                let progress = wizard.advance().await.unwrap();
                assert!(matches!(progress, Progress::Moved { step: s } if s == step));
            }
            let progress = wizard.advance().await.unwrap();
            assert!(matches!(progress, Progress::Committed(Receipt { output: 5, .. })));
            assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

            assert_eq!(wizard.advance().await.unwrap_err(), EngineError::Closed);
            assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
            assert_eq!(wizard.phase(), Phase::Resolved);
            assert!(wizard.draft().is_none());
        }
    }

    #[tokio::test]
    async fn back_at_first_step_is_a_noop() {
        let mut wizard =
            WizardEngine::start(Checklist { len: 3 }, Form::default(), services(Counting::default()));
        assert_eq!(wizard.back().unwrap_err(), EngineError::Boundary);
        assert_eq!(wizard.phase(), Phase::Editing { step: 0 });
        assert_eq!(wizard.back().unwrap_err(), EngineError::Boundary);
        assert_eq!(wizard.step_index(), Some(0));
    }

    #[tokio::test]
    async fn validation_only_looks_at_current_step() {
        let mut wizard =
            WizardEngine::start(Checklist { len: 3 }, Form::default(), services(Counting::default()));

        let err = wizard.advance().await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation {
                step: "first",
                reason: "field 0 is required".to_string()
            }
        );
        assert_eq!(wizard.step_index(), Some(0));
        assert!(wizard.view().error.is_some());

        wizard
            .update_draft(|d| d.fields[0] = Some("Budi".to_string()))
            .unwrap();
        assert!(wizard.view().error.is_none());
        wizard.advance().await.unwrap();
        assert_eq!(wizard.back().unwrap(), 0);
        wizard.advance().await.unwrap();
        assert_eq!(wizard.view().step_name, Some("second"));
    }

    #[tokio::test]
    async fn update_draft_never_advances() {
        let mut wizard =
            WizardEngine::start(Checklist { len: 2 }, Form::default(), services(Counting::default()));
        for i in 0..5 {
            wizard
                .update_draft(|d| d.fields[i] = Some("x".to_string()))
                .unwrap();
        }
        assert_eq!(wizard.step_index(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn submitting_rejects_navigation() {
        let gateway = Counting::default();
        let mut wizard =
            WizardEngine::start(Checklist { len: 1 }, complete_form(), services(gateway.clone()));

        wizard.begin_commit().await.unwrap();
        assert_eq!(wizard.phase(), Phase::Submitting);
        assert_eq!(wizard.cancel().unwrap_err(), EngineError::Busy);
        assert_eq!(wizard.back().unwrap_err(), EngineError::Busy);
        assert_eq!(wizard.advance().await.unwrap_err(), EngineError::Busy);
        assert_eq!(wizard.commit().await.unwrap_err(), EngineError::Busy);
        assert_eq!(
            wizard.update_draft(|d| d.fields[0] = None).unwrap_err(),
            EngineError::Busy
        );
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert!(wizard.draft().is_some());

        let receipt = wizard
            .complete_commit(
                Ok(Outcome::Confirmed {
                    reference: "r".to_string(),
                }),
                Duration::from_millis(5),
            )
            .await
            .unwrap();
        assert_eq!(receipt.transaction.latency_ms, Some(5));
        assert_eq!(wizard.phase(), Phase::Resolved);
    }

    #[tokio::test]
    async fn cancel_discards_draft() {
        let shared = services(Counting::default());
        let mut wizard = WizardEngine::start(Checklist { len: 3 }, complete_form(), shared.clone());
        wizard.advance().await.unwrap();
        wizard.cancel().unwrap();
        assert!(wizard.draft().is_none());
        assert_eq!(wizard.phase(), Phase::Cancelled);
        assert_eq!(wizard.cancel().unwrap_err(), EngineError::Closed);

        let fresh = WizardEngine::start(Checklist { len: 3 }, Form::default(), shared);
        assert_eq!(fresh.step_index(), Some(0));
        assert!(fresh.draft().unwrap().fields.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn commit_only_from_last_step() {
        let mut wizard =
            WizardEngine::start(Checklist { len: 3 }, complete_form(), services(Counting::default()));
        let err = wizard.commit().await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(wizard.phase(), Phase::Editing { step: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn commit_revalidates_earlier_steps() {
        let gateway = Counting::default();
        let mut wizard =
            WizardEngine::start(Checklist { len: 2 }, complete_form(), services(gateway.clone()));
        wizard.advance().await.unwrap();
        wizard.update_draft(|d| d.fields[0] = None).unwrap();

        let err = wizard.commit().await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { step: "first", .. }));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert_eq!(wizard.step_index(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_returns_to_last_step_and_allows_resubmit() {
        let gateway = Counting::default();
        gateway.fail.store(true, Ordering::SeqCst);
        let shared = services(gateway.clone());
        let mut wizard = WizardEngine::start(Checklist { len: 2 }, complete_form(), shared.clone());
        wizard.advance().await.unwrap();

        let err = wizard.advance().await.unwrap_err();
        assert_eq!(err, EngineError::TransactionFailed("offline".to_string()));
        assert_eq!(wizard.phase(), Phase::Failed { step: 1 });
        let notification = shared.notifier.active().await.unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert!(wizard.draft().is_some());

        gateway.fail.store(false, Ordering::SeqCst);
        let receipt = wizard.commit().await.unwrap();
        assert_eq!(receipt.output, 5);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            shared.notifier.active().await.unwrap().message,
            "5 fields saved"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_commit_lands_in_failed() {
        let gateway = Counting::default();
        let shared = services(gateway.clone());
        let mut wizard = WizardEngine::start(Checklist { len: 2 }, complete_form(), shared.clone());
        wizard.advance().await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(10), wizard.commit()).await;
        assert!(timed_out.is_err());
        assert_eq!(wizard.phase(), Phase::Failed { step: 1 });
        assert!(wizard.view().error.is_some());
        assert_eq!(
            shared.notifier.active().await.unwrap().kind,
            NotificationKind::Error
        );

        let receipt = wizard.commit().await.unwrap();
        assert_eq!(receipt.output, 5);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persist_error_keeps_draft_for_resubmit() {
        let shared = services(Counting::default());
        let mut wizard = WizardEngine::start(Checklist { len: 1 }, complete_form(), shared.clone());

        let err = wizard
            .commit_with(|_| Err(EngineError::TransactionFailed("disk full".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::TransactionFailed("disk full".to_string()));
        assert_eq!(wizard.phase(), Phase::Failed { step: 0 });
        assert!(wizard.draft().is_some());
        assert_eq!(
            shared.notifier.active().await.unwrap().kind,
            NotificationKind::Error
        );

        let mut saved = None;
        wizard
            .commit_with(|output| {
                saved = Some(*output);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(saved, Some(5));
        assert_eq!(wizard.phase(), Phase::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_phase_can_go_back() {
        let gateway = Counting::default();
        gateway.fail.store(true, Ordering::SeqCst);
        let mut wizard =
            WizardEngine::start(Checklist { len: 2 }, complete_form(), services(gateway));
        wizard.advance().await.unwrap();
        assert!(wizard.advance().await.is_err());
        assert_eq!(wizard.back().unwrap(), 0);
        assert_eq!(wizard.phase(), Phase::Editing { step: 0 });
    }
}
