//! Top-level session state.
//!
//! ```text
//! Unauthenticated --resume (no agroUser)--> Onboarding --signup--> Authenticated
//!        ^     \--resume (agroUser)--------------------------------^     |
//!        +--------------------------- logout ----------------------------+
//! ```
//!
//! The controller owns at most one [`ActiveWorkflow`] at a time and forwards
//! the presentation layer's events to it. Resolved and cancelled workflows
//! are disposed immediately.

use std::fmt;

use serde::Serialize;

use crate::{
    EngineError, Notifier, ResultEngine, StateStore, TransactionGateway, catalog,
    advisor::{self, AdvisorChat, ChatMessage},
    aggregates::{Contract, FarmTask, InvestmentProject, LoanAccount, RentalUnit},
    identity::Identity,
    storage::{KeyValueStore, USER_KEY},
    transactions::{Diagnosis, Transaction},
    wizard::{Phase, Progress, Receipt, Services, WizardEngine, WizardView},
    workflows::{
        ContractDraft, ContractSigning, DraftFields, InvestmentPledge, LoanApplication, LoanDraft,
        Onboarding, OnboardingDraft, PledgeDraft, RentalBooking, RentalDraft, Repayment,
        RepaymentDraft,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Unauthenticated,
    Onboarding,
    Authenticated,
}

/// What the presentation layer asks to start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowRequest {
    Onboarding,
    Loan,
    Pledge { project_id: u32 },
    Contract { contract_id: String },
    Rental { unit_id: u32 },
    Repayment { loan_id: String },
}

impl WorkflowRequest {
    fn required_mode(&self) -> Mode {
        match self {
            Self::Onboarding => Mode::Onboarding,
            _ => Mode::Authenticated,
        }
    }
}

#[derive(Debug)]
pub enum ActiveWorkflow<G> {
    Onboarding(WizardEngine<Onboarding, G>),
    Loan(WizardEngine<LoanApplication, G>),
    Pledge(WizardEngine<InvestmentPledge, G>),
    Contract(WizardEngine<ContractSigning, G>),
    Rental(WizardEngine<RentalBooking, G>),
    Repayment(WizardEngine<Repayment, G>),
}

/// Runs `$body` against whichever engine is active. The two-binding form
/// also binds the constructor that wraps that workflow's output.
macro_rules! with_engine {
    ($active:expr, |$engine:ident| $body:expr) => {
        match $active {
            ActiveWorkflow::Onboarding($engine) => $body,
            ActiveWorkflow::Loan($engine) => $body,
            ActiveWorkflow::Pledge($engine) => $body,
            ActiveWorkflow::Contract($engine) => $body,
            ActiveWorkflow::Rental($engine) => $body,
            ActiveWorkflow::Repayment($engine) => $body,
        }
    };
    ($active:expr, |$engine:ident, $wrap:ident| $body:expr) => {
        match $active {
            ActiveWorkflow::Onboarding($engine) => {
                let $wrap = Committed::SignedUp;
                $body
            }
            ActiveWorkflow::Loan($engine) => {
                let $wrap = Committed::LoanOpened;
                $body
            }
            ActiveWorkflow::Pledge($engine) => {
                let $wrap = Committed::Pledged;
                $body
            }
            ActiveWorkflow::Contract($engine) => {
                let $wrap = Committed::ContractSigned;
                $body
            }
            ActiveWorkflow::Rental($engine) => {
                let $wrap = Committed::RentalBooked;
                $body
            }
            ActiveWorkflow::Repayment($engine) => {
                let $wrap = Committed::Repaid;
                $body
            }
        }
    };
}

/// The aggregate (or identity) a resolved workflow produced.
#[derive(Clone, Debug)]
pub enum Committed {
    SignedUp(Identity),
    LoanOpened(LoanAccount),
    Pledged(InvestmentProject),
    ContractSigned(Contract),
    RentalBooked(RentalUnit),
    Repaid(LoanAccount),
}

#[derive(Clone, Debug)]
pub enum SessionEvent {
    Moved {
        step: usize,
    },
    Committed {
        transaction: Transaction,
        output: Committed,
    },
}

impl SessionEvent {
    fn settle<O>(progress: Progress<O>, wrap: fn(O) -> Committed) -> Self {
        match progress {
            Progress::Moved { step } => Self::Moved { step },
            Progress::Committed(receipt) => Self::committed(receipt, wrap),
        }
    }

    fn committed<O>(receipt: Receipt<O>, wrap: fn(O) -> Committed) -> Self {
        Self::Committed {
            transaction: receipt.transaction,
            output: wrap(receipt.output),
        }
    }
}

fn erase<D: Serialize>(view: WizardView<D>) -> ResultEngine<WizardView<serde_json::Value>> {
    let draft = view.draft.map(serde_json::to_value).transpose()?;
    Ok(WizardView {
        workflow: view.workflow,
        phase: view.phase,
        step_index: view.step_index,
        step_name: view.step_name,
        step_count: view.step_count,
        draft,
        error: view.error,
    })
}

fn no_active_workflow() -> EngineError {
    EngineError::InvalidState("no active workflow".to_string())
}

fn patch<W, G>(engine: &mut WizardEngine<W, G>, field: &str, value: &str) -> ResultEngine<()>
where
    W: crate::Workflow,
    W::Draft: DraftFields,
    G: TransactionGateway,
{
    let mut draft = engine.draft().cloned().ok_or(EngineError::Closed)?;
    draft.set_field(field, value)?;
    engine.update_draft(|current| *current = draft)
}

/// Writes what must outlive the workflow before it resolves: a new account
/// becomes the stored user.
fn remember<S: KeyValueStore>(storage: &mut S, output: &Committed) -> ResultEngine<()> {
    if let Committed::SignedUp(identity) = output {
        storage.set(USER_KEY, identity.to_json()?)?;
    }
    Ok(())
}

pub struct SessionController<S, G> {
    mode: Mode,
    identity: Option<Identity>,
    storage: S,
    services: Services<G>,
    active: Option<ActiveWorkflow<G>>,
    advisor: AdvisorChat,
}

impl<S, G> fmt::Debug for SessionController<S, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("mode", &self.mode)
            .field("identity", &self.identity)
            .field("active", &self.active.is_some())
            .finish()
    }
}

impl<S, G> SessionController<S, G>
where
    S: KeyValueStore,
    G: TransactionGateway + Clone,
{
    pub fn new(storage: S, services: Services<G>) -> Self {
        Self {
            mode: Mode::Unauthenticated,
            identity: None,
            storage,
            services,
            active: None,
            advisor: AdvisorChat::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn store(&self) -> &StateStore {
        &self.services.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.services.notifier
    }

    pub fn advisor(&self) -> &AdvisorChat {
        &self.advisor
    }

    pub fn active(&self) -> Option<&ActiveWorkflow<G>> {
        self.active.as_ref()
    }

    fn require(&self, mode: Mode) -> ResultEngine<()> {
        if self.mode == mode {
            return Ok(());
        }
        Err(EngineError::InvalidState(format!(
            "session is {:?}, expected {mode:?}",
            self.mode
        )))
    }

    fn active_engine(&mut self) -> ResultEngine<&mut ActiveWorkflow<G>> {
        self.active.as_mut().ok_or_else(no_active_workflow)
    }

    /// Leaves the splash screen: a stored identity skips onboarding.
    pub fn resume(&mut self) -> ResultEngine<Mode> {
        self.require(Mode::Unauthenticated)?;
        match self.storage.get(USER_KEY)? {
            Some(raw) => {
                let identity = Identity::from_json(&raw)?;
                tracing::info!("session resumed for {}", identity.name);
                self.identity = Some(identity);
                self.mode = Mode::Authenticated;
            }
            None => {
                tracing::info!("no stored user, starting onboarding");
                self.mode = Mode::Onboarding;
            }
        }
        Ok(self.mode)
    }

    /// Clears the identity and returns to the splash screen.
    pub fn logout(&mut self) -> ResultEngine<()> {
        self.require(Mode::Authenticated)?;
        if let Some(active) = &self.active {
            let phase = with_engine!(active, |engine| engine.phase());
            if phase == Phase::Submitting {
                return Err(EngineError::Busy);
            }
        }
        self.storage.remove(USER_KEY)?;
        self.active = None;
        self.identity = None;
        self.advisor = AdvisorChat::default();
        self.mode = Mode::Unauthenticated;
        tracing::info!("logged out");
        Ok(())
    }

    pub async fn start(&mut self, request: WorkflowRequest) -> ResultEngine<()> {
        if self.active.is_some() {
            return Err(EngineError::InvalidState(
                "another workflow is already active".to_string(),
            ));
        }
        self.require(request.required_mode())?;

        let services = self.services.clone();
        let active = match request {
            WorkflowRequest::Onboarding => ActiveWorkflow::Onboarding(WizardEngine::start(
                Onboarding,
                OnboardingDraft::default(),
                services,
            )),
            WorkflowRequest::Loan => ActiveWorkflow::Loan(WizardEngine::start(
                LoanApplication,
                LoanDraft::default(),
                services,
            )),
            WorkflowRequest::Pledge { project_id } => {
                let workflow = self
                    .services
                    .store
                    .read(|aggregates| InvestmentPledge::for_project(aggregates, project_id))
                    .await?;
                ActiveWorkflow::Pledge(WizardEngine::start(
                    workflow,
                    PledgeDraft::default(),
                    services,
                ))
            }
            WorkflowRequest::Contract { contract_id } => ActiveWorkflow::Contract(
                WizardEngine::start(ContractSigning::new(contract_id), ContractDraft::default(), services),
            ),
            WorkflowRequest::Rental { unit_id } => ActiveWorkflow::Rental(WizardEngine::start(
                RentalBooking { unit_id },
                RentalDraft::default(),
                services,
            )),
            WorkflowRequest::Repayment { loan_id } => ActiveWorkflow::Repayment(
                WizardEngine::start(Repayment::new(loan_id), RepaymentDraft::default(), services),
            ),
        };
        self.active = Some(active);
        Ok(())
    }

    /// Projection of the active workflow with its draft as JSON.
    pub fn view(&self) -> ResultEngine<Option<WizardView<serde_json::Value>>> {
        match &self.active {
            Some(active) => with_engine!(active, |engine| erase(engine.view())).map(Some),
            None => Ok(None),
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        match &self.active {
            Some(ActiveWorkflow::Onboarding(_)) => OnboardingDraft::FIELDS,
            Some(ActiveWorkflow::Loan(_)) => LoanDraft::FIELDS,
            Some(ActiveWorkflow::Pledge(_)) => PledgeDraft::FIELDS,
            Some(ActiveWorkflow::Contract(_)) => ContractDraft::FIELDS,
            Some(ActiveWorkflow::Rental(_)) => RentalDraft::FIELDS,
            Some(ActiveWorkflow::Repayment(_)) => RepaymentDraft::FIELDS,
            None => &[],
        }
    }

    pub fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()> {
        let active = self.active_engine()?;
        with_engine!(active, |engine| patch(engine, field, value))
    }

    pub async fn advance(&mut self) -> ResultEngine<SessionEvent> {
        let storage = &mut self.storage;
        let active = self.active.as_mut().ok_or_else(no_active_workflow)?;
        let result = with_engine!(active, |engine, wrap| engine
            .advance_with(|output| remember(storage, &wrap(output.clone())))
            .await
            .map(|progress| SessionEvent::settle(progress, wrap)));
        self.settle(result)
    }

    pub async fn commit(&mut self) -> ResultEngine<SessionEvent> {
        let storage = &mut self.storage;
        let active = self.active.as_mut().ok_or_else(no_active_workflow)?;
        let result = with_engine!(active, |engine, wrap| engine
            .commit_with(|output| remember(storage, &wrap(output.clone())))
            .await
            .map(|receipt| SessionEvent::committed(receipt, wrap)));
        self.settle(result)
    }

    pub fn back(&mut self) -> ResultEngine<usize> {
        let active = self.active_engine()?;
        with_engine!(active, |engine| engine.back())
    }

    pub fn cancel(&mut self) -> ResultEngine<()> {
        let active = self.active_engine()?;
        with_engine!(active, |engine| engine.cancel())?;
        self.active = None;
        Ok(())
    }

    /// The stored user was already written by [`remember`] when this sees a
    /// signup.
    fn settle(&mut self, result: ResultEngine<SessionEvent>) -> ResultEngine<SessionEvent> {
        let event = result?;
        if let SessionEvent::Committed { output, .. } = &event {
            self.active = None;
            if let Committed::SignedUp(identity) = output {
                self.sign_in(identity.clone());
            }
        }
        Ok(event)
    }

    fn sign_in(&mut self, identity: Identity) {
        tracing::info!("account created for {} ({})", identity.name, identity.id);
        self.identity = Some(identity);
        self.mode = Mode::Authenticated;
    }

    /// Edits the mutable profile fields and persists the result. The id
    /// never changes.
    pub async fn update_profile(
        &mut self,
        name: Option<&str>,
        location: Option<&str>,
    ) -> ResultEngine<Identity> {
        self.require(Mode::Authenticated)?;
        let mut identity = self
            .identity
            .clone()
            .ok_or_else(|| EngineError::InvalidState("no identity".to_string()))?;

        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(EngineError::validation("profile", "name is required"));
            }
            identity.name = name.to_string();
        }
        if let Some(location) = location {
            if !catalog::is_location(location) {
                return Err(EngineError::validation(
                    "profile",
                    format!("unknown location: {location}"),
                ));
            }
            identity.location = location.to_string();
        }

        self.storage.set(USER_KEY, identity.to_json()?)?;
        self.identity = Some(identity.clone());
        self.services
            .notifier
            .success("Profil berhasil diperbarui!")
            .await;
        Ok(identity)
    }

    pub async fn complete_task(&self, task_id: u32) -> ResultEngine<FarmTask> {
        self.require(Mode::Authenticated)?;
        let result = self
            .services
            .store
            .update(|aggregates| aggregates.complete_task(task_id))
            .await;
        match &result {
            Ok(_) => self.services.notifier.success("Tugas diselesaikan!").await,
            Err(err) => self.services.notifier.error(err.to_string()).await,
        };
        result
    }

    pub async fn ask_advisor(&mut self, question: &str) -> ResultEngine<ChatMessage> {
        self.require(Mode::Authenticated)?;
        let result = self.advisor.ask(&self.services.gateway, question).await;
        if let Err(err) = &result {
            self.services.notifier.error(err.to_string()).await;
        }
        result
    }

    pub async fn scan_crop(&self) -> ResultEngine<Diagnosis> {
        self.require(Mode::Authenticated)?;
        advisor::scan_crop(&self.services.gateway, &self.services.notifier).await
    }
}
