//! In-process core of the Agro farmer app.
//!
//! A [`SessionController`] owns the session mode and at most one active
//! [`WizardEngine`]. Each wizard walks a [`Workflow`] step by step and, on its
//! terminal step, submits a [`Transaction`] through a [`TransactionGateway`]
//! (the [`Simulator`] in this crate). The resolved transaction mutates the
//! shared [`StateStore`] and a [`Notification`] is pushed to the [`Notifier`].

pub use advisor::{AdvisorChat, ChatMessage, Sender, scan_crop};
pub use aggregates::{
    AggregateRef, Aggregates, Contract, ContractStatus, FarmTask, InvestmentProject, LoanAccount,
    LoanStatus, RentalStatus, RentalUnit, StateStore, TaskStatus, progress_of,
};
pub use error::EngineError;
pub use gateway::TransactionGateway;
pub use identity::{INITIAL_REPUTATION, Identity, UserRole};
pub use money::Rupiah;
pub use notifications::{DEFAULT_DISMISS_AFTER, Notification, NotificationKind, Notifier};
pub use session::{
    ActiveWorkflow, Committed, Mode, SessionController, SessionEvent, WorkflowRequest,
};
pub use simulator::{Latency, Simulator, SimulatorConfig};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, USER_KEY};
pub use transactions::{
    Diagnosis, LoanScheme, Outcome, Payload, RepaymentMethod, Transaction, TransactionKind,
};
pub use wizard::{
    Phase, Progress, Receipt, Services, Step, Validator, WizardEngine, WizardView, Workflow,
    always_valid,
};

mod advisor;
mod aggregates;
pub mod catalog;
mod error;
mod gateway;
mod identity;
mod money;
mod notifications;
mod session;
mod simulator;
mod storage;
mod transactions;
mod wizard;
pub mod workflows;

pub type ResultEngine<T> = Result<T, EngineError>;
