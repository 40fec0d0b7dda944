//! The module contains the errors the engine can throw.
//!
//! Workflow navigation errors:
//!
//! - [`Validation`] thrown when the current step rejects the draft.
//! - [`Boundary`] thrown when going back from the first step.
//! - [`Busy`] thrown when a transaction is being submitted.
//!
//! Aggregate mutation errors:
//!
//! - [`NotFound`], [`InvalidState`] and [`Conflict`] thrown when the
//!   preconditions of a store mutation are violated.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Boundary`]: EngineError::Boundary
//!  [`Busy`]: EngineError::Busy
//!  [`NotFound`]: EngineError::NotFound
//!  [`InvalidState`]: EngineError::InvalidState
//!  [`Conflict`]: EngineError::Conflict
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{step}: {reason}")]
    Validation { step: &'static str, reason: String },
    #[error("Already at the first step")]
    Boundary,
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("A transaction is being submitted")]
    Busy,
    #[error("Workflow closed")]
    Closed,
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn validation(step: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            step,
            reason: reason.into(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Validation {
                    step: a,
                    reason: ra,
                },
                Self::Validation {
                    step: b,
                    reason: rb,
                },
            ) => a == b && ra == rb,
            (Self::Boundary, Self::Boundary) => true,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Busy, Self::Busy) => true,
            (Self::Closed, Self::Closed) => true,
            (Self::TransactionFailed(a), Self::TransactionFailed(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Io(a), Self::Io(b)) => a.to_string() == b.to_string(),
            (Self::Json(a), Self::Json(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
