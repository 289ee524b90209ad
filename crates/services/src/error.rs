//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::AttemptError;
use quiz_core::model::{AttemptSummaryError, QuizId};
use storage::StorageError;

/// Errors emitted by attempt sessions and `AttemptLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptServiceError {
    #[error("attempt has not finished yet")]
    NotFinished,
    #[error("quiz {quiz_id} is not open for attempts right now")]
    NotAvailable { quiz_id: QuizId },
    #[error("quiz {quiz_id} allows {allowed} attempt(s) and all have been used")]
    AttemptLimitReached { quiz_id: QuizId, allowed: u32 },
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Summary(#[from] AttemptSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AttemptServiceError {
    /// True when the error is a phase violation from the attempt state machine.
    #[must_use]
    pub fn is_invalid_phase(&self) -> bool {
        matches!(self, Self::Attempt(AttemptError::InvalidPhase { .. }))
    }
}
