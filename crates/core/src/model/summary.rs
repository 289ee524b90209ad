use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::attempt::AttemptResult;
use crate::model::QuizId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single attempt: {len}")]
    TooManyQuestions { len: usize },
}

/// Aggregate record of a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    quiz_id: QuizId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_questions: u32,
    answered: u32,
    correct: u32,
    score_percent: u8,
    passed: bool,
    auto_submitted: bool,
    warnings_raised: u32,
}

impl AttemptSummary {
    /// Build a summary from the result of a finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    pub fn from_result(
        quiz_id: QuizId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        result: &AttemptResult,
        warnings_raised: u32,
    ) -> Result<Self, AttemptSummaryError> {
        if completed_at < started_at {
            return Err(AttemptSummaryError::InvalidTimeRange);
        }
        let to_u32 = |len: usize| {
            u32::try_from(len).map_err(|_| AttemptSummaryError::TooManyQuestions { len })
        };

        Ok(Self {
            quiz_id,
            started_at,
            completed_at,
            total_questions: to_u32(result.total)?,
            answered: to_u32(result.answered)?,
            correct: to_u32(result.correct)?,
            score_percent: result.score_percent,
            passed: result.passed,
            auto_submitted: result.auto_submitted,
            warnings_raised,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn score_percent(&self) -> u8 {
        self.score_percent
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn auto_submitted(&self) -> bool {
        self.auto_submitted
    }

    #[must_use]
    pub fn warnings_raised(&self) -> u32 {
        self.warnings_raised
    }
}
