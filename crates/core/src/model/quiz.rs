use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId};
use crate::model::question::{Question, QuestionDraft, QuestionError};

/// Default attempt length for a new quiz (30 minutes).
pub const DEFAULT_DURATION_SECS: u32 = 30 * 60;

/// Default passing score, in percent.
pub const DEFAULT_PASSING_THRESHOLD: u8 = 70;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz duration must be > 0 seconds")]
    InvalidDuration,

    #[error("passing threshold must be between 0 and 100, got {0}")]
    InvalidPassingThreshold(u8),

    #[error("a quiz needs at least one question")]
    NoQuestions,

    #[error("available_until must be after available_from")]
    InvalidAvailabilityWindow,

    #[error("attempts allowed must be at least 1")]
    InvalidAttemptsAllowed,

    #[error("question id {0} is used more than once")]
    DuplicateQuestionId(QuestionId),

    #[error("question {index} is invalid: {source}")]
    Question {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

fn default_duration_secs() -> u32 {
    DEFAULT_DURATION_SECS
}

fn default_passing_threshold() -> u8 {
    DEFAULT_PASSING_THRESHOLD
}

fn default_proctored() -> bool {
    true
}

/// Quiz as filled in on the creation form, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
    #[serde(default = "default_passing_threshold")]
    pub passing_threshold: u8,
    #[serde(default = "default_proctored")]
    pub proctored: bool,
    #[serde(default)]
    pub randomize_questions: bool,
    /// Start of the availability window; open-ended when absent.
    #[serde(default)]
    pub available_from: Option<DateTime<Utc>>,
    /// End of the availability window (exclusive); open-ended when absent.
    #[serde(default)]
    pub available_until: Option<DateTime<Utc>>,
    /// Maximum number of recorded attempts; unlimited when absent.
    #[serde(default)]
    pub attempts_allowed: Option<u32>,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

impl QuizDraft {
    /// Empty draft carrying the default settings.
    #[must_use]
    pub fn new(id: QuizId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            duration_secs: DEFAULT_DURATION_SECS,
            passing_threshold: DEFAULT_PASSING_THRESHOLD,
            proctored: true,
            randomize_questions: false,
            available_from: None,
            available_until: None,
            attempts_allowed: None,
            questions: Vec::new(),
        }
    }

    /// Validate the draft into an immutable `QuizDefinition`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for a blank title, zero duration, a threshold above
    /// 100, a window that ends before it starts, a zero attempt limit, an
    /// empty or invalid question list, or duplicate question ids.
    pub fn validate(self) -> Result<QuizDefinition, QuizError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if self.duration_secs == 0 {
            return Err(QuizError::InvalidDuration);
        }
        if self.passing_threshold > 100 {
            return Err(QuizError::InvalidPassingThreshold(self.passing_threshold));
        }
        if let (Some(from), Some(until)) = (self.available_from, self.available_until) {
            if until <= from {
                return Err(QuizError::InvalidAvailabilityWindow);
            }
        }
        if self.attempts_allowed == Some(0) {
            return Err(QuizError::InvalidAttemptsAllowed);
        }
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        let mut questions = Vec::with_capacity(self.questions.len());
        for (index, draft) in self.questions.into_iter().enumerate() {
            if !seen.insert(draft.id) {
                return Err(QuizError::DuplicateQuestionId(draft.id));
            }
            let question = draft
                .validate()
                .map_err(|source| QuizError::Question { index, source })?;
            questions.push(question);
        }

        Ok(QuizDefinition {
            id: self.id,
            title,
            description: self.description.trim().to_owned(),
            duration_secs: self.duration_secs,
            passing_threshold: self.passing_threshold,
            proctored: self.proctored,
            randomize_questions: self.randomize_questions,
            available_from: self.available_from,
            available_until: self.available_until,
            attempts_allowed: self.attempts_allowed,
            questions,
        })
    }
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// Immutable description of a quiz an attempt is taken against.
///
/// Question order is significant: it defines the question index used by
/// attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizDraft", into = "QuizDraft")]
pub struct QuizDefinition {
    id: QuizId,
    title: String,
    description: String,
    duration_secs: u32,
    passing_threshold: u8,
    proctored: bool,
    randomize_questions: bool,
    available_from: Option<DateTime<Utc>>,
    available_until: Option<DateTime<Utc>>,
    attempts_allowed: Option<u32>,
    questions: Vec<Question>,
}

impl QuizDefinition {
    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn passing_threshold(&self) -> u8 {
        self.passing_threshold
    }

    #[must_use]
    pub fn is_proctored(&self) -> bool {
        self.proctored
    }

    #[must_use]
    pub fn randomize_questions(&self) -> bool {
        self.randomize_questions
    }

    #[must_use]
    pub fn available_from(&self) -> Option<DateTime<Utc>> {
        self.available_from
    }

    #[must_use]
    pub fn available_until(&self) -> Option<DateTime<Utc>> {
        self.available_until
    }

    #[must_use]
    pub fn attempts_allowed(&self) -> Option<u32> {
        self.attempts_allowed
    }

    /// True when `now` falls inside `[available_from, available_until)`.
    #[must_use]
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.available_from.is_none_or(|from| now >= from)
            && self.available_until.is_none_or(|until| now < until)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Number of questions; always at least one.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Return a copy whose question order was rearranged by `reorder`.
    ///
    /// The closure only sees a slice, so it can permute questions but never
    /// add or remove them.
    #[must_use]
    pub fn reordered(&self, reorder: impl FnOnce(&mut [Question])) -> Self {
        let mut quiz = self.clone();
        reorder(&mut quiz.questions);
        quiz
    }
}

impl TryFrom<QuizDraft> for QuizDefinition {
    type Error = QuizError;

    fn try_from(draft: QuizDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<QuizDefinition> for QuizDraft {
    fn from(quiz: QuizDefinition) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            duration_secs: quiz.duration_secs,
            passing_threshold: quiz.passing_threshold,
            proctored: quiz.proctored,
            randomize_questions: quiz.randomize_questions,
            available_from: quiz.available_from,
            available_until: quiz.available_until,
            attempts_allowed: quiz.attempts_allowed,
            questions: quiz.questions.into_iter().map(QuestionDraft::from).collect(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
