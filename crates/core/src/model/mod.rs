mod ids;
mod question;
mod quiz;
mod settings;
mod summary;

pub use ids::{ParseIdError, QuestionId, QuizId};
pub use question::{
    DEFAULT_MULTIPLE_CHOICE_OPTIONS, Question, QuestionDraft, QuestionError, QuestionKind,
    TRUE_FALSE_OPTIONS,
};
pub use quiz::{DEFAULT_DURATION_SECS, DEFAULT_PASSING_THRESHOLD, QuizDefinition, QuizDraft, QuizError};
pub use settings::{DEFAULT_WARNING_MESSAGE, ProctoringSettings, SettingsError};
pub use summary::{AttemptSummary, AttemptSummaryError};
