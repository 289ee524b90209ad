use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Option labels used by every true/false question.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// Option count a freshly added multiple-choice question starts with.
pub const DEFAULT_MULTIPLE_CHOICE_OPTIONS: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs at least two options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} cannot be empty")]
    EmptyOption { index: usize },

    #[error("true/false questions must offer exactly \"True\" and \"False\"")]
    InvalidTrueFalseOptions,

    #[error("correct option {index} is out of range for {len} options")]
    CorrectOptionOutOfRange { index: usize, len: usize },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

impl QuestionKind {
    /// Number of options a blank question of this kind is created with.
    #[must_use]
    pub fn default_option_count(self) -> usize {
        match self {
            QuestionKind::MultipleChoice => DEFAULT_MULTIPLE_CHOICE_OPTIONS,
            QuestionKind::TrueFalse => TRUE_FALSE_OPTIONS.len(),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as entered in a quiz form or read from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl QuestionDraft {
    /// Blank draft of the given kind; true/false drafts come pre-filled with their labels.
    #[must_use]
    pub fn blank(id: QuestionId, kind: QuestionKind) -> Self {
        let options = match kind {
            QuestionKind::MultipleChoice => vec![String::new(); kind.default_option_count()],
            QuestionKind::TrueFalse => TRUE_FALSE_OPTIONS.iter().map(|s| (*s).to_owned()).collect(),
        };
        Self {
            id,
            text: String::new(),
            kind,
            options,
            correct_option: 0,
        }
    }

    /// Validate the draft into a `Question`.
    ///
    /// Text and option labels are trimmed. A true/false draft with no options
    /// receives the standard labels.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first rule the draft breaks.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let mut options: Vec<String> = self
            .options
            .into_iter()
            .map(|option| option.trim().to_owned())
            .collect();

        match self.kind {
            QuestionKind::TrueFalse => {
                if options.is_empty() {
                    options = TRUE_FALSE_OPTIONS.iter().map(|s| (*s).to_owned()).collect();
                }
                if options.len() != TRUE_FALSE_OPTIONS.len()
                    || options
                        .iter()
                        .zip(TRUE_FALSE_OPTIONS)
                        .any(|(got, want)| !got.eq_ignore_ascii_case(want))
                {
                    return Err(QuestionError::InvalidTrueFalseOptions);
                }
                options = TRUE_FALSE_OPTIONS.iter().map(|s| (*s).to_owned()).collect();
            }
            QuestionKind::MultipleChoice => {
                if options.len() < 2 {
                    return Err(QuestionError::TooFewOptions { len: options.len() });
                }
                if let Some(index) = options.iter().position(String::is_empty) {
                    return Err(QuestionError::EmptyOption { index });
                }
            }
        }

        if self.correct_option >= options.len() {
            return Err(QuestionError::CorrectOptionOutOfRange {
                index: self.correct_option,
                len: options.len(),
            });
        }

        Ok(Question {
            id: self.id,
            text,
            kind: self.kind,
            options,
            correct_option: self.correct_option,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated quiz question.
///
/// `correct_option` is always a valid index into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft", into = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    text: String,
    kind: QuestionKind,
    options: Vec<String>,
    correct_option: usize,
}

impl Question {
    /// Build a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text or options are blank or the correct
    /// option does not exist.
    pub fn multiple_choice<I, S>(
        id: QuestionId,
        text: impl Into<String>,
        options: I,
        correct_option: usize,
    ) -> Result<Self, QuestionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QuestionDraft {
            id,
            text: text.into(),
            kind: QuestionKind::MultipleChoice,
            options: options.into_iter().map(Into::into).collect(),
            correct_option,
        }
        .validate()
    }

    /// Build a true/false question whose correct answer is `answer`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the text is blank.
    pub fn true_false(
        id: QuestionId,
        text: impl Into<String>,
        answer: bool,
    ) -> Result<Self, QuestionError> {
        QuestionDraft {
            id,
            text: text.into(),
            kind: QuestionKind::TrueFalse,
            options: Vec::new(),
            correct_option: if answer { 0 } else { 1 },
        }
        .validate()
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    /// Whether `option` is the correct choice for this question.
    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option
    }
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<Question> for QuestionDraft {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            text: question.text,
            kind: question.kind,
            options: question.options,
            correct_option: question.correct_option,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_choice_trims_and_validates() {
        let q = Question::multiple_choice(
            QuestionId::new(1),
            "  Which is allowed? ",
            [" a ", "b", "c", "d"],
            1,
        )
        .unwrap();

        assert_eq!(q.text(), "Which is allowed?");
        assert_eq!(q.options()[0], "a");
        assert_eq!(q.kind(), QuestionKind::MultipleChoice);
        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
    }

    #[test]
    fn blank_text_is_rejected() {
        let err = Question::multiple_choice(QuestionId::new(1), "   ", ["a", "b"], 0).unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn blank_option_is_rejected() {
        let err =
            Question::multiple_choice(QuestionId::new(1), "Q", ["a", " ", "c"], 0).unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption { index: 1 });
    }

    #[test]
    fn single_option_is_rejected() {
        let err = Question::multiple_choice(QuestionId::new(1), "Q", ["only"], 0).unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { len: 1 });
    }

    #[test]
    fn correct_option_must_exist() {
        let err = Question::multiple_choice(QuestionId::new(1), "Q", ["a", "b"], 2).unwrap_err();
        assert_eq!(err, QuestionError::CorrectOptionOutOfRange { index: 2, len: 2 });
    }

    #[test]
    fn true_false_uses_standard_labels() {
        let q = Question::true_false(QuestionId::new(2), "Sky is green", false).unwrap();
        assert_eq!(q.options(), ["True", "False"]);
        assert_eq!(q.correct_option(), 1);
        assert_eq!(q.kind(), QuestionKind::TrueFalse);
    }

    #[test]
    fn true_false_rejects_custom_labels() {
        let draft = QuestionDraft {
            id: QuestionId::new(1),
            text: "Q".into(),
            kind: QuestionKind::TrueFalse,
            options: vec!["Yes".into(), "No".into()],
            correct_option: 0,
        };
        assert_eq!(draft.validate().unwrap_err(), QuestionError::InvalidTrueFalseOptions);
    }

    #[test]
    fn blank_draft_matches_kind() {
        let mcq = QuestionDraft::blank(QuestionId::new(1), QuestionKind::MultipleChoice);
        assert_eq!(mcq.options.len(), 4);
        let tf = QuestionDraft::blank(QuestionId::new(2), QuestionKind::TrueFalse);
        assert_eq!(tf.options, vec!["True".to_string(), "False".to_string()]);
    }

    #[test]
    fn deserializing_runs_validation() {
        let ok: Question = serde_json::from_str(
            r#"{"id":1,"text":"Q","kind":"true_false","correct_option":0}"#,
        )
        .unwrap();
        assert_eq!(ok.option_count(), 2);

        let bad = serde_json::from_str::<Question>(
            r#"{"id":1,"text":"Q","kind":"multiple_choice","options":["a","b"],"correct_option":5}"#,
        );
        assert!(bad.is_err());
    }
}
