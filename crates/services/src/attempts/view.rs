use chrono::{DateTime, Utc};

use quiz_core::model::{AttemptSummary, QuestionKind, QuizDefinition, QuizId};
use quiz_core::{Phase, QuizAttempt};
use storage::{AttemptSummaryId, AttemptSummaryRow};

/// Presentation-agnostic snapshot of an attempt, rebuilt after every operation.
///
/// No pre-formatted strings: the presentation layer formats the countdown
/// (see `quiz_core::time::format_countdown`) and percentages itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptView {
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub phase: Phase,
    /// 1-based position of the current question.
    pub question_number: usize,
    pub total_questions: usize,
    pub question_text: String,
    pub question_kind: QuestionKind,
    pub options: Vec<OptionView>,
    pub answered_count: usize,
    pub progress_percent: f64,
    pub remaining_secs: u32,
    pub time_low: bool,
    pub camera_enabled: bool,
    pub pending_warning: Option<String>,
    pub navigator: Vec<NavigatorItem>,
    pub is_first_question: bool,
    pub is_last_question: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub index: usize,
    pub label: String,
    pub selected: bool,
}

/// One cell of the question navigator grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorItem {
    pub index: usize,
    pub answered: bool,
    pub current: bool,
}

impl AttemptView {
    #[must_use]
    pub fn from_attempt(attempt: &QuizAttempt) -> Self {
        let quiz = attempt.quiz();
        let question = attempt.current_question();
        let current = attempt.current_index();
        let selected = attempt.answer(current);

        let options = question
            .options()
            .iter()
            .enumerate()
            .map(|(index, label)| OptionView {
                index,
                label: label.clone(),
                selected: selected == Some(index),
            })
            .collect();

        let navigator = attempt
            .answers()
            .iter()
            .enumerate()
            .map(|(index, answer)| NavigatorItem {
                index,
                answered: answer.is_some(),
                current: index == current,
            })
            .collect();

        Self {
            quiz_id: quiz.id(),
            quiz_title: quiz.title().to_owned(),
            phase: attempt.phase(),
            question_number: current + 1,
            total_questions: quiz.question_count(),
            question_text: question.text().to_owned(),
            question_kind: question.kind(),
            options,
            answered_count: attempt.answered_count(),
            progress_percent: attempt.progress_percent(),
            remaining_secs: attempt.remaining_secs(),
            time_low: attempt.is_time_low(),
            camera_enabled: attempt.camera_enabled(),
            pending_warning: attempt.pending_warning().map(str::to_owned),
            navigator,
            is_first_question: current == 0,
            is_last_question: current + 1 == quiz.question_count(),
        }
    }
}

/// Results screen data for a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub quiz_title: String,
    pub score_percent: u8,
    pub passed: bool,
    pub passing_threshold: u8,
    pub total_questions: usize,
    pub correct: usize,
    pub answered: usize,
    pub time_taken_secs: u32,
    pub auto_submitted: bool,
}

impl ResultView {
    /// `None` until the attempt has finished.
    #[must_use]
    pub fn from_attempt(attempt: &QuizAttempt) -> Option<Self> {
        let result = attempt.result()?;
        let quiz = attempt.quiz();
        Some(Self {
            quiz_title: quiz.title().to_owned(),
            score_percent: result.score_percent,
            passed: result.passed,
            passing_threshold: quiz.passing_threshold(),
            total_questions: result.total,
            correct: result.correct,
            answered: result.answered,
            time_taken_secs: result.time_taken_secs,
            auto_submitted: result.auto_submitted,
        })
    }
}

/// Catalogue entry shown before an attempt is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizListItem {
    pub id: QuizId,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub duration_secs: u32,
    pub passing_threshold: u8,
    pub proctored: bool,
    pub available_until: Option<DateTime<Utc>>,
    pub attempts_allowed: Option<u32>,
}

impl QuizListItem {
    #[must_use]
    pub fn from_quiz(quiz: &QuizDefinition) -> Self {
        Self {
            id: quiz.id(),
            title: quiz.title().to_owned(),
            description: quiz.description().to_owned(),
            question_count: quiz.question_count(),
            duration_secs: quiz.duration_secs(),
            passing_threshold: quiz.passing_threshold(),
            proctored: quiz.is_proctored(),
            available_until: quiz.available_until(),
            attempts_allowed: quiz.attempts_allowed(),
        }
    }
}

/// Stored attempt summary as a list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryListItem {
    pub id: AttemptSummaryId,
    pub completed_at: DateTime<Utc>,
    pub score_percent: u8,
    pub passed: bool,
    pub correct: u32,
    pub total: u32,
}

impl SummaryListItem {
    #[must_use]
    pub fn from_summary(id: AttemptSummaryId, summary: &AttemptSummary) -> Self {
        Self {
            id,
            completed_at: summary.completed_at(),
            score_percent: summary.score_percent(),
            passed: summary.passed(),
            correct: summary.correct(),
            total: summary.total_questions(),
        }
    }

    #[must_use]
    pub fn from_row(row: &AttemptSummaryRow) -> Self {
        Self::from_summary(row.id, &row.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn attempt() -> QuizAttempt {
        let quiz = storage::sample::corporate_ethics().unwrap();
        QuizAttempt::new(Arc::new(quiz))
    }

    #[test]
    fn view_marks_selection_and_navigator() {
        let mut attempt = attempt();
        attempt.start().unwrap();
        attempt.record_answer(0, 2).unwrap();
        attempt.go_to_question(0).unwrap();

        let view = AttemptView::from_attempt(&attempt);
        assert_eq!(view.question_number, 1);
        assert_eq!(view.total_questions, 5);
        assert!(view.is_first_question);
        assert!(!view.is_last_question);
        assert_eq!(view.options.len(), 4);
        assert!(view.options[2].selected);
        assert!(!view.options[1].selected);
        assert_eq!(view.answered_count, 1);
        assert!(view.navigator[0].answered && view.navigator[0].current);
        assert!(!view.navigator[1].answered && !view.navigator[1].current);
    }

    #[test]
    fn result_view_requires_finished_attempt() {
        let mut attempt = attempt();
        assert!(ResultView::from_attempt(&attempt).is_none());

        attempt.start().unwrap();
        for (question, option) in [1, 1, 2, 3, 1].into_iter().enumerate() {
            attempt.record_answer(question, option).unwrap();
        }
        attempt.finish().unwrap();

        let view = ResultView::from_attempt(&attempt).unwrap();
        assert_eq!(view.score_percent, 100);
        assert!(view.passed);
        assert_eq!(view.passing_threshold, 70);
        assert_eq!(view.correct, 5);
    }

    #[test]
    fn list_item_copies_catalogue_fields() {
        let quiz = storage::sample::corporate_ethics().unwrap();
        let item = QuizListItem::from_quiz(&quiz);
        assert_eq!(item.title, "Corporate Ethics Training");
        assert_eq!(item.question_count, 5);
        assert_eq!(item.duration_secs, 1800);
        assert!(item.proctored);
        assert_eq!(item.available_until, None);
        assert_eq!(item.attempts_allowed, None);
    }
}
