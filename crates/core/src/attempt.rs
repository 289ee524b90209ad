use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{ProctoringSettings, Question, QuizDefinition};
use crate::scoring;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle stage of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    NotStarted,
    InProgress,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::NotStarted => "not started",
            Phase::InProgress => "in progress",
            Phase::Finished => "finished",
        };
        f.write_str(label)
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// What an out-of-range index pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    Question,
    Option,
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexTarget::Question => f.write_str("question"),
            IndexTarget::Option => f.write_str("option"),
        }
    }
}

/// Contract violations reported by `QuizAttempt`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("{operation} is not allowed while the attempt is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    #[error("{target} index {index} is out of range (len {len})")]
    OutOfRange {
        target: IndexTarget,
        index: usize,
        len: usize,
    },

    #[error("the proctoring camera must be enabled before starting")]
    CameraDisabled,
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Notifications emitted by the attempt for user-facing toasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    Started { duration_secs: u32 },
    WarningRaised { message: String },
    CameraToggled { enabled: bool },
    Finished { score_percent: u8, auto_submitted: bool },
}

//
// ─── RESULT / PROGRESS ─────────────────────────────────────────────────────────
//

/// Outcome of a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptResult {
    pub score_percent: u8,
    pub correct: usize,
    pub total: usize,
    pub answered: usize,
    pub time_taken_secs: u32,
    pub passed: bool,
    pub auto_submitted: bool,
}

/// Point-in-time snapshot of attempt progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptProgress {
    pub phase: Phase,
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
    pub remaining_secs: u32,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// State machine for one pass through a quiz.
///
/// `NotStarted -> InProgress -> Finished`. The countdown is driven from the
/// outside by calling [`QuizAttempt::tick`] once per elapsed second; the
/// attempt submits itself when the time runs out. Events produced along the
/// way queue up until [`QuizAttempt::take_events`] drains them.
#[derive(Clone)]
pub struct QuizAttempt {
    quiz: Arc<QuizDefinition>,
    settings: ProctoringSettings,
    phase: Phase,
    current: usize,
    answers: Vec<Option<usize>>,
    remaining_secs: u32,
    elapsed_secs: u32,
    camera_enabled: bool,
    pending_warning: Option<String>,
    warning_fired: bool,
    warnings_raised: u32,
    result: Option<AttemptResult>,
    events: Vec<AttemptEvent>,
}

impl QuizAttempt {
    /// New attempt with default proctoring settings.
    #[must_use]
    pub fn new(quiz: Arc<QuizDefinition>) -> Self {
        Self::with_settings(quiz, ProctoringSettings::default())
    }

    /// New attempt using the given proctoring settings.
    #[must_use]
    pub fn with_settings(quiz: Arc<QuizDefinition>, settings: ProctoringSettings) -> Self {
        let question_count = quiz.question_count();
        let remaining_secs = quiz.duration_secs();
        Self {
            quiz,
            settings,
            phase: Phase::NotStarted,
            current: 0,
            answers: vec![None; question_count],
            remaining_secs,
            elapsed_secs: 0,
            camera_enabled: true,
            pending_warning: None,
            warning_fired: false,
            warnings_raised: 0,
            result: None,
            events: Vec::new(),
        }
    }

    fn require_phase(&self, expected: Phase, operation: &'static str) -> Result<(), AttemptError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(AttemptError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn check_question(&self, index: usize) -> Result<&Question, AttemptError> {
        self.quiz.question(index).ok_or(AttemptError::OutOfRange {
            target: IndexTarget::Question,
            index,
            len: self.quiz.question_count(),
        })
    }

    // ─── Transitions ──────────────────────────────────────────────────────────

    /// Begin the attempt and start the countdown.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPhase` unless the attempt has not started,
    /// and `AttemptError::CameraDisabled` when a proctored quiz is started with
    /// the camera off.
    pub fn start(&mut self) -> Result<(), AttemptError> {
        self.require_phase(Phase::NotStarted, "start")?;
        if self.quiz.is_proctored() && self.settings.require_camera_to_start() && !self.camera_enabled
        {
            return Err(AttemptError::CameraDisabled);
        }

        self.phase = Phase::InProgress;
        self.remaining_secs = self.quiz.duration_secs();
        self.elapsed_secs = 0;
        self.events.push(AttemptEvent::Started {
            duration_secs: self.remaining_secs,
        });
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// Fires the scheduled tab-switch warning once its delay has elapsed and
    /// finishes the attempt when no time is left. Returns the phase after the
    /// tick.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPhase` unless the attempt is in progress.
    pub fn tick(&mut self) -> Result<Phase, AttemptError> {
        self.require_phase(Phase::InProgress, "tick")?;

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);

        if let Some(delay) = self.settings.warning_after_secs() {
            if !self.warning_fired && self.elapsed_secs >= delay {
                self.raise_warning();
            }
        }

        if self.remaining_secs == 0 {
            self.complete(true);
        }
        Ok(self.phase)
    }

    fn raise_warning(&mut self) {
        let message = self.settings.warning_message().to_owned();
        self.warning_fired = true;
        self.warnings_raised = self.warnings_raised.saturating_add(1);
        self.pending_warning = Some(message.clone());
        self.events.push(AttemptEvent::WarningRaised { message });
    }

    /// Jump straight to the question at `index`. Answers are untouched.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPhase` unless in progress, or
    /// `AttemptError::OutOfRange` (leaving the current question unchanged).
    pub fn go_to_question(&mut self, index: usize) -> Result<(), AttemptError> {
        self.require_phase(Phase::InProgress, "go_to_question")?;
        self.check_question(index)?;
        self.current = index;
        Ok(())
    }

    /// Move to the next question; does nothing on the last one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPhase` unless in progress.
    pub fn next(&mut self) -> Result<(), AttemptError> {
        self.require_phase(Phase::InProgress, "next")?;
        if self.current + 1 < self.quiz.question_count() {
            self.go_to_question(self.current + 1)?;
        }
        Ok(())
    }

    /// Move to the previous question; does nothing on the first one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPhase` unless in progress.
    pub fn previous(&mut self) -> Result<(), AttemptError> {
        self.require_phase(Phase::InProgress, "previous")?;
        if self.current > 0 {
            self.go_to_question(self.current - 1)?;
        }
        Ok(())
    }

    /// Record (or replace) the chosen option for a question.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPhase` unless in progress, and
    /// `AttemptError::OutOfRange` for an unknown question or option.
    pub fn record_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<(), AttemptError> {
        self.require_phase(Phase::InProgress, "record_answer")?;
        let option_count = self.check_question(question_index)?.option_count();
        if option_index >= option_count {
            return Err(AttemptError::OutOfRange {
                target: IndexTarget::Option,
                index: option_index,
                len: option_count,
            });
        }
        self.answers[question_index] = Some(option_index);
        Ok(())
    }

    /// Record an answer for the question currently shown.
    ///
    /// # Errors
    ///
    /// Same as [`QuizAttempt::record_answer`].
    pub fn record_current_answer(&mut self, option_index: usize) -> Result<(), AttemptError> {
        self.record_answer(self.current, option_index)
    }

    /// Submit the attempt and compute its score.
    ///
    /// Calling it again after the attempt finished returns the stored result.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPhase` if the attempt never started.
    pub fn finish(&mut self) -> Result<AttemptResult, AttemptError> {
        match (self.phase, self.result) {
            (Phase::Finished, Some(result)) => Ok(result),
            (Phase::InProgress, _) => Ok(self.complete(false)),
            (phase, _) => Err(AttemptError::InvalidPhase {
                operation: "finish",
                phase,
            }),
        }
    }

    fn complete(&mut self, auto_submitted: bool) -> AttemptResult {
        let total = self.quiz.question_count();
        let correct = self
            .quiz
            .questions()
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| answer.is_some_and(|option| question.is_correct(option)))
            .count();
        let score_percent = scoring::score_percent(correct, total);

        let result = AttemptResult {
            score_percent,
            correct,
            total,
            answered: self.answered_count(),
            time_taken_secs: self.quiz.duration_secs().saturating_sub(self.remaining_secs),
            passed: scoring::is_passing(score_percent, self.quiz.passing_threshold()),
            auto_submitted,
        };

        self.phase = Phase::Finished;
        self.result = Some(result);
        self.events.push(AttemptEvent::Finished {
            score_percent,
            auto_submitted,
        });
        result
    }

    /// Flip the proctoring camera. Allowed in every phase.
    ///
    /// Turning the camera off mid-attempt is advisory: the attempt keeps
    /// running and the countdown is unaffected. Returns the new state.
    pub fn toggle_camera(&mut self) -> bool {
        self.camera_enabled = !self.camera_enabled;
        self.events.push(AttemptEvent::CameraToggled {
            enabled: self.camera_enabled,
        });
        self.camera_enabled
    }

    /// Dismiss the pending proctoring warning, if any.
    pub fn acknowledge_warning(&mut self) {
        self.pending_warning = None;
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<AttemptEvent> {
        std::mem::take(&mut self.events)
    }

    // ─── Queries ──────────────────────────────────────────────────────────────

    #[must_use]
    pub fn quiz(&self) -> &QuizDefinition {
        &self.quiz
    }

    #[must_use]
    pub fn settings(&self) -> &ProctoringSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.phase == Phase::InProgress
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        // `current` is only ever set after a bounds check and quizzes are never empty.
        &self.quiz.questions()[self.current]
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, question_index: usize) -> Option<usize> {
        self.answers.get(question_index).copied().flatten()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// True while in progress with the countdown at or below the low-time threshold.
    #[must_use]
    pub fn is_time_low(&self) -> bool {
        self.is_in_progress() && self.remaining_secs <= self.settings.low_time_threshold_secs()
    }

    #[must_use]
    pub fn camera_enabled(&self) -> bool {
        self.camera_enabled
    }

    #[must_use]
    pub fn pending_warning(&self) -> Option<&str> {
        self.pending_warning.as_deref()
    }

    #[must_use]
    pub fn warnings_raised(&self) -> u32 {
        self.warnings_raised
    }

    /// Share of the quiz reached by the current question, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        100.0 * (self.current + 1) as f64 / self.quiz.question_count() as f64
    }

    #[must_use]
    pub fn progress(&self) -> AttemptProgress {
        AttemptProgress {
            phase: self.phase,
            current_index: self.current,
            total: self.quiz.question_count(),
            answered: self.answered_count(),
            remaining_secs: self.remaining_secs,
        }
    }

    /// Final score; present only once the attempt has finished.
    #[must_use]
    pub fn final_score_percent(&self) -> Option<u8> {
        self.result.map(|r| r.score_percent)
    }

    #[must_use]
    pub fn result(&self) -> Option<AttemptResult> {
        self.result
    }
}

impl fmt::Debug for QuizAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizAttempt")
            .field("quiz_id", &self.quiz.id())
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("answers", &self.answers)
            .field("remaining_secs", &self.remaining_secs)
            .field("camera_enabled", &self.camera_enabled)
            .field("pending_warning", &self.pending_warning)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
