use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use quiz_core::model::{AttemptSummary, QuizId};
use quiz_core::{AttemptError, AttemptResult, Phase, QuizAttempt};
use storage::{AttemptSummaryId, AttemptSummaryRepository};

use super::view::{AttemptView, ResultView};
use crate::Clock;
use crate::error::AttemptServiceError;
use crate::notify::NotificationSink;

struct SessionState {
    attempt: QuizAttempt,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

/// Shared handle to one attempt.
///
/// All operations go through a single async mutex, so the attempt is never
/// mutated by two callers at once (e.g. the ticker and a user answering).
/// Events produced by an operation are delivered to the sink after the lock
/// has been released. Cloning yields another handle to the same attempt.
#[derive(Clone)]
pub struct AttemptSession {
    quiz_id: QuizId,
    clock: Clock,
    sink: Arc<dyn NotificationSink>,
    state: Arc<Mutex<SessionState>>,
    // Held across check, append and record so a summary is stored once.
    summary_id: Arc<Mutex<Option<AttemptSummaryId>>>,
}

impl AttemptSession {
    #[must_use]
    pub fn new(attempt: QuizAttempt, clock: Clock, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            quiz_id: attempt.quiz().id(),
            clock,
            sink,
            state: Arc::new(Mutex::new(SessionState {
                attempt,
                started_at: None,
                completed_at: None,
            })),
            summary_id: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    async fn apply<T>(
        &self,
        operation: impl FnOnce(&mut QuizAttempt) -> Result<T, AttemptError>,
    ) -> Result<T, AttemptServiceError> {
        let (outcome, events) = {
            let mut state = self.state.lock().await;
            let outcome = operation(&mut state.attempt);

            let phase = state.attempt.phase();
            if phase != Phase::NotStarted && state.started_at.is_none() {
                state.started_at = Some(self.clock.now());
            }
            if phase == Phase::Finished && state.completed_at.is_none() {
                state.completed_at = Some(self.clock.now());
            }
            (outcome, state.attempt.take_events())
        };

        for event in &events {
            self.sink.notify(self.quiz_id, event);
        }
        Ok(outcome?)
    }

    async fn read<T>(&self, query: impl FnOnce(&SessionState) -> T) -> T {
        let state = self.state.lock().await;
        query(&state)
    }

    // ─── Operations ───────────────────────────────────────────────────────────

    /// Start the attempt.
    ///
    /// # Errors
    ///
    /// Propagates `AttemptError` (wrong phase, camera disabled).
    pub async fn start(&self) -> Result<(), AttemptServiceError> {
        self.apply(QuizAttempt::start).await
    }

    /// Advance the countdown by one second and return the resulting phase.
    ///
    /// # Errors
    ///
    /// Returns an invalid-phase error once the attempt is no longer in progress.
    pub async fn tick(&self) -> Result<Phase, AttemptServiceError> {
        self.apply(QuizAttempt::tick).await
    }

    /// # Errors
    ///
    /// Propagates `AttemptError` for a wrong phase or an out-of-range index.
    pub async fn go_to_question(&self, index: usize) -> Result<(), AttemptServiceError> {
        self.apply(|attempt| attempt.go_to_question(index)).await
    }

    /// # Errors
    ///
    /// Propagates `AttemptError::InvalidPhase`.
    pub async fn next(&self) -> Result<(), AttemptServiceError> {
        self.apply(QuizAttempt::next).await
    }

    /// # Errors
    ///
    /// Propagates `AttemptError::InvalidPhase`.
    pub async fn previous(&self) -> Result<(), AttemptServiceError> {
        self.apply(QuizAttempt::previous).await
    }

    /// Record an answer for any question.
    ///
    /// # Errors
    ///
    /// Propagates `AttemptError` for a wrong phase or an out-of-range index.
    pub async fn record_answer(
        &self,
        question_index: usize,
        option_index: usize,
    ) -> Result<(), AttemptServiceError> {
        self.apply(|attempt| attempt.record_answer(question_index, option_index))
            .await?;
        debug!(quiz_id = %self.quiz_id, question_index, option_index, "answer recorded");
        Ok(())
    }

    /// Record an answer for the question currently shown.
    ///
    /// # Errors
    ///
    /// Propagates `AttemptError` for a wrong phase or an out-of-range option.
    pub async fn record_current_answer(
        &self,
        option_index: usize,
    ) -> Result<(), AttemptServiceError> {
        self.apply(|attempt| attempt.record_current_answer(option_index))
            .await
    }

    /// Submit the attempt. Repeated calls return the same result.
    ///
    /// # Errors
    ///
    /// Returns an invalid-phase error if the attempt never started.
    pub async fn finish(&self) -> Result<AttemptResult, AttemptServiceError> {
        self.apply(QuizAttempt::finish).await
    }

    /// Flip the proctoring camera and return its new state.
    pub async fn toggle_camera(&self) -> bool {
        // toggling never fails
        self.apply(|attempt| Ok(attempt.toggle_camera()))
            .await
            .unwrap_or_default()
    }

    pub async fn acknowledge_warning(&self) {
        let mut state = self.state.lock().await;
        state.attempt.acknowledge_warning();
    }

    // ─── Queries ──────────────────────────────────────────────────────────────

    pub async fn phase(&self) -> Phase {
        self.read(|state| state.attempt.phase()).await
    }

    pub async fn result(&self) -> Option<AttemptResult> {
        self.read(|state| state.attempt.result()).await
    }

    pub async fn view(&self) -> AttemptView {
        self.read(|state| AttemptView::from_attempt(&state.attempt))
            .await
    }

    pub async fn result_view(&self) -> Option<ResultView> {
        self.read(|state| ResultView::from_attempt(&state.attempt))
            .await
    }

    pub async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.read(|state| state.started_at).await
    }

    pub async fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.read(|state| state.completed_at).await
    }

    pub async fn summary_id(&self) -> Option<AttemptSummaryId> {
        *self.summary_id.lock().await
    }

    /// Copy of the underlying attempt, for inspection.
    pub async fn snapshot(&self) -> QuizAttempt {
        self.read(|state| state.attempt.clone()).await
    }

    pub(crate) async fn build_summary(&self) -> Result<AttemptSummary, AttemptServiceError> {
        let state = self.state.lock().await;
        let (Some(result), Some(started_at), Some(completed_at)) = (
            state.attempt.result(),
            state.started_at,
            state.completed_at,
        ) else {
            return Err(AttemptServiceError::NotFinished);
        };
        Ok(AttemptSummary::from_result(
            self.quiz_id,
            started_at,
            completed_at,
            &result,
            state.attempt.warnings_raised(),
        )?)
    }

    /// Append the summary of the finished attempt unless one is already stored.
    ///
    /// Returns the stored ID, plus the summary when this call appended it.
    /// Concurrent callers wait on the summary slot and then share its ID.
    pub(crate) async fn store_summary(
        &self,
        summaries: &dyn AttemptSummaryRepository,
    ) -> Result<(AttemptSummaryId, Option<AttemptSummary>), AttemptServiceError> {
        let mut stored = self.summary_id.lock().await;
        if let Some(id) = *stored {
            return Ok((id, None));
        }

        let summary = self.build_summary().await?;
        let id = summaries.append_summary(&summary).await?;
        *stored = Some(id);
        Ok((id, Some(summary)))
    }
}

impl fmt::Debug for AttemptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptSession")
            .field("quiz_id", &self.quiz_id)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ChannelSink, NoopSink};
    use quiz_core::AttemptEvent;
    use quiz_core::time::fixed_now;

    fn build_session(sink: Arc<dyn NotificationSink>) -> AttemptSession {
        let quiz = storage::sample::corporate_ethics().unwrap();
        AttemptSession::new(
            QuizAttempt::new(Arc::new(quiz)),
            Clock::fixed(fixed_now()),
            sink,
        )
    }

    #[tokio::test]
    async fn start_records_timestamp_and_notifies() {
        let (sink, mut rx) = ChannelSink::new();
        let session = build_session(Arc::new(sink));

        session.start().await.unwrap();

        assert_eq!(session.phase().await, Phase::InProgress);
        assert_eq!(session.started_at().await, Some(fixed_now()));
        assert_eq!(
            rx.recv().await,
            Some(AttemptEvent::Started {
                duration_secs: 1800
            })
        );
    }

    #[tokio::test]
    async fn errors_keep_their_kind() {
        let session = build_session(Arc::new(NoopSink));
        let err = session.record_answer(0, 0).await.unwrap_err();
        assert!(err.is_invalid_phase());

        session.start().await.unwrap();
        let err = session.go_to_question(5).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptServiceError::Attempt(AttemptError::OutOfRange { index: 5, .. })
        ));
        assert_eq!(session.view().await.question_number, 1);
    }

    #[tokio::test]
    async fn finish_sets_completion_and_result_view() {
        let session = build_session(Arc::new(NoopSink));
        session.start().await.unwrap();
        session.record_current_answer(1).await.unwrap();
        session.next().await.unwrap();
        session.record_current_answer(1).await.unwrap();

        let result = session.finish().await.unwrap();
        assert_eq!(result.correct, 2);
        assert_eq!(session.finish().await.unwrap(), result);
        assert_eq!(session.completed_at().await, Some(fixed_now()));

        let view = session.result_view().await.unwrap();
        assert_eq!(view.score_percent, 40);
        assert!(!view.passed);
    }

    #[tokio::test]
    async fn camera_toggle_is_reported() {
        let (sink, mut rx) = ChannelSink::new();
        let session = build_session(Arc::new(sink));

        assert!(!session.toggle_camera().await);
        assert!(session.start().await.is_err());
        assert!(session.toggle_camera().await);
        session.start().await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(AttemptEvent::CameraToggled { enabled: false })
        );
        assert_eq!(
            rx.recv().await,
            Some(AttemptEvent::CameraToggled { enabled: true })
        );
    }

    #[tokio::test]
    async fn clones_share_one_attempt() {
        let session = build_session(Arc::new(NoopSink));
        let other = session.clone();
        session.start().await.unwrap();
        other.record_answer(3, 3).await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.answer(3), Some(3));
    }

    #[tokio::test]
    async fn summary_requires_finished_attempt() {
        let session = build_session(Arc::new(NoopSink));
        session.start().await.unwrap();
        assert!(matches!(
            session.build_summary().await,
            Err(AttemptServiceError::NotFinished)
        ));

        session.finish().await.unwrap();
        let summary = session.build_summary().await.unwrap();
        assert_eq!(summary.total_questions(), 5);
        assert_eq!(summary.quiz_id(), session.quiz_id());
    }
}
