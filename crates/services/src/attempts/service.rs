use std::sync::Arc;
use std::time::Duration;

use rand::rng;
use rand::seq::SliceRandom;
use tracing::info;

use quiz_core::QuizAttempt;
use quiz_core::model::{ProctoringSettings, QuizDefinition, QuizId};
use storage::{AttemptSummaryId, AttemptSummaryRepository, QuizRepository, Storage};

use super::session::AttemptSession;
use super::ticker::{TICK_PERIOD, TickerHandle, spawn_ticker};
use super::view::{QuizListItem, SummaryListItem};
use crate::Clock;
use crate::error::AttemptServiceError;
use crate::notify::{NotificationSink, TracingSink};

/// Orchestrates opening, running and recording quiz attempts.
#[derive(Clone)]
pub struct AttemptLoopService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    summaries: Arc<dyn AttemptSummaryRepository>,
    sink: Arc<dyn NotificationSink>,
    settings: ProctoringSettings,
    tick_period: Duration,
}

impl AttemptLoopService {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage) -> Self {
        Self {
            clock,
            quizzes: storage.quizzes,
            summaries: storage.summaries,
            sink: Arc::new(TracingSink),
            settings: ProctoringSettings::default(),
            tick_period: TICK_PERIOD,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ProctoringSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Override the countdown period; one second unless testing or demoing.
    #[must_use]
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    /// List the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Storage` on repository failures.
    pub async fn list_quizzes(&self) -> Result<Vec<QuizListItem>, AttemptServiceError> {
        let quizzes = self.quizzes.list_quizzes().await?;
        Ok(quizzes.iter().map(QuizListItem::from_quiz).collect())
    }

    /// Open a not-yet-started attempt for a catalogue quiz.
    ///
    /// Only recorded attempts count against `attempts_allowed`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::NotAvailable` outside the quiz's
    /// availability window, `AttemptServiceError::AttemptLimitReached` once
    /// the stored summaries reach its attempt limit, and
    /// `AttemptServiceError::Storage` if the quiz cannot be loaded.
    pub async fn open_attempt(&self, quiz_id: QuizId) -> Result<AttemptSession, AttemptServiceError> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        if !quiz.is_available_at(self.clock.now()) {
            return Err(AttemptServiceError::NotAvailable { quiz_id });
        }
        if let Some(allowed) = quiz.attempts_allowed() {
            let used = self.summaries.list_summaries(quiz_id, allowed).await?;
            if used.len() >= usize::try_from(allowed).unwrap_or(usize::MAX) {
                return Err(AttemptServiceError::AttemptLimitReached { quiz_id, allowed });
            }
        }
        Ok(self.open_attempt_for(quiz))
    }

    /// Open a not-yet-started attempt for a quiz supplied by the caller.
    ///
    /// No availability or attempt-limit checks; see [`Self::open_attempt`].
    ///
    /// Quizzes flagged `randomize_questions` get a fresh question order.
    #[must_use]
    pub fn open_attempt_for(&self, quiz: QuizDefinition) -> AttemptSession {
        let quiz = if quiz.randomize_questions() {
            quiz.reordered(|questions| questions.shuffle(&mut rng()))
        } else {
            quiz
        };
        let attempt = QuizAttempt::with_settings(Arc::new(quiz), self.settings.clone());
        AttemptSession::new(attempt, self.clock, Arc::clone(&self.sink))
    }

    /// Start the attempt and its countdown.
    ///
    /// Keep the returned handle alive for as long as the countdown should run.
    ///
    /// # Errors
    ///
    /// Propagates start failures (wrong phase, camera disabled).
    pub async fn start(&self, session: &AttemptSession) -> Result<TickerHandle, AttemptServiceError> {
        session.start().await?;
        Ok(spawn_ticker(session.clone(), self.tick_period))
    }

    /// Persist the summary of a finished attempt.
    ///
    /// Idempotent, also under concurrent calls: once stored, the same ID is
    /// returned again.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::NotFinished` if the attempt is still open,
    /// or `AttemptServiceError::Storage` if persistence fails.
    pub async fn finalize_summary(
        &self,
        session: &AttemptSession,
    ) -> Result<AttemptSummaryId, AttemptServiceError> {
        let (id, appended) = session.store_summary(self.summaries.as_ref()).await?;
        let Some(summary) = appended else {
            return Ok(id);
        };
        info!(
            quiz_id = %summary.quiz_id(),
            summary_id = id,
            score_percent = summary.score_percent(),
            passed = summary.passed(),
            "attempt summary stored"
        );
        Ok(id)
    }

    /// Most recent stored results for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Storage` on repository failures.
    pub async fn recent_results(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<SummaryListItem>, AttemptServiceError> {
        let rows = self.summaries.list_summaries(quiz_id, limit).await?;
        Ok(rows.iter().map(SummaryListItem::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use quiz_core::Phase;
    use quiz_core::model::{AttemptSummary, Question, QuestionId, QuizDraft};
    use quiz_core::time::fixed_now;
    use storage::sample::CORPORATE_ETHICS_ID;
    use storage::{AttemptSummaryRow, InMemoryRepository, StorageError};

    use crate::notify::NoopSink;

    fn build_service(repo: &InMemoryRepository) -> AttemptLoopService {
        AttemptLoopService::new(
            Clock::fixed(fixed_now()),
            Storage::from_repository(repo.clone()),
        )
        .with_sink(Arc::new(NoopSink))
    }

    /// Summary log that gives way to other tasks before every write.
    struct YieldingSummaries(InMemoryRepository);

    #[async_trait]
    impl AttemptSummaryRepository for YieldingSummaries {
        async fn append_summary(
            &self,
            summary: &AttemptSummary,
        ) -> Result<AttemptSummaryId, StorageError> {
            tokio::task::yield_now().await;
            self.0.append_summary(summary).await
        }

        async fn get_summary(&self, id: AttemptSummaryId) -> Result<AttemptSummary, StorageError> {
            self.0.get_summary(id).await
        }

        async fn list_summaries(
            &self,
            quiz_id: QuizId,
            limit: u32,
        ) -> Result<Vec<AttemptSummaryRow>, StorageError> {
            self.0.list_summaries(quiz_id, limit).await
        }
    }

    fn insert_single_question_quiz(
        repo: &InMemoryRepository,
        edit: impl FnOnce(&mut QuizDraft),
    ) -> QuizId {
        let id = QuizId::new(7);
        let mut draft = QuizDraft::new(id, "Gifts policy");
        draft.questions = vec![
            Question::true_false(QuestionId::new(1), "Declare gifts?", true)
                .unwrap()
                .into(),
        ];
        edit(&mut draft);
        repo.insert_quiz(draft.validate().unwrap()).unwrap();
        id
    }

    async fn finish_and_record(service: &AttemptLoopService, session: &AttemptSession) {
        session.start().await.unwrap();
        session.finish().await.unwrap();
        service.finalize_summary(session).await.unwrap();
    }

    fn numbered_quiz(randomize: bool) -> QuizDefinition {
        let mut draft = QuizDraft::new(QuizId::new(5), "Numbers");
        draft.randomize_questions = randomize;
        draft.questions = (1..=20)
            .map(|id| {
                Question::true_false(QuestionId::new(id), format!("Q{id}"), true)
                    .unwrap()
                    .into()
            })
            .collect();
        draft.validate().unwrap()
    }

    #[tokio::test]
    async fn open_unknown_quiz_is_storage_error() {
        let repo = InMemoryRepository::new();
        let service = build_service(&repo);
        let err = service.open_attempt(QuizId::new(42)).await.unwrap_err();
        assert!(matches!(err, AttemptServiceError::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn lists_sample_catalogue() {
        let repo = InMemoryRepository::with_sample_data().unwrap();
        let service = build_service(&repo);
        let items = service.list_quizzes().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question_count, 5);
    }

    #[tokio::test]
    async fn fixed_order_is_kept_without_randomize() {
        let repo = InMemoryRepository::new();
        let session = build_service(&repo).open_attempt_for(numbered_quiz(false));
        let snapshot = session.snapshot().await;
        let ids: Vec<u64> = snapshot
            .quiz()
            .questions()
            .iter()
            .map(|q| q.id().value())
            .collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn randomize_keeps_every_question() {
        let repo = InMemoryRepository::new();
        let session = build_service(&repo).open_attempt_for(numbered_quiz(true));
        let snapshot = session.snapshot().await;
        let mut ids: Vec<u64> = snapshot
            .quiz()
            .questions()
            .iter()
            .map(|q| q.id().value())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
        assert_eq!(snapshot.answers().len(), 20);
    }

    #[tokio::test]
    async fn finalize_requires_finished_attempt() {
        let repo = InMemoryRepository::with_sample_data().unwrap();
        let service = build_service(&repo);
        let session = service
            .open_attempt(CORPORATE_ETHICS_ID)
            .await
            .unwrap();

        let err = service.finalize_summary(&session).await.unwrap_err();
        assert!(matches!(err, AttemptServiceError::NotFinished));
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_is_idempotent() {
        let repo = InMemoryRepository::with_sample_data().unwrap();
        let service = build_service(&repo);
        let session = service
            .open_attempt(CORPORATE_ETHICS_ID)
            .await
            .unwrap();
        let ticker = service.start(&session).await.unwrap();
        session.record_answer(0, 1).await.unwrap();
        session.finish().await.unwrap();
        ticker.join().await;

        let first = service.finalize_summary(&session).await.unwrap();
        let second = service.finalize_summary(&session).await.unwrap();
        assert_eq!(first, second);

        let results = service
            .recent_results(CORPORATE_ETHICS_ID, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score_percent, 20);
        assert_eq!(session.phase().await, Phase::Finished);
    }

    #[tokio::test]
    async fn concurrent_finalize_stores_one_summary() {
        let repo = InMemoryRepository::with_sample_data().unwrap();
        let storage = Storage {
            quizzes: Arc::new(repo.clone()),
            summaries: Arc::new(YieldingSummaries(repo.clone())),
        };
        let service = AttemptLoopService::new(Clock::fixed(fixed_now()), storage)
            .with_sink(Arc::new(NoopSink));
        let session = service.open_attempt(CORPORATE_ETHICS_ID).await.unwrap();
        session.start().await.unwrap();
        session.finish().await.unwrap();

        let (first, second) = tokio::join!(
            service.finalize_summary(&session),
            service.finalize_summary(&session)
        );
        assert_eq!(first.unwrap(), second.unwrap());

        let rows = repo.list_summaries(CORPORATE_ETHICS_ID, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn quiz_outside_its_window_cannot_be_opened() {
        let repo = InMemoryRepository::new();
        let upcoming = insert_single_question_quiz(&repo, |draft| {
            draft.available_from = Some(fixed_now() + ChronoDuration::hours(1));
        });
        let service = build_service(&repo);
        let err = service.open_attempt(upcoming).await.unwrap_err();
        assert!(matches!(err, AttemptServiceError::NotAvailable { quiz_id } if quiz_id == upcoming));

        let repo = InMemoryRepository::new();
        let closed = insert_single_question_quiz(&repo, |draft| {
            draft.available_from = Some(fixed_now() - ChronoDuration::days(2));
            draft.available_until = Some(fixed_now());
        });
        let service = build_service(&repo);
        assert!(matches!(
            service.open_attempt(closed).await,
            Err(AttemptServiceError::NotAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn quiz_inside_its_window_opens() {
        let repo = InMemoryRepository::new();
        let quiz_id = insert_single_question_quiz(&repo, |draft| {
            draft.available_from = Some(fixed_now() - ChronoDuration::days(1));
            draft.available_until = Some(fixed_now() + ChronoDuration::days(1));
        });
        let session = build_service(&repo).open_attempt(quiz_id).await.unwrap();
        assert_eq!(session.phase().await, Phase::NotStarted);
    }

    #[tokio::test]
    async fn attempt_limit_counts_recorded_attempts() {
        let repo = InMemoryRepository::new();
        let quiz_id = insert_single_question_quiz(&repo, |draft| {
            draft.attempts_allowed = Some(2);
        });
        let service = build_service(&repo);

        let first = service.open_attempt(quiz_id).await.unwrap();
        finish_and_record(&service, &first).await;
        let second = service.open_attempt(quiz_id).await.unwrap();
        finish_and_record(&service, &second).await;

        let err = service.open_attempt(quiz_id).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptServiceError::AttemptLimitReached { allowed: 2, .. }
        ));
    }
}
