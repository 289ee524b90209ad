use async_trait::async_trait;
use quiz_core::model::{AttemptSummary, QuizDefinition, QuizError, QuizId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::sample;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    InvalidQuiz(#[from] QuizError),
}

/// Identifier assigned to a stored attempt summary.
pub type AttemptSummaryId = i64;

/// Stored summary together with its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummaryRow {
    pub id: AttemptSummaryId,
    pub summary: AttemptSummary,
}

/// Read-only access to the quiz catalogue.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: QuizId) -> Result<QuizDefinition, StorageError>;

    /// List every quiz, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalogue cannot be read.
    async fn list_quizzes(&self) -> Result<Vec<QuizDefinition>, StorageError>;
}

/// Append-only log of finished attempts.
#[async_trait]
pub trait AttemptSummaryRepository: Send + Sync {
    /// Store a summary and return its new ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &AttemptSummary)
    -> Result<AttemptSummaryId, StorageError>;

    /// Fetch a summary by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_summary(&self, id: AttemptSummaryId) -> Result<AttemptSummary, StorageError>;

    /// Summaries for one quiz, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read.
    async fn list_summaries(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptSummaryRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<BTreeMap<QuizId, QuizDefinition>>>,
    summaries: Arc<Mutex<Vec<AttemptSummaryRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-loaded with the built-in sample quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuiz` if the sample data fails validation.
    pub fn with_sample_data() -> Result<Self, StorageError> {
        let repo = Self::new();
        repo.insert_quiz(sample::corporate_ethics()?)?;
        Ok(repo)
    }

    /// Add a quiz to the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a quiz with the same ID exists.
    pub fn insert_quiz(&self, quiz: QuizDefinition) -> Result<(), StorageError> {
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&quiz.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(quiz.id(), quiz);
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn get_quiz(&self, id: QuizId) -> Result<QuizDefinition, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_quizzes(&self) -> Result<Vec<QuizDefinition>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

#[async_trait]
impl AttemptSummaryRepository for InMemoryRepository {
    async fn append_summary(
        &self,
        summary: &AttemptSummary,
    ) -> Result<AttemptSummaryId, StorageError> {
        let mut guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = AttemptSummaryId::try_from(guard.len())
            .map_err(|e| StorageError::Connection(e.to_string()))?
            + 1;
        guard.push(AttemptSummaryRow {
            id,
            summary: summary.clone(),
        });
        Ok(id)
    }

    async fn get_summary(&self, id: AttemptSummaryId) -> Result<AttemptSummary, StorageError> {
        let guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.summary.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_summaries(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptSummaryRow>, StorageError> {
        let guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<_> = guard
            .iter()
            .filter(|row| row.summary.quiz_id() == quiz_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub summaries: Arc<dyn AttemptSummaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let summaries: Arc<dyn AttemptSummaryRepository> = Arc::new(repo);
        Self { quizzes, summaries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::attempt::AttemptResult;
    use quiz_core::model::{Question, QuestionId, QuizDraft};
    use quiz_core::time::fixed_now;

    fn build_quiz(id: u64) -> QuizDefinition {
        let mut draft = QuizDraft::new(QuizId::new(id), format!("Quiz {id}"));
        draft.questions = vec![
            Question::true_false(QuestionId::new(1), "Q", true)
                .unwrap()
                .into(),
        ];
        draft.validate().unwrap()
    }

    fn build_summary(quiz_id: u64, offset_secs: i64) -> AttemptSummary {
        let result = AttemptResult {
            score_percent: 100,
            correct: 1,
            total: 1,
            answered: 1,
            time_taken_secs: 10,
            passed: true,
            auto_submitted: false,
        };
        let now = fixed_now();
        AttemptSummary::from_result(
            QuizId::new(quiz_id),
            now,
            now + chrono::Duration::seconds(offset_secs),
            &result,
            0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stores_and_lists_quizzes_in_id_order() {
        let repo = InMemoryRepository::new();
        repo.insert_quiz(build_quiz(2)).unwrap();
        repo.insert_quiz(build_quiz(1)).unwrap();

        let quizzes = repo.list_quizzes().await.unwrap();
        let ids: Vec<u64> = quizzes.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);

        let fetched = repo.get_quiz(QuizId::new(2)).await.unwrap();
        assert_eq!(fetched.title(), "Quiz 2");
    }

    #[tokio::test]
    async fn missing_quiz_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_quiz(QuizId::new(7)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[test]
    fn duplicate_quiz_conflicts() {
        let repo = InMemoryRepository::new();
        repo.insert_quiz(build_quiz(1)).unwrap();
        let err = repo.insert_quiz(build_quiz(1)).unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn summaries_get_sequential_ids() {
        let repo = InMemoryRepository::new();
        let first = repo.append_summary(&build_summary(1, 10)).await.unwrap();
        let second = repo.append_summary(&build_summary(1, 20)).await.unwrap();
        assert_eq!((first, second), (1, 2));

        let fetched = repo.get_summary(second).await.unwrap();
        assert_eq!(fetched, build_summary(1, 20));
        assert!(matches!(
            repo.get_summary(99).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn list_summaries_filters_and_orders_newest_first() {
        let repo = InMemoryRepository::new();
        let old = repo.append_summary(&build_summary(1, 10)).await.unwrap();
        let _other = repo.append_summary(&build_summary(2, 30)).await.unwrap();
        let new = repo.append_summary(&build_summary(1, 20)).await.unwrap();

        let rows = repo.list_summaries(QuizId::new(1), 10).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![new, old]);

        let limited = repo.list_summaries(QuizId::new(1), 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, new);
    }

    #[tokio::test]
    async fn sample_data_is_loaded() {
        let storage = Storage::from_repository(InMemoryRepository::with_sample_data().unwrap());
        let quizzes = storage.quizzes.list_quizzes().await.unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].id(), sample::CORPORATE_ETHICS_ID);
    }
}
