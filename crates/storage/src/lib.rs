#![forbid(unsafe_code)]

pub mod repository;
pub mod sample;

pub use repository::{
    AttemptSummaryId, AttemptSummaryRepository, AttemptSummaryRow, InMemoryRepository,
    QuizRepository, Storage, StorageError,
};
