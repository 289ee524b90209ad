#![forbid(unsafe_code)]

pub mod attempt;
pub mod model;
pub mod scoring;
pub mod time;

pub use attempt::{
    AttemptError, AttemptEvent, AttemptProgress, AttemptResult, IndexTarget, Phase, QuizAttempt,
};
pub use time::Clock;
