#![forbid(unsafe_code)]

pub mod attempts;
pub mod error;
pub mod notify;

pub use quiz_core::Clock;

pub use attempts::{
    AttemptLoopService, AttemptSession, AttemptView, NavigatorItem, OptionView, QuizListItem,
    ResultView, SummaryListItem, TICK_PERIOD, TickerHandle, spawn_ticker,
};
pub use error::AttemptServiceError;
pub use notify::{ChannelSink, NoopSink, NotificationSink, TracingSink};
