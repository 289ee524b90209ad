//! Attempt orchestration: shared sessions, the countdown ticker and the views
//! handed to the presentation layer.

mod service;
mod session;
mod ticker;
mod view;

pub use service::AttemptLoopService;
pub use session::AttemptSession;
pub use ticker::{TICK_PERIOD, TickerHandle, spawn_ticker};
pub use view::{AttemptView, NavigatorItem, OptionView, QuizListItem, ResultView, SummaryListItem};
