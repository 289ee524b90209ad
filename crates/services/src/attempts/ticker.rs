use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use quiz_core::Phase;

use super::session::AttemptSession;

/// Real-time countdown resolution.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Owns the background countdown task of one attempt.
///
/// Dropping the handle aborts the task.
#[derive(Debug)]
pub struct TickerHandle {
    handle: Option<JoinHandle<()>>,
}

impl TickerHandle {
    /// True once the countdown task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait until the countdown stops on its own.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "ticker task failed");
                }
            }
        }
    }

    /// Stop delivering ticks.
    pub fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawn a task that calls `tick()` once per `period` while the attempt is in
/// progress.
///
/// The first tick lands one full period after spawning. Ticks missed while
/// the runtime was busy are delivered in a burst so elapsed time is never
/// lost. The task ends on its own once the attempt leaves `InProgress`,
/// whether by timing out or by a manual finish.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn spawn_ticker(session: AttemptSession, period: Duration) -> TickerHandle {
    let handle = tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            interval.tick().await;
            match session.tick().await {
                Ok(Phase::InProgress) => {}
                Ok(phase) => {
                    debug!(quiz_id = %session.quiz_id(), %phase, "countdown ended");
                    break;
                }
                Err(err) if err.is_invalid_phase() => {
                    debug!(quiz_id = %session.quiz_id(), "attempt left progress, countdown stopped");
                    break;
                }
                Err(err) => {
                    warn!(quiz_id = %session.quiz_id(), error = %err, "countdown stopped on error");
                    break;
                }
            }
        }
    });

    TickerHandle {
        handle: Some(handle),
    }
}
