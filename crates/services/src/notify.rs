//! Delivery of attempt events to whatever shows toasts to the user.

use quiz_core::AttemptEvent;
use quiz_core::model::QuizId;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

/// Receives events emitted by an attempt session.
///
/// Called after the session lock is released; implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, quiz_id: QuizId, event: &AttemptEvent);
}

/// Writes every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, quiz_id: QuizId, event: &AttemptEvent) {
        match event {
            AttemptEvent::Started { duration_secs } => {
                info!(%quiz_id, duration_secs, "attempt started");
            }
            AttemptEvent::WarningRaised { message } => {
                warn!(%quiz_id, %message, "proctoring warning raised");
            }
            AttemptEvent::CameraToggled { enabled } => {
                info!(%quiz_id, enabled, "proctoring camera toggled");
            }
            AttemptEvent::Finished {
                score_percent,
                auto_submitted,
            } => {
                info!(%quiz_id, score_percent, auto_submitted, "attempt finished");
            }
        }
    }
}

/// Forwards events to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AttemptEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AttemptEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, quiz_id: QuizId, event: &AttemptEvent) {
        if self.tx.send(event.clone()).is_err() {
            trace!(%quiz_id, ?event, "event dropped, receiver closed");
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _quiz_id: QuizId, _event: &AttemptEvent) {}
}
