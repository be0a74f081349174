//! Progress reporting for long-running generation runs.
//!
//! The pipeline and the resilient model client both narrate what they are
//! doing through a [`ProgressSink`]. Sinks are host-supplied: a UI forwards
//! updates over a channel, the CLI logs them. Delivery is strictly cosmetic;
//! a failing sink must never change pipeline control flow, which is why all
//! call sites go through [`emit`] instead of calling the sink directly.

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Error returned when a sink cannot deliver a notification.
#[derive(Debug, Error)]
#[error("Progress sink unavailable: {0}")]
pub struct ProgressError(pub String);

/// Receives human-readable status updates.
///
/// Implementations should return quickly; updates arrive from inside the
/// pipeline's single thread of control.
pub trait ProgressSink: Send + Sync {
    /// Deliver one status line to the host.
    fn notify(&self, message: &str) -> Result<(), ProgressError>;
}

/// Sink that logs every update through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn notify(&self, message: &str) -> Result<(), ProgressError> {
        tracing::info!("{message}");
        Ok(())
    }
}

/// Sink that forwards updates over an unbounded channel.
///
/// Used by hosts that render progress elsewhere (a UI event loop, a test
/// harness). Sending fails once the receiver is dropped; [`emit`] swallows
/// that.
pub struct ChannelSink {
    tx: UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink forwarding to `tx`.
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn notify(&self, message: &str) -> Result<(), ProgressError> {
        self.tx
            .send(message.to_string())
            .map_err(|e| ProgressError(e.to_string()))
    }
}

/// Deliver a status update, swallowing sink failures.
///
/// This is the non-critical path: real errors propagate through `Result`
/// returns, never through here.
pub fn emit(sink: &dyn ProgressSink, message: &str) {
    if let Err(err) = sink.notify(message) {
        tracing::debug!(error = %err, "progress notification dropped");
    }
}
