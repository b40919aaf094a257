//! Progress event protocol
//!
//! Ordered status messages describing run advancement, produced by the
//! orchestrator and concurrent branch runners, drained by a single consumer.
//! The wire shape is stable for SSE-style consumers:
//! `{"status": "running"|"output"|"error"|"completed", "step": int,
//! "total": int, "message"?: string, "output"?: string|array}`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::FlowError;

/// Run advancement states
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Output,
    Error,
    Completed,
}

/// Step output payload: one string for plain/merge steps, a list of strings
/// for a branch step's completion summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StepOutput {
    Text(String),
    Many(Vec<String>),
}

/// Single event in a run's progress stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub status: RunStatus,
    /// Leaf-step counter (1-based); `total` is fixed for the whole run
    pub step: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<StepOutput>,
}

impl ProgressEvent {
    pub fn running(step: usize, total: usize) -> Self {
        Self {
            status: RunStatus::Running,
            step,
            total,
            message: None,
            output: None,
        }
    }

    pub fn output(step: usize, total: usize, output: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Output,
            step,
            total,
            message: None,
            output: Some(StepOutput::Text(output.into())),
        }
    }

    pub fn branch_output(step: usize, total: usize, outputs: Vec<String>) -> Self {
        Self {
            status: RunStatus::Output,
            step,
            total,
            message: None,
            output: Some(StepOutput::Many(outputs)),
        }
    }

    pub fn error(step: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Error,
            step,
            total,
            message: Some(message.into()),
            output: None,
        }
    }

    pub fn completed(total: usize) -> Self {
        Self {
            status: RunStatus::Completed,
            step: total,
            total,
            message: None,
            output: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Render as one Server-Sent-Events frame: `data: <json>\n\n`
    pub fn to_sse(&self) -> String {
        format!(
            "data: {}\n\n",
            serde_json::to_string(self).unwrap_or_default()
        )
    }
}

/// Producer half of the progress channel.
///
/// Cloned into every branch runner; enqueue never blocks. The error guard
/// makes a run emit at most one `error` event even when sibling branches
/// fail at the same time.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    error_emitted: Arc<AtomicBool>,
}

impl ProgressSender {
    /// Create the progress channel for one run
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                error_emitted: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    /// Enqueue an event. Fails only when the consumer dropped the receiver,
    /// which is fatal to the run.
    pub fn emit(&self, event: ProgressEvent) -> Result<(), FlowError> {
        self.tx.send(event).map_err(|_| FlowError::ChannelClosed)
    }

    /// Emit an error event unless one was already emitted for this run
    pub fn emit_error(
        &self,
        step: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Result<(), FlowError> {
        if self.error_emitted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.emit(ProgressEvent::error(step, total, message))
    }
}

/// Wrap a receiver as a Stream for SSE-style consumers
pub fn into_stream(
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
) -> UnboundedReceiverStream<ProgressEvent> {
    UnboundedReceiverStream::new(rx)
}
