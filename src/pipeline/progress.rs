//! Progress streaming between the coordinator and an observer.
//!
//! The coordinator reports each phase and each worker outcome to one
//! consumer. The buffer is unbounded so a slow or absent consumer never
//! stalls a worker; sends to a dropped receiver are ignored.

use crate::models::{ProgressEvent, Report};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// One item on the progress stream.
///
/// Zero or more `Progress` messages are followed by exactly one
/// `Result` or `Error`, after which the stream ends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamMessage {
    Progress(ProgressEvent),
    Result(Box<Report>),
    Error { message: String },
}

impl StreamMessage {
    /// Server-sent-events name for this message.
    pub fn event_name(&self) -> String {
        match self {
            StreamMessage::Progress(event) => {
                let status = serde_json::to_value(event.status)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_else(|| "unknown".to_string());
                format!("agent_{}", status)
            }
            StreamMessage::Result(_) => "result".to_string(),
            StreamMessage::Error { .. } => "error".to_string(),
        }
    }

    /// Format as a server-sent-events frame.
    pub fn to_sse(&self) -> String {
        let data = match self {
            StreamMessage::Progress(event) => serde_json::to_string(event),
            StreamMessage::Result(report) => serde_json::to_string(report),
            StreamMessage::Error { message } => {
                serde_json::to_string(&serde_json::json!({ "message": message }))
            }
        }
        .unwrap_or_else(|_| "{}".to_string());

        format!("event: {}\ndata: {}\n\n", self.event_name(), data)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamMessage::Progress(_))
    }
}

/// Producer handle.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

/// Consumer side of the progress stream.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<StreamMessage>,
}

/// Create a connected sink and receiver.
pub fn channel() -> (ProgressSink, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSink { tx }, ProgressReceiver { rx })
}

impl ProgressSink {
    /// Fire-and-forget delivery of a progress event.
    pub fn emit(&self, event: ProgressEvent) {
        self.send(StreamMessage::Progress(event));
    }

    /// Deliver the terminal message.
    pub(crate) fn finish(self, message: StreamMessage) {
        debug_assert!(message.is_terminal());
        self.send(message);
    }

    fn send(&self, message: StreamMessage) {
        if self.tx.send(message).is_err() {
            debug!("Progress receiver dropped; discarding message");
        }
    }
}

impl ProgressReceiver {
    /// Next message, or `None` once every sink is gone.
    pub async fn recv(&mut self) -> Option<StreamMessage> {
        self.rx.recv().await
    }

    /// Drain the stream until it closes.
    #[allow(dead_code)] // Convenience for embedders that buffer the stream
    pub async fn collect(mut self) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv().await {
            messages.push(message);
        }
        messages
    }
}
