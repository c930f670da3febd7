use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

/// Real-time job progress, emitted in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    Log(String),
    /// Percent of entries completed, 0 to 100
    Progress(u8),
    Complete(PathBuf),
    Error(String),
}

impl ProgressEvent {
    /// Percent for `completed` of `total`, rounded
    pub fn progress(completed: usize, total: usize) -> Self {
        if total == 0 {
            return Self::Progress(100);
        }
        let percent = (100.0 * completed as f64 / total as f64).round();
        Self::Progress(percent.clamp(0.0, 100.0) as u8)
    }
}

/// Consumer of progress events. Transport is up to the implementor.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Forwards events to a tokio channel, e.g. for a server-push handler
pub struct ChannelSink {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // receiver gone means nobody is listening any more
        let _ = self.sender.send(event);
    }
}

/// Writes events to the log
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Log(message) => info!("{}", message),
            ProgressEvent::Progress(percent) => info!("Progress: {}%", percent),
            ProgressEvent::Complete(path) => info!("Translation saved: {}", path.display()),
            ProgressEvent::Error(message) => error!("Translation failed: {}", message),
        }
    }
}

/// Keeps every event; handy for embedding callers that poll
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
