//! Progress side channel for streaming hosts.
//!
//! Tools emit short status lines (`[cognee] auth ok`) while they work.
//! Hosts that stream to a user attach a [`ProgressSink`] to the
//! [`ToolContext`](crate::tool::ToolContext); hosts that don't simply
//! leave it out and the lines only reach the log.

use std::sync::Mutex;

/// Receives progress lines as they are produced.
pub trait ProgressSink: Send + Sync {
    fn send(&self, line: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn send(&self, line: &str) {
        self(line)
    }
}

/// Sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for CollectingSink {
    fn send(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
