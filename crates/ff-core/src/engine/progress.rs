//! Progress reporting and cancellation for long builds.
//!
//! The builder calls [`ProgressSink::checkpoint`] once per subset-size level.
//! A sink that answers [`Flow::Cancel`] stops the build, which then returns
//! [`crate::engine::BuildOutcome::Cancelled`].

use std::io::Write;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Whether the build should go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Cancel,
}

/// Progress at a level boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub event: String,
    /// Subset size about to be computed.
    pub level: usize,
    pub max_level: usize,
    /// Priors computed per subset, for multi-pi builds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pi_count: Option<usize>,
    pub elapsed_ms: u64,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(event: &str, level: usize, max_level: usize, message: impl Into<String>) -> Self {
        Self {
            event: event.to_string(),
            level,
            max_level,
            pi_count: None,
            elapsed_ms: 0,
            message: message.into(),
        }
    }

    pub fn with_pi_count(mut self, count: usize) -> Self {
        self.pi_count = Some(count);
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Receives progress and decides whether to continue.
pub trait ProgressSink {
    fn checkpoint(&mut self, event: &ProgressEvent) -> Flow;
}

/// Never cancels, reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn checkpoint(&mut self, _event: &ProgressEvent) -> Flow {
        Flow::Continue
    }
}

/// Adapts a `FnMut(&str) -> bool` callback; `false` cancels.
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: FnMut(&str) -> bool,
{
    fn checkpoint(&mut self, event: &ProgressEvent) -> Flow {
        if (self.0)(&event.message) {
            Flow::Continue
        } else {
            Flow::Cancel
        }
    }
}

/// Writes every event as one JSON line and never cancels.
pub struct JsonlProgress<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonlProgress<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write> ProgressSink for JsonlProgress<W> {
    fn checkpoint(&mut self, event: &ProgressEvent) -> Flow {
        if let Ok(writer) = self.writer.get_mut() {
            let _ = writeln!(writer, "{}", event.to_jsonl());
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_sink_cancels_on_false() {
        let mut calls = 0;
        let mut sink = FnProgress(|_: &str| {
            calls += 1;
            calls < 2
        });
        let event = ProgressEvent::new("build.level_done", 1, 3, "level 1");
        assert_eq!(sink.checkpoint(&event), Flow::Continue);
        assert_eq!(sink.checkpoint(&event), Flow::Cancel);
    }

    #[test]
    fn jsonl_sink_writes_one_line_per_event() {
        let mut sink = JsonlProgress::new(Vec::new());
        let event = ProgressEvent::new("build.level_done", 2, 4, "sets of size 2")
            .with_elapsed_ms(7)
            .with_pi_count(3);
        assert_eq!(sink.checkpoint(&event), Flow::Continue);
        let out = String::from_utf8(sink.writer.into_inner().unwrap()).unwrap();
        assert!(out.ends_with('\n'));
        assert!(out.contains(r#""level":2"#));
        assert!(out.contains(r#""pi_count":3"#));
    }
}
