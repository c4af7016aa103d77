//! Structured logging for frontier-finder.
//!
//! Two output modes share one event vocabulary:
//! - Human-readable console output for interactive use
//! - JSONL for scripted pipelines
//!
//! stdout is reserved for command payloads (saved frontiers, JSON); all
//! log output goes to stderr.

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, Verbosity};
pub use events::{event_names, Stage};

use std::io::IsTerminal;

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber on stderr. Returns `false` if one was
/// already set.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = config.filter();
    match config.format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(std::io::stderr().is_terminal()),
            )
            .try_init()
            .is_ok(),
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn second_init_is_refused() {
        let config = LogConfig {
            format: LogFormat::Human,
            verbosity: Verbosity::Level(LevelFilter::OFF),
            ignored: Vec::new(),
        };
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
