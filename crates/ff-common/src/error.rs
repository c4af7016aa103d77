//! Error types for Frontier Finder.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Malformed Input
//!   Reason: sensorA.txt:4: point[2] (0.3, 0.5) is not an increment over the previous point
//!   Fix: Check the file against the expected text format ...
//! ```
//!
//! # Machine-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "input",
//!   "message": "sensorA.txt:4: point[2] (0.3, 0.5) is not an increment ...",
//!   "context": { "origin": "sensorA.txt", "position": 4 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Frontier Finder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Option values and option files.
    Config,
    /// Malformed sensor files, config lists, policy trees, saved frontiers.
    Input,
    /// Too many sensors or copies for the subset index space.
    Capacity,
    /// Internal-consistency failures inside the engine.
    Engine,
    /// The caller stopped the computation.
    Cancelled,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Capacity => write!(f, "capacity"),
            ErrorCategory::Engine => write!(f, "engine"),
            ErrorCategory::Cancelled => write!(f, "cancelled"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Frontier Finder.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for option {name}: {message}")]
    InvalidOption { name: String, message: String },

    // Input errors (20-29)
    #[error("{}", format_located(origin, *position, message))]
    DataFormat {
        origin: String,
        position: Option<usize>,
        message: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Capacity errors (30-39)
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    // Engine errors (40-49)
    #[error("internal consistency violation: {0}")]
    Invariant(String),

    // Cancellation (50)
    #[error("computation cancelled {0}")]
    Cancelled(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_located(origin: &str, position: Option<usize>, message: &str) -> String {
    match position {
        Some(pos) => format!("{}:{}: {}", origin, pos, message),
        None => format!("{}: {}", origin, message),
    }
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Input errors
    /// - 30-39: Capacity errors
    /// - 40-49: Engine errors
    /// - 50: Cancellation
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidOption { .. } => 11,
            Error::DataFormat { .. } => 20,
            Error::InvalidArgument(_) => 21,
            Error::Capacity(_) => 30,
            Error::Invariant(_) => 40,
            Error::Cancelled(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidOption { .. } => ErrorCategory::Config,
            Error::DataFormat { .. } | Error::InvalidArgument(_) => ErrorCategory::Input,
            Error::Capacity(_) => ErrorCategory::Capacity,
            Error::Invariant(_) => ErrorCategory::Engine,
            Error::Cancelled(_) => ErrorCategory::Cancelled,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Check the options file (FF_CONFIG or ~/.config/frontier-finder/options.json) and FF_* environment variables."
            }
            Error::InvalidOption { .. } => {
                "Run 'frontier-finder --help' for the accepted range of each option."
            }
            Error::DataFormat { .. } => {
                "Check the file against the expected text format; sensor files start with a 'cost' line, then '0 0', and end with '1 1'."
            }
            Error::InvalidArgument(_) => {
                "Budgets must lie between 0 and the INSPECT cost; detection rates between 0 and 1."
            }
            Error::Capacity(_) => {
                "Reduce the number of sensors or copies, or approximate the problem with --max-depth."
            }
            Error::Invariant(_) => {
                "This is a bug. Re-run with --paranoid and FF_LOG=debug, and report the inputs."
            }
            Error::Cancelled(_) => "The computation was stopped on request; no partial result was produced.",
            Error::Io(_) => "Check that the listed files exist and are readable.",
            Error::Json(_) => "Invalid JSON in the options file. Check its syntax.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidOption { .. } => "Invalid Option",
            Error::DataFormat { .. } => "Malformed Input",
            Error::InvalidArgument(_) => "Invalid Argument",
            Error::Capacity(_) => "Problem Too Large",
            Error::Invariant(_) => "Internal Consistency Error",
            Error::Cancelled(_) => "Cancelled",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }

    /// Formats the error as headline, reason and fix for terminals.
    pub fn to_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Additional structured context (e.g., file name, position).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        if let Error::DataFormat {
            origin, position, ..
        } = err
        {
            context.insert("origin".to_string(), serde_json::json!(origin));
            if let Some(pos) = position {
                context.insert("position".to_string(), serde_json::json!(pos));
            }
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        let cases = [
            (Error::Config("x".into()), ErrorCategory::Config, 10..20),
            (
                Error::DataFormat {
                    origin: "a.txt".into(),
                    position: Some(3),
                    message: "bad".into(),
                },
                ErrorCategory::Input,
                20..30,
            ),
            (Error::Capacity("x".into()), ErrorCategory::Capacity, 30..40),
            (Error::Invariant("x".into()), ErrorCategory::Engine, 40..50),
            (Error::Cancelled("x".into()), ErrorCategory::Cancelled, 50..51),
        ];
        for (err, category, range) in cases {
            assert_eq!(err.category(), category);
            assert!(range.contains(&err.code()), "{} not in {:?}", err.code(), range);
        }
    }

    #[test]
    fn data_format_message_carries_position() {
        let err = Error::DataFormat {
            origin: "sensorB.txt".into(),
            position: Some(4),
            message: "end point is not (1,1)".into(),
        };
        assert_eq!(err.to_string(), "sensorB.txt:4: end point is not (1,1)");

        let err = Error::DataFormat {
            origin: "tree".into(),
            position: None,
            message: "unknown sensor".into(),
        };
        assert_eq!(err.to_string(), "tree: unknown sensor");
    }

    #[test]
    fn structured_error_includes_context() {
        let err = Error::DataFormat {
            origin: "config.txt".into(),
            position: Some(2),
            message: "empty".into(),
        };
        let s = StructuredError::from(&err);
        assert_eq!(s.code, 20);
        assert_eq!(s.context["origin"], serde_json::json!("config.txt"));
        assert_eq!(s.context["position"], serde_json::json!(2));
        assert!(s.to_json().contains("\"category\":\"input\""));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.category(), ErrorCategory::Io);
        assert!(err.to_human().starts_with("✗ I/O Error"));
    }
}
