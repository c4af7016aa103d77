//! Text formats: sensor files, config lists, policy trees, saved frontiers.
//!
//! Pure parsers return [`ParseError`], which carries the source label, a
//! position (line number for line formats, byte offset for trees) and the
//! offending text. File-level helpers return [`EngineError`] so I/O failures
//! surface unchanged.

pub mod config_list;
pub mod report;
pub mod sensor_file;
pub mod tree_parser;

pub use config_list::{load_sensors, parse_config_list, SensorEntry};
pub use report::{
    parse_report, read_report, report_json, report_string, write_report, FrontierReport,
    SavedFrontier,
};
pub use sensor_file::{
    parse_sensor_display, parse_sensor_text, read_sensor_file, sensor_name_from_path, sensor_text,
};
pub use tree_parser::PolicyParser;

use thiserror::Error;

use crate::engine::EngineError;

/// A malformed piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", EngineError::data_format(origin.clone(), *position, text.clone(), message.clone()))]
pub struct ParseError {
    pub origin: String,
    pub position: Option<usize>,
    pub text: String,
    pub message: String,
}

impl ParseError {
    pub fn new(
        origin: impl Into<String>,
        position: Option<usize>,
        text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            position,
            text: text.into(),
            message: message.into(),
        }
    }

    /// An error on 1-based line `line`.
    pub fn at_line(
        origin: &str,
        line: usize,
        text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(origin, Some(line), text, message)
    }
}

impl From<ParseError> for EngineError {
    fn from(err: ParseError) -> Self {
        EngineError::DataFormat {
            origin: err.origin,
            position: err.position,
            text: err.text,
            message: err.message,
        }
    }
}

/// Whether `name` can be used in a policy tree.
pub fn is_sensor_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
