//! Frontier Finder common types and errors.
//!
//! This crate provides the pieces shared by every frontier-finder crate:
//! - The unified error taxonomy with stable codes
//! - Output format selection for the CLI

pub mod error;
pub mod output;

pub use error::{Error, ErrorCategory, Result};
pub use output::OutputFormat;

/// Version tag written into JSON output.
pub const SCHEMA_VERSION: &str = "1.0.0";
