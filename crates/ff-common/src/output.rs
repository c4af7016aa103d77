//! Output format specifications.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The sectioned text report that `read` can load back
    #[default]
    Text,

    /// Structured JSON for machine consumption
    Json,

    /// One-line summary per frontier
    Summary,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn display_matches_serde_names() {
        for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Summary] {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format));
        }
    }
}
