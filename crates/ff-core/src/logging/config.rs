//! Log settings for the CLI.
//!
//! Verbosity comes from `-q`/`-v` first, then `FF_LOG` (a level name), then a
//! `RUST_LOG` directive, and defaults to `warn` so stderr stays quiet during
//! batch runs. `--log-format` or `FF_LOG_FORMAT` picks human or JSONL lines.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Human => write!(f, "human"),
            LogFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// How much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verbosity {
    /// One level for everything this crate emits.
    Level(LevelFilter),
    /// A raw `RUST_LOG` directive such as `ff_core::engine=trace`.
    Directive(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub verbosity: Verbosity,
    /// Environment values that did not parse, as `(variable, value)`.
    pub ignored: Vec<(&'static str, String)>,
}

impl LogConfig {
    /// Resolves settings from the `-v` count, `-q` and `--log-format`.
    pub fn from_env(verbose: u8, quiet: bool, format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), verbose, quiet, format)
    }

    /// Same as [`LogConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F, verbose: u8, quiet: bool, format: Option<LogFormat>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        let flag_level = match (quiet, verbose) {
            (true, _) => Some(LevelFilter::ERROR),
            (false, 0) => None,
            (false, 1) => Some(LevelFilter::DEBUG),
            (false, _) => Some(LevelFilter::TRACE),
        };
        let env_level = lookup("FF_LOG").and_then(|value| match value.trim().parse::<LevelFilter>() {
            Ok(level) => Some(level),
            Err(_) => {
                ignored.push(("FF_LOG", value));
                None
            }
        });
        let verbosity = match flag_level.or(env_level) {
            Some(level) => Verbosity::Level(level),
            None => match lookup("RUST_LOG").filter(|v| !v.trim().is_empty()) {
                Some(directive) => Verbosity::Directive(directive),
                None => Verbosity::Level(LevelFilter::WARN),
            },
        };

        let env_format = lookup("FF_LOG_FORMAT").and_then(|value| match value.parse::<LogFormat>() {
            Ok(format) => Some(format),
            Err(_) => {
                ignored.push(("FF_LOG_FORMAT", value));
                None
            }
        });

        LogConfig {
            format: format.or(env_format).unwrap_or_default(),
            verbosity,
            ignored,
        }
    }

    /// Subscriber filter. A plain level applies to `ff_core` only; a bad
    /// `RUST_LOG` directive falls back to the default.
    pub fn filter(&self) -> EnvFilter {
        match &self.verbosity {
            Verbosity::Level(level) => EnvFilter::new(format!("ff_core={}", level)),
            Verbosity::Directive(directive) => {
                EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("ff_core=warn"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_warn_and_human() {
        let config = LogConfig::from_lookup(lookup(&[]), 0, false, None);
        assert_eq!(config.verbosity, Verbosity::Level(LevelFilter::WARN));
        assert_eq!(config.format, LogFormat::Human);
        assert!(config.ignored.is_empty());
    }

    #[test]
    fn flags_beat_ff_log() {
        let env = [("FF_LOG", "info")];
        let quiet = LogConfig::from_lookup(lookup(&env), 2, true, None);
        assert_eq!(quiet.verbosity, Verbosity::Level(LevelFilter::ERROR));
        let loud = LogConfig::from_lookup(lookup(&env), 2, false, None);
        assert_eq!(loud.verbosity, Verbosity::Level(LevelFilter::TRACE));
        let env_only = LogConfig::from_lookup(lookup(&env), 0, false, None);
        assert_eq!(env_only.verbosity, Verbosity::Level(LevelFilter::INFO));
    }

    #[test]
    fn rust_log_is_used_as_a_directive_when_ff_log_is_unset() {
        let config = LogConfig::from_lookup(
            lookup(&[("RUST_LOG", "ff_core::engine=trace")]),
            0,
            false,
            None,
        );
        assert_eq!(
            config.verbosity,
            Verbosity::Directive("ff_core::engine=trace".to_string())
        );
        let shadowed = LogConfig::from_lookup(
            lookup(&[("RUST_LOG", "trace"), ("FF_LOG", "debug")]),
            0,
            false,
            None,
        );
        assert_eq!(shadowed.verbosity, Verbosity::Level(LevelFilter::DEBUG));
    }

    #[test]
    fn unparsable_values_are_reported() {
        let config = LogConfig::from_lookup(
            lookup(&[("FF_LOG", "chatty"), ("FF_LOG_FORMAT", "xml")]),
            0,
            false,
            None,
        );
        assert_eq!(config.verbosity, Verbosity::Level(LevelFilter::WARN));
        assert_eq!(config.format, LogFormat::Human);
        assert_eq!(
            config.ignored,
            vec![
                ("FF_LOG", "chatty".to_string()),
                ("FF_LOG_FORMAT", "xml".to_string())
            ]
        );
    }

    #[test]
    fn format_flag_beats_env() {
        let env = lookup(&[("FF_LOG_FORMAT", "jsonl")]);
        assert_eq!(LogConfig::from_lookup(&env, 0, false, None).format, LogFormat::Jsonl);
        assert_eq!(
            LogConfig::from_lookup(&env, 0, false, Some(LogFormat::Human)).format,
            LogFormat::Human
        );
    }
}
