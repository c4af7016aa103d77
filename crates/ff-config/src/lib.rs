//! Frontier Finder configuration loading and validation.
//!
//! This crate provides:
//! - `EngineConfig`, the immutable option set handed to the frontier builder
//! - Pi-mesh parsing and semantic validation
//! - Option resolution (CLI → env → options file → defaults)

pub mod options;
pub mod resolve;
pub mod validate;

pub use options::{EngineConfig, PiList, VertexSkip};
pub use resolve::{load_config, ConfigError, ConfigOverrides, ConfigSource, ResolvedConfig};
pub use validate::{validate_config, ValidationError};

/// Schema version for the options file.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
