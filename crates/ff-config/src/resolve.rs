//! Option resolution and path discovery.
//!
//! Resolution order, highest priority first: CLI arguments → environment
//! variables → options file → defaults. The options file itself is found at
//! the CLI path, else `FF_CONFIG`, else `<config dir>/frontier-finder/options.json`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::options::{EngineConfig, PiList, VertexSkip};
use crate::validate::{validate_config, ValidationError};

/// Where the options file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Named by the FF_CONFIG environment variable.
    Environment,

    /// Found in the user config directory.
    XdgConfig,

    /// No file; built-in defaults only.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "FF_CONFIG";
pub const ENV_EPS: &str = "FF_EPS";
pub const ENV_VS: &str = "FF_VS";
pub const ENV_MAX_DEPTH: &str = "FF_MAX_DEPTH";
pub const ENV_OVERHEAD: &str = "FF_E";
pub const ENV_PI: &str = "FF_PI";
pub const ENV_PARANOID: &str = "FF_PARANOID";
pub const ENV_SIGNATURES_ONLY: &str = "FF_SIGNATURES_ONLY";

const OPTIONS_FILENAME: &str = "options.json";
const APP_NAME: &str = "frontier-finder";

/// Errors from loading or layering options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read options file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse options file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' in {var}: {message}")]
    InvalidEnv {
        var: String,
        value: String,
        message: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Option values supplied by a higher-priority layer. `None` leaves the
/// lower layer's value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub eps: Option<f64>,
    pub vs: Option<VertexSkip>,
    /// Negative means unrestricted.
    pub max_depth: Option<i64>,
    pub inspection_overhead: Option<f64>,
    pub pi: Option<PiList>,
    pub paranoid: Option<bool>,
    pub signatures_only: Option<bool>,
    pub fold: Option<bool>,
    pub approximate_sensors: Option<bool>,
    pub original_sensors_in_trees: Option<bool>,
    pub line_length: Option<usize>,
}

impl ConfigOverrides {
    /// Applies every set field on top of `config`.
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(eps) = self.eps {
            config.eps = eps;
        }
        if let Some(vs) = self.vs {
            config.vs = vs;
        }
        if let Some(depth) = self.max_depth {
            config = config.with_signed_max_depth(depth);
        }
        if let Some(e) = self.inspection_overhead {
            config.inspection_overhead = e;
        }
        if let Some(pi) = &self.pi {
            config.pi = pi.clone();
        }
        if let Some(v) = self.paranoid {
            config.paranoid = v;
        }
        if let Some(v) = self.signatures_only {
            config.signatures_only = v;
        }
        if let Some(v) = self.fold {
            config.fold = v;
        }
        if let Some(v) = self.approximate_sensors {
            config.approximate_sensors = v;
        }
        if let Some(v) = self.original_sensors_in_trees {
            config.original_sensors_in_trees = v;
        }
        if let Some(v) = self.line_length {
            config.line_length = v;
        }
        config
    }

    /// Reads overrides from environment variables through `lookup`.
    ///
    /// Taking the lookup as a function keeps tests away from the process
    /// environment.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut o = ConfigOverrides::default();
        if let Some(v) = lookup(ENV_EPS) {
            o.eps = Some(parse_env(ENV_EPS, &v, |s| s.parse::<f64>().map_err(|e| e.to_string()))?);
        }
        if let Some(v) = lookup(ENV_VS) {
            o.vs = Some(parse_env(ENV_VS, &v, |s| {
                s.parse::<VertexSkip>().map_err(|e| e.to_string())
            })?);
        }
        if let Some(v) = lookup(ENV_MAX_DEPTH) {
            o.max_depth = Some(parse_env(ENV_MAX_DEPTH, &v, |s| {
                s.parse::<i64>().map_err(|e| e.to_string())
            })?);
        }
        if let Some(v) = lookup(ENV_OVERHEAD) {
            o.inspection_overhead = Some(parse_env(ENV_OVERHEAD, &v, |s| {
                s.parse::<f64>().map_err(|e| e.to_string())
            })?);
        }
        if let Some(v) = lookup(ENV_PI) {
            o.pi = Some(parse_env(ENV_PI, &v, |s| {
                PiList::parse(s).map_err(|e| e.to_string())
            })?);
        }
        if let Some(v) = lookup(ENV_PARANOID) {
            o.paranoid = Some(parse_env(ENV_PARANOID, &v, parse_flag)?);
        }
        if let Some(v) = lookup(ENV_SIGNATURES_ONLY) {
            o.signatures_only = Some(parse_env(ENV_SIGNATURES_ONLY, &v, parse_flag)?);
        }
        Ok(o)
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }
}

fn parse_env<T>(
    var: &str,
    value: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    parse(value.trim()).map_err(|message| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
        message,
    })
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected true/false, got '{}'", other)),
    }
}

/// A fully layered and validated configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    /// Options file that contributed, if any.
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Locates the options file.
pub fn find_options_file(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    // 1. CLI argument (must exist; a typo should not silently fall through)
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }

    // 2. Environment variable
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        return (Some(PathBuf::from(env_path)), ConfigSource::Environment);
    }

    // 3. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(OPTIONS_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    (None, ConfigSource::BuiltinDefault)
}

/// Get the XDG config directory for frontier-finder.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Reads an options file.
pub fn read_options_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the engine configuration from every layer and validates it.
pub fn load_config(
    cli_path: Option<&Path>,
    cli: &ConfigOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let env = ConfigOverrides::from_env()?;
    resolve_layers(cli_path, &env, cli)
}

/// Same as [`load_config`] with the environment layer supplied explicitly.
pub fn resolve_layers(
    cli_path: Option<&Path>,
    env: &ConfigOverrides,
    cli: &ConfigOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let (path, source) = find_options_file(cli_path);
    let base = match &path {
        Some(p) => read_options_file(p)?,
        None => EngineConfig::default(),
    };
    let config = cli.apply(env.apply(base));
    validate_config(&config)?;
    debug!(
        source = %source,
        eps = config.eps,
        vs = %config.vs,
        max_depth = ?config.max_depth,
        "config.loaded"
    );
    Ok(ResolvedConfig {
        config,
        path,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn env_overrides_parse() {
        let env = ConfigOverrides::from_env_with(env_of(&[
            (ENV_EPS, "0.001"),
            (ENV_VS, "vm2"),
            (ENV_MAX_DEPTH, "-1"),
            (ENV_PI, "0 0.5 1"),
            (ENV_PARANOID, "yes"),
        ]))
        .unwrap();
        assert_eq!(env.eps, Some(0.001));
        assert_eq!(env.vs, Some(VertexSkip::Vm2));
        assert_eq!(env.max_depth, Some(-1));
        assert_eq!(env.pi.unwrap().len(), 3);
        assert_eq!(env.paranoid, Some(true));
    }

    #[test]
    fn bad_env_value_names_the_variable() {
        let err = ConfigOverrides::from_env_with(env_of(&[(ENV_EPS, "tiny")])).unwrap_err();
        match err {
            ConfigError::InvalidEnv { var, value, .. } => {
                assert_eq!(var, ENV_EPS);
                assert_eq!(value, "tiny");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"eps": 0.1, "vs": "EB1", "max_depth": 3}}"#).unwrap();

        let env = ConfigOverrides {
            eps: Some(0.2),
            ..Default::default()
        };
        let cli = ConfigOverrides {
            max_depth: Some(5),
            ..Default::default()
        };
        let resolved = resolve_layers(Some(file.path()), &env, &cli).unwrap();
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.config.eps, 0.2);
        assert_eq!(resolved.config.vs, VertexSkip::Eb1);
        assert_eq!(resolved.config.max_depth, Some(5));
    }

    #[test]
    fn invalid_layered_value_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"eps": 0.1}}"#).unwrap();
        let cli = ConfigOverrides {
            eps: Some(-1.0),
            ..Default::default()
        };
        let err = resolve_layers(Some(file.path()), &ConfigOverrides::default(), &cli).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ValidationError::EpsRange { .. })));
    }

    #[test]
    fn malformed_file_is_reported_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = read_options_file(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
