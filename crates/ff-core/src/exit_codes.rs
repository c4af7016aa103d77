//! Exit codes for the frontier-finder CLI.
//!
//! Exit code ranges:
//! - 0-2: Operational outcomes
//! - 10-19: User/input errors (fixable by changing arguments or files)
//! - 20-29: Internal errors (bugs, should be reported)

use ff_common::{Error, ErrorCategory};

/// Exit codes for frontier-finder commands.
///
/// These codes are a stable contract for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed
    Clean = 0,

    /// The build was cancelled; no frontier was written
    Cancelled = 2,

    /// Invalid arguments or query out of range
    ArgsError = 10,

    /// Options file or FF_* environment value rejected
    ConfigError = 11,

    /// Malformed sensor file, config list, policy tree or saved frontier
    DataFormatError = 12,

    /// Too many sensors or copies for the subset index space
    CapacityError = 13,

    /// File could not be read or written
    IoError = 14,

    /// Internal consistency violation (bug - please report)
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    /// Codes 20 and up.
    pub fn is_internal_error(self) -> bool {
        self.as_i32() >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::Cancelled => "CANCELLED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DataFormatError => "ERR_DATA_FORMAT",
            ExitCode::CapacityError => "ERR_CAPACITY",
            ExitCode::IoError => "ERR_IO",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }

    /// The exit code for a failed command.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::InvalidArgument(_) => ExitCode::ArgsError,
            Error::DataFormat { .. } => ExitCode::DataFormatError,
            _ => Self::from(err.category()),
        }
    }
}

impl From<ErrorCategory> for ExitCode {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Input => ExitCode::DataFormatError,
            ErrorCategory::Capacity => ExitCode::CapacityError,
            ErrorCategory::Engine => ExitCode::InternalError,
            ErrorCategory::Cancelled => ExitCode::Cancelled,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
