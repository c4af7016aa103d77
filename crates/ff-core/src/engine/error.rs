//! Engine error type.

use thiserror::Error;

/// Errors raised while reading inputs or computing frontiers.
///
/// The builder reports cancellation as [`crate::engine::BuildOutcome::Cancelled`];
/// `Cancelled` here is for callers that need to turn that outcome into an error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The subset index space would overflow.
    #[error("too many sensors to combine: {0}")]
    Capacity(String),

    /// Malformed sensor file, config list, policy tree or saved frontier.
    #[error("{}", describe_data_format(origin, *position, text, message))]
    DataFormat {
        origin: String,
        position: Option<usize>,
        text: String,
        message: String,
    },

    /// Ordering, convexity, backward cost or shape mismatch inside the engine.
    #[error("internal consistency violation: {0}")]
    Invariant(String),

    /// A query or build argument outside its legal range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

fn describe_data_format(origin: &str, position: Option<usize>, text: &str, message: &str) -> String {
    let mut out = String::from(origin);
    if let Some(pos) = position {
        out.push_str(&format!(":{}", pos));
    }
    out.push_str(": ");
    out.push_str(message);
    if !text.is_empty() {
        out.push_str(&format!(" (near '{}')", text));
    }
    out
}

impl EngineError {
    pub fn data_format(
        origin: impl Into<String>,
        position: Option<usize>,
        text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineError::DataFormat {
            origin: origin.into(),
            position,
            text: text.into(),
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        EngineError::Invariant(message.into())
    }
}

impl From<EngineError> for ff_common::Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Capacity(m) => ff_common::Error::Capacity(m),
            EngineError::DataFormat {
                origin,
                position,
                text,
                message,
            } => ff_common::Error::DataFormat {
                origin,
                position,
                message: if text.is_empty() {
                    message
                } else {
                    format!("{} (near '{}')", message, text)
                },
            },
            EngineError::Invariant(m) => ff_common::Error::Invariant(m),
            EngineError::InvalidArgument(m) => ff_common::Error::InvalidArgument(m),
            EngineError::Cancelled(m) => ff_common::Error::Cancelled(m),
            EngineError::Io(e) => ff_common::Error::Io(e),
        }
    }
}
