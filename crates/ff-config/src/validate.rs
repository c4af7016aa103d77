//! Semantic validation for engine options.
//!
//! Values can be well-formed and still unusable: a negative eps, a pi mesh
//! that does not span [0, 1], an infinite overhead. This module rejects them
//! before any frontier work starts.

use thiserror::Error;

use crate::options::EngineConfig;

/// Errors that can occur during semantic validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("eps must be finite and non-negative (got {value})")]
    EpsRange { value: f64 },

    #[error("E (inspection overhead) must be finite and non-negative (got {value})")]
    OverheadRange { value: f64 },

    #[error("pi list is empty")]
    PiListEmpty,

    #[error("pi list must start with 0 (got {first})")]
    PiListStart { first: f64 },

    #[error("pi list must end with 1 (got {last})")]
    PiListEnd { last: f64 },

    #[error("pi list must be strictly increasing ({prev} is followed by {next})")]
    PiListOrder { prev: f64, next: f64 },

    #[error("unknown vertex-skipping method '{0}' (expected VM1, VM2 or EB1)")]
    UnknownVertexSkip(String),

    #[error("cannot parse '{token}' as a number for {field}")]
    InvalidNumber { field: String, token: String },
}

/// Checks a pi mesh: `[0]`, or at least two strictly increasing values
/// from exactly 0 to exactly 1.
pub fn validate_pi_list(values: &[f64]) -> Result<(), ValidationError> {
    let (first, last) = match (values.first(), values.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Err(ValidationError::PiListEmpty),
    };
    if first != 0.0 {
        return Err(ValidationError::PiListStart { first });
    }
    if values.len() == 1 {
        return Ok(());
    }
    for pair in values.windows(2) {
        // Written as a negation so NaN fails too.
        if !(pair[1] > pair[0]) {
            return Err(ValidationError::PiListOrder {
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    if last != 1.0 {
        return Err(ValidationError::PiListEnd { last });
    }
    Ok(())
}

/// Validates a resolved configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), ValidationError> {
    if !config.eps.is_finite() || config.eps < 0.0 {
        return Err(ValidationError::EpsRange { value: config.eps });
    }
    if !config.inspection_overhead.is_finite() || config.inspection_overhead < 0.0 {
        return Err(ValidationError::OverheadRange {
            value: config.inspection_overhead,
        });
    }
    validate_pi_list(config.pi.values())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn rejects_negative_eps() {
        let config = EngineConfig {
            eps: -1e-3,
            ..EngineConfig::default()
        };
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::EpsRange { value: -1e-3 })
        );
    }

    #[test]
    fn rejects_infinite_overhead() {
        let config = EngineConfig {
            inspection_overhead: f64::INFINITY,
            ..EngineConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::OverheadRange { .. })
        ));
    }

    #[test]
    fn pi_list_rules() {
        assert!(validate_pi_list(&[0.0]).is_ok());
        assert!(validate_pi_list(&[0.0, 1.0]).is_ok());
        assert_eq!(validate_pi_list(&[]), Err(ValidationError::PiListEmpty));
        assert_eq!(
            validate_pi_list(&[0.0, 0.6, 0.4, 1.0]),
            Err(ValidationError::PiListOrder { prev: 0.6, next: 0.4 })
        );
        assert_eq!(
            validate_pi_list(&[0.0, 0.5]),
            Err(ValidationError::PiListEnd { last: 0.5 })
        );
        assert!(validate_pi_list(&[0.0, f64::NAN, 1.0]).is_err());
    }
}
