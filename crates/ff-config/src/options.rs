//! Engine option types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validate::{validate_pi_list, ValidationError};

/// Vertex-skipping method: how `eps` is used to thin a frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VertexSkip {
    /// Drop vertices inside the eps-box of the last kept vertex.
    #[default]
    #[serde(rename = "VM1")]
    Vm1,
    /// Area budget: total excluded area along the frontier stays within eps.
    #[serde(rename = "VM2")]
    Vm2,
    /// Relative slope bound (Boros): every dropped vertex is within a
    /// (1+eps) factor of the kept chord.
    #[serde(rename = "EB1")]
    Eb1,
}

impl VertexSkip {
    pub const ALL: [VertexSkip; 3] = [VertexSkip::Vm1, VertexSkip::Vm2, VertexSkip::Eb1];
}

impl fmt::Display for VertexSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexSkip::Vm1 => write!(f, "VM1"),
            VertexSkip::Vm2 => write!(f, "VM2"),
            VertexSkip::Eb1 => write!(f, "EB1"),
        }
    }
}

impl FromStr for VertexSkip {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VM1" => Ok(VertexSkip::Vm1),
            "VM2" => Ok(VertexSkip::Vm2),
            "EB1" => Ok(VertexSkip::Eb1),
            _ => Err(ValidationError::UnknownVertexSkip(s.to_string())),
        }
    }
}

/// Prior probabilities of a "bad" object at which frontiers are computed.
///
/// Either the single value `[0]` or a strictly increasing mesh from 0 to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct PiList(Vec<f64>);

impl PiList {
    /// Validates and wraps a list of pi values.
    pub fn new(values: Vec<f64>) -> Result<Self, ValidationError> {
        validate_pi_list(&values)?;
        Ok(PiList(values))
    }

    /// The trivial mesh `[0]`.
    pub fn single() -> Self {
        PiList(vec![0.0])
    }

    /// Parses whitespace- or comma-separated numbers, e.g. `"0 0.25, 0.5 1"`.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let mut values = Vec::new();
        for token in text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let value = token
                .parse::<f64>()
                .map_err(|_| ValidationError::InvalidNumber {
                    field: "pi".to_string(),
                    token: token.to_string(),
                })?;
            values.push(value);
        }
        Self::new(values)
    }

    /// True for the single-value mesh `[0]`.
    pub fn is_single(&self) -> bool {
        self.0.len() == 1
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PiList {
    fn default() -> Self {
        Self::single()
    }
}

impl TryFrom<Vec<f64>> for PiList {
    type Error = ValidationError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        PiList::new(values)
    }
}

impl From<PiList> for Vec<f64> {
    fn from(list: PiList) -> Self {
        list.0
    }
}

impl fmt::Display for PiList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pi) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", pi)?;
        }
        Ok(())
    }
}

/// Immutable option set for one frontier computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vertex-merging tolerance, interpreted per `vs`.
    pub eps: f64,

    /// Vertex-skipping method.
    pub vs: VertexSkip,

    /// Largest policy tree depth (sensor count along a path). `None` means
    /// as deep as the sensor copies allow.
    pub max_depth: Option<usize>,

    /// Extra cost of inspecting a good object ("interruption of commerce").
    /// INSPECT costs `1 + E` on good objects and 1 on bad ones.
    #[serde(rename = "E")]
    pub inspection_overhead: f64,

    /// Pi mesh for multi-pi surfaces.
    pub pi: PiList,

    /// Validate every intermediate frontier. Slow.
    pub paranoid: bool,

    /// Keep only (cost, detection) summaries, not policy trees.
    pub signatures_only: bool,

    /// Print runs of identical subtrees as `n*TREE`.
    pub fold: bool,

    /// Simplify sensor ROC curves with the same method before building.
    pub approximate_sensors: bool,

    /// Print trees in terms of the unsimplified sensors' channels.
    pub original_sensors_in_trees: bool,

    /// Soft cap on printed tree length; 0 means unrestricted.
    pub line_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            vs: VertexSkip::Vm1,
            max_depth: None,
            inspection_overhead: 0.0,
            pi: PiList::single(),
            paranoid: false,
            signatures_only: false,
            fold: true,
            approximate_sensors: true,
            original_sensors_in_trees: false,
            line_length: 0,
        }
    }
}

impl EngineConfig {
    /// Effective depth limit for a problem with `total_copies` sensors.
    pub fn depth_limit(&self, total_copies: usize) -> usize {
        self.max_depth.unwrap_or(total_copies)
    }

    /// Interprets a signed CLI/env depth: negative means unrestricted.
    pub fn with_signed_max_depth(mut self, depth: i64) -> Self {
        self.max_depth = usize::try_from(depth).ok();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_skip_round_trips_through_text() {
        for vs in VertexSkip::ALL {
            assert_eq!(vs.to_string().parse::<VertexSkip>().unwrap(), vs);
        }
        assert_eq!("eb1".parse::<VertexSkip>().unwrap(), VertexSkip::Eb1);
        assert!("VM3".parse::<VertexSkip>().is_err());
    }

    #[test]
    fn vertex_skip_serde_uses_upper_case() {
        let json = serde_json::to_string(&VertexSkip::Vm2).unwrap();
        assert_eq!(json, "\"VM2\"");
    }

    #[test]
    fn pi_list_parses_mixed_separators() {
        let list = PiList::parse(" 0, 0.25 0.5\t1 ").unwrap();
        assert_eq!(list.values(), &[0.0, 0.25, 0.5, 1.0]);
        assert_eq!(list.to_string(), "0 0.25 0.5 1");
    }

    #[test]
    fn pi_list_single_zero_is_valid() {
        let list = PiList::parse("0").unwrap();
        assert!(list.is_single());
    }

    #[test]
    fn pi_list_rejects_bad_meshes() {
        assert!(PiList::parse("").is_err());
        assert!(PiList::parse("0.1 1").is_err());
        assert!(PiList::parse("0 0.5").is_err());
        assert!(PiList::parse("0 0.5 0.5 1").is_err());
        assert!(PiList::parse("0 x 1").is_err());
    }

    #[test]
    fn pi_list_deserialization_validates() {
        let ok: PiList = serde_json::from_str("[0, 0.5, 1]").unwrap();
        assert_eq!(ok.len(), 3);
        assert!(serde_json::from_str::<PiList>("[0.5, 1]").is_err());
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.eps, 1e-6);
        assert_eq!(config.vs, VertexSkip::Vm1);
        assert_eq!(config.depth_limit(7), 7);
        assert!(config.approximate_sensors);
        assert!(!config.signatures_only);
    }

    #[test]
    fn signed_depth() {
        let config = EngineConfig::default().with_signed_max_depth(-1);
        assert_eq!(config.max_depth, None);
        let config = EngineConfig::default().with_signed_max_depth(2);
        assert_eq!(config.depth_limit(7), 2);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"eps": 0.01, "vs": "EB1", "E": 0.5}"#).unwrap();
        assert_eq!(config.eps, 0.01);
        assert_eq!(config.vs, VertexSkip::Eb1);
        assert_eq!(config.inspection_overhead, 0.5);
        assert!(config.fold);
    }
}
