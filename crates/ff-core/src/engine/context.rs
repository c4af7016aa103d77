//! Computation parameters shared by a group of frontiers.

use ff_config::{EngineConfig, VertexSkip};
use serde::{Deserialize, Serialize};

use super::signature::PolicySignature;

/// Immutable parameters every frontier of one computation agrees on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierContext {
    /// Prior probability of a bad object.
    pub pi: f64,
    pub vs: VertexSkip,
    pub eps: f64,
    /// Whether signatures carry cost-on-bad and frontiers may be re-sorted
    /// for other values of pi.
    pub multi_pi: bool,
    /// The "inspect everything" endpoint, `(1+E, 1, 1)`.
    pub inspect: PolicySignature,
    /// Run extra consistency checks after every merge.
    pub paranoid: bool,
}

impl FrontierContext {
    pub fn new(pi: f64, vs: VertexSkip, eps: f64, multi_pi: bool, overhead: f64) -> Self {
        Self {
            pi,
            vs,
            eps,
            multi_pi,
            inspect: PolicySignature::inspect(overhead),
            paranoid: false,
        }
    }

    /// Context for prior `pi` with the options in `config`.
    pub fn from_config(config: &EngineConfig, pi: f64, multi_pi: bool) -> Self {
        Self {
            paranoid: config.paranoid,
            ..Self::new(pi, config.vs, config.eps, multi_pi, config.inspection_overhead)
        }
    }

    /// Same parameters at another prior.
    pub fn with_pi(&self, pi: f64) -> Self {
        Self { pi, ..*self }
    }

    /// INSPECT's cost at this context's pi; no frontier vertex reaches it.
    pub fn inspect_cost(&self) -> f64 {
        self.inspect.cost_at(self.pi)
    }

    /// `E`, the extra cost of inspecting a good object.
    pub fn overhead(&self) -> f64 {
        self.inspect.cost - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_cost_depends_on_pi() {
        let ctx = FrontierContext::new(0.0, VertexSkip::Vm1, 1e-6, true, 0.5);
        assert_eq!(ctx.inspect_cost(), 1.5);
        assert_eq!(ctx.with_pi(1.0).inspect_cost(), 1.0);
        assert_eq!(ctx.with_pi(0.5).inspect_cost(), 1.25);
        assert_eq!(ctx.overhead(), 0.5);
    }

    #[test]
    fn from_config_copies_options() {
        let config = EngineConfig {
            eps: 0.01,
            vs: VertexSkip::Eb1,
            paranoid: true,
            ..EngineConfig::default()
        };
        let ctx = FrontierContext::from_config(&config, 0.25, true);
        assert_eq!(ctx.eps, 0.01);
        assert_eq!(ctx.vs, VertexSkip::Eb1);
        assert!(ctx.paranoid);
        assert!(ctx.multi_pi);
        assert_eq!(ctx.pi, 0.25);
    }
}
