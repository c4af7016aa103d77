//! Budget and detection-rate queries on a frontier.
//!
//! Between two adjacent vertices every point of the chord is reachable by
//! a randomized policy: run the cheaper vertex's policy with probability
//! `weight_low`, the other one otherwise.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};
use super::frontier::FrontierView;
use super::signature::PolicySignature;

/// The best policy (or mix of two) for a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetOutcome {
    /// Extended vertex index of the cheaper policy (0 is RELEASE).
    pub low_vertex: usize,
    pub low: PolicySignature,
    /// Extended vertex index of the dearer policy; equal to `low_vertex`
    /// when no mixing happens.
    pub high_vertex: usize,
    pub high: PolicySignature,
    /// Probability of running the cheaper policy.
    pub weight_low: f64,
    /// Expected cost at the frontier's pi.
    pub cost: f64,
    pub detection: f64,
}

/// Which side of a mix a sampled object goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixChoice {
    Low,
    High,
}

impl BudgetOutcome {
    fn exact(vertex: usize, s: PolicySignature, pi: f64) -> Self {
        Self {
            low_vertex: vertex,
            low: s,
            high_vertex: vertex,
            high: s,
            weight_low: 1.0,
            cost: s.cost_at(pi),
            detection: s.detection,
        }
    }

    pub fn is_mixed(&self) -> bool {
        self.low_vertex != self.high_vertex
    }

    /// Draws the policy for one object.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MixChoice {
        if !self.is_mixed() || rng.random_bool(self.weight_low.clamp(0.0, 1.0)) {
            MixChoice::Low
        } else {
            MixChoice::High
        }
    }
}

/// Highest detection rate reachable within `budget`.
///
/// Walks RELEASE, the vertices, then INSPECT. With `can_mix`, a budget that
/// falls between two vertices buys the matching mix of both.
pub fn detection_rate_for_budget<F: FrontierView + ?Sized>(
    frontier: &F,
    budget: f64,
    can_mix: bool,
) -> Result<BudgetOutcome> {
    let ctx = frontier.context();
    let pi = ctx.pi;
    let inspect_cost = ctx.inspect_cost();
    if !(0.0..=inspect_cost).contains(&budget) {
        return Err(EngineError::InvalidArgument(format!(
            "budget {} is outside [0, {}]",
            budget, inspect_cost
        )));
    }
    let mut k1 = 0;
    let mut p1 = frontier.vertex(0);
    for k2 in 1..=frontier.len() + 1 {
        let p2 = frontier.vertex(k2);
        let (c1, c2) = (p1.cost_at(pi), p2.cost_at(pi));
        if c2 > budget {
            if can_mix && c1 < budget {
                let w = (c2 - budget) / (c2 - c1);
                return Ok(BudgetOutcome {
                    low_vertex: k1,
                    low: p1,
                    high_vertex: k2,
                    high: p2,
                    weight_low: w,
                    cost: budget,
                    detection: p1.detection * w + p2.detection * (1.0 - w),
                });
            }
            break;
        }
        k1 = k2;
        p1 = p2;
    }
    Ok(BudgetOutcome::exact(k1, p1, pi))
}

/// Cheapest way to reach detection rate `target`.
///
/// With `can_mix` the answer lies on the chord between the two vertices
/// that bracket `target`; without it, the first vertex reaching it.
pub fn budget_for_detection_rate<F: FrontierView + ?Sized>(
    frontier: &F,
    target: f64,
    can_mix: bool,
) -> Result<BudgetOutcome> {
    if !(0.0..=1.0).contains(&target) {
        return Err(EngineError::InvalidArgument(format!(
            "detection rate {} is outside [0, 1]",
            target
        )));
    }
    let pi = frontier.context().pi;
    let mut p1 = frontier.vertex(0);
    if target <= p1.detection {
        return Ok(BudgetOutcome::exact(0, p1, pi));
    }
    let last = frontier.len() + 1;
    for k2 in 1..=last {
        let p2 = frontier.vertex(k2);
        if p2.detection == target {
            return Ok(BudgetOutcome::exact(k2, p2, pi));
        }
        if p2.detection > target {
            if !can_mix {
                return Ok(BudgetOutcome::exact(k2, p2, pi));
            }
            let w = (p2.detection - target) / (p2.detection - p1.detection);
            return Ok(BudgetOutcome {
                low_vertex: k2 - 1,
                low: p1,
                high_vertex: k2,
                high: p2,
                weight_low: w,
                cost: p1.cost_at(pi) * w + p2.cost_at(pi) * (1.0 - w),
                detection: target,
            });
        }
        p1 = p2;
    }
    Ok(BudgetOutcome::exact(last, frontier.vertex(last), pi))
}
