//! Policy signatures: the (cost-on-good, cost-on-bad, detection-rate)
//! summary of a policy, and the geometric tests frontiers are built from.
//!
//! A signature is plotted at a prior `pi` as the point
//! `(cost_at(pi), detection)`. At `pi == 0` only the cost on good objects
//! matters, so single-pi computations may leave `cost_on_bad` unset.

use std::fmt;

use ff_math::{chord_length_sq, ray_defect, within_box, CostRate};
use serde::{Deserialize, Serialize};

use super::sensor::Sensor;

/// Cost and detection-rate summary of one policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicySignature {
    /// Expected cost on a good object (`c`).
    pub cost: f64,
    /// Expected cost on a bad object (`e`). Unset in pi=0-only computations.
    pub cost_on_bad: Option<f64>,
    /// Fraction of bad objects that end up inspected (`d`).
    pub detection: f64,
}

impl PolicySignature {
    /// Release everything without testing.
    pub const RELEASE: PolicySignature = PolicySignature {
        cost: 0.0,
        cost_on_bad: Some(0.0),
        detection: 0.0,
    };

    /// A signature without cost-on-bad.
    pub const fn new(cost: f64, detection: f64) -> Self {
        Self {
            cost,
            cost_on_bad: None,
            detection,
        }
    }

    pub const fn with_cost_on_bad(cost: f64, cost_on_bad: f64, detection: f64) -> Self {
        Self {
            cost,
            cost_on_bad: Some(cost_on_bad),
            detection,
        }
    }

    /// Inspect everything: costs `1 + overhead` on good objects, 1 on bad ones.
    pub fn inspect(overhead: f64) -> Self {
        Self::with_cost_on_bad(1.0 + overhead, 1.0, 1.0)
    }

    /// Run `sensor` once and inspect exactly the objects routed into its
    /// first `level` channels.
    pub fn inspect_top_channels(sensor: &Sensor, level: usize, inspect: &PolicySignature) -> Self {
        let inspect_on_bad = inspect.cost_on_bad.unwrap_or(1.0);
        Self::with_cost_on_bad(
            sensor.cost() + sensor.cum_good(level) * inspect.cost,
            sensor.cost() + sensor.cum_bad(level) * inspect_on_bad,
            sensor.cum_bad(level),
        )
    }

    /// Expected cost at prior `pi`: `c` at pi = 0, `c + pi*(e - c)` otherwise.
    #[inline]
    pub fn cost_at(&self, pi: f64) -> f64 {
        if pi == 0.0 {
            return self.cost;
        }
        debug_assert!(
            self.cost_on_bad.is_some(),
            "cost on bad objects is required at pi={}",
            pi
        );
        let e = self.cost_on_bad.unwrap_or(self.cost);
        self.cost + pi * (e - self.cost)
    }

    /// This signature as a point of the cost/detection plane at `pi`.
    #[inline]
    pub fn point(&self, pi: f64) -> CostRate {
        CostRate::new(self.cost_at(pi), self.detection)
    }

    /// Twice the signed area of the triangle (`from`, self, `to`) at `pi`.
    ///
    /// Positive when self lies strictly above the chord `from`→`to`.
    /// Inputs must be sorted: `from` costs no more than self or `to`.
    #[inline]
    pub fn compare_to_ray(&self, from: &PolicySignature, to: &PolicySignature, pi: f64) -> f64 {
        let (x, p, y) = (from.point(pi), self.point(pi), to.point(pi));
        debug_assert!(x.cost <= y.cost, "ray runs backwards: {} > {}", x.cost, y.cost);
        debug_assert!(x.cost <= p.cost, "point precedes ray start: {} > {}", x.cost, p.cost);
        ray_defect(x, p, y)
    }

    #[inline]
    pub fn is_below_ray(&self, from: &PolicySignature, to: &PolicySignature, pi: f64) -> bool {
        self.compare_to_ray(from, to, pi) < 0.0
    }

    /// Box test against `anchor`: cost and detection both within `eps`.
    #[inline]
    pub fn is_within_eps(&self, anchor: &PolicySignature, eps: f64, pi: f64) -> bool {
        within_box(anchor.point(pi), self.point(pi), eps)
    }

    /// RELEASE-like or INSPECT-like detection rate.
    pub fn is_trivial(&self) -> bool {
        self.detection == 0.0 || self.detection == 1.0
    }

    /// Slope from self to `other` at pi = 0.
    pub fn slope_to(&self, other: &PolicySignature) -> f64 {
        (other.detection - self.detection) / (other.cost - self.cost)
    }

    /// Squared distance to `other` at `pi`.
    pub fn hyp2(&self, other: &PolicySignature, pi: f64) -> f64 {
        chord_length_sq(self.point(pi), other.point(pi))
    }

    /// `(cost detection)` rounded to six decimals, e.g. `(0.11 0.36)`.
    pub fn short_string(&self) -> String {
        format!("({} {})", format_short(self.cost), format_short(self.detection))
    }

    /// Like [`short_string`](Self::short_string) but with every digit.
    pub fn exact_string(&self) -> String {
        format!("({} {})", self.cost, self.detection)
    }
}

impl fmt::Display for PolicySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cost_on_bad {
            Some(e) => write!(f, "(c={}, e={}, d={})", self.cost, e, self.detection),
            None => write!(f, "(c={}, d={})", self.cost, self.detection),
        }
    }
}

/// Formats with at most six decimals and no trailing zeros.
pub fn format_short(x: f64) -> String {
    let s = format!("{:.6}", x);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}
