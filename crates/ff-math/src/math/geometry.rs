//! Planar primitives over (cost, detection-rate) points.
//!
//! Every frontier decision reduces to a handful of tests on points of the
//! cost/detection plane: which side of a chord a point lies on, whether two
//! points are within an eps-box of each other, and chord lengths. They are
//! kept here, free of any frontier types, so the sign conventions live in
//! one place.

use serde::{Deserialize, Serialize};

/// A point of the (cost, detection-rate) plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRate {
    pub cost: f64,
    pub rate: f64,
}

impl CostRate {
    pub const fn new(cost: f64, rate: f64) -> Self {
        Self { cost, rate }
    }
}

/// Twice the signed area of the triangle (`from`, `point`, `to`).
///
/// Positive when `point` lies strictly above the chord `from`→`to`, zero
/// when colinear, negative when below. Callers pass points already sorted
/// by cost, `from.cost <= point.cost` and `from.cost <= to.cost`.
#[inline]
pub fn ray_defect(from: CostRate, point: CostRate, to: CostRate) -> f64 {
    (point.rate - from.rate) * (to.cost - from.cost)
        - (point.cost - from.cost) * (to.rate - from.rate)
}

/// True iff `point` lies strictly below the chord `from`→`to`.
#[inline]
pub fn is_below_ray(from: CostRate, point: CostRate, to: CostRate) -> bool {
    ray_defect(from, point, to) < 0.0
}

/// Box test: both coordinates of `point` within `eps` of `anchor` (inclusive).
#[inline]
pub fn within_box(anchor: CostRate, point: CostRate, eps: f64) -> bool {
    anchor.cost - eps <= point.cost
        && point.cost <= anchor.cost + eps
        && anchor.rate - eps <= point.rate
        && point.rate <= anchor.rate + eps
}

/// Squared Euclidean length of the chord `a`→`b`.
#[inline]
pub fn chord_length_sq(a: CostRate, b: CostRate) -> f64 {
    let dc = b.cost - a.cost;
    let dr = b.rate - a.rate;
    dc * dc + dr * dr
}

/// Slope of the chord `a`→`b` (detection gained per unit cost).
///
/// Infinite on vertical chords, NaN when the points coincide.
#[inline]
pub fn slope(a: CostRate, b: CostRate) -> f64 {
    (b.rate - a.rate) / (b.cost - a.cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(c: f64, r: f64) -> CostRate {
        CostRate::new(c, r)
    }

    #[test]
    fn defect_sign_follows_side_of_chord() {
        let from = p(0.0, 0.0);
        let to = p(1.0, 1.0);
        assert!(ray_defect(from, p(0.5, 0.8), to) > 0.0);
        assert!(ray_defect(from, p(0.5, 0.2), to) < 0.0);
        assert_eq!(ray_defect(from, p(0.5, 0.5), to), 0.0);
    }

    #[test]
    fn defect_is_twice_triangle_area() {
        // Triangle (0,0), (0,1), (1,1) has area 1/2.
        assert_eq!(ray_defect(p(0.0, 0.0), p(0.0, 1.0), p(1.0, 1.0)), 1.0);
    }

    #[test]
    fn box_test_is_inclusive() {
        let a = p(0.25, 0.5);
        assert!(within_box(a, p(0.5, 0.75), 0.25));
        assert!(!within_box(a, p(0.5, 0.76), 0.25));
        assert!(within_box(a, a, 0.0));
    }

    #[test]
    fn vertical_chord_has_infinite_slope() {
        assert!(slope(p(0.5, 0.0), p(0.5, 1.0)).is_infinite());
        assert_eq!(chord_length_sq(p(0.0, 0.0), p(3.0, 4.0)), 25.0);
    }
}
