//! Property-based tests for ff-math geometric primitives.
//!
//! Uses proptest to verify the sign and symmetry conventions the frontier
//! algorithms depend on.

use ff_math::{
    chord_length_sq, is_below_ray, ray_defect, two_sided_fractions, within_box, CostRate,
};
use proptest::prelude::*;

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-12;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

fn point() -> impl Strategy<Value = CostRate> {
    (0.0..2.0f64, 0.0..1.0f64).prop_map(|(c, r)| CostRate::new(c, r))
}

// ============================================================================
// ray_defect properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Points on the chord itself have zero defect.
    #[test]
    fn chord_points_are_colinear(a in point(), b in point(), t in 0.0..1.0f64) {
        let on = CostRate::new(a.cost + t * (b.cost - a.cost), a.rate + t * (b.rate - a.rate));
        let scale = chord_length_sq(a, b).max(1.0);
        prop_assert!(ray_defect(a, on, b).abs() <= 1e-12 * scale);
    }

    /// Lifting a point strictly increases its defect.
    #[test]
    fn defect_is_monotone_in_rate(a in point(), b in point(), p in point(), lift in 1e-3..1.0f64) {
        prop_assume!(b.cost > a.cost);
        let raised = CostRate::new(p.cost, p.rate + lift);
        prop_assert!(ray_defect(a, raised, b) > ray_defect(a, p, b));
    }

    /// Swapping the chord ends flips the sign.
    #[test]
    fn defect_is_antisymmetric(a in point(), b in point(), p in point()) {
        let forward = ray_defect(a, p, b);
        let backward = ray_defect(b, p, a);
        prop_assert!(approx_eq(forward, -backward, TOL));
    }

    /// is_below_ray agrees with the defect sign.
    #[test]
    fn below_matches_negative_defect(a in point(), b in point(), p in point()) {
        prop_assert_eq!(is_below_ray(a, p, b), ray_defect(a, p, b) < 0.0);
    }
}

// ============================================================================
// within_box / chord properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn box_is_symmetric(a in point(), b in point(), eps in 0.0..0.5f64) {
        prop_assert_eq!(within_box(a, b, eps), within_box(b, a, eps));
    }

    #[test]
    fn box_contains_chord_when_eps_large(a in point(), b in point()) {
        let len = chord_length_sq(a, b).sqrt();
        prop_assert!(within_box(a, b, len + 1e-12));
    }
}

// ============================================================================
// two_sided_fractions properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn fractions_are_monotone_and_bracketed(masses in prop::collection::vec(1e-6..1.0f64, 1..40)) {
        let f = two_sided_fractions(&masses).unwrap();
        prop_assert_eq!(f.len(), masses.len() + 1);
        prop_assert_eq!(f[0], 0.0);
        prop_assert_eq!(*f.last().unwrap(), 1.0);
        for w in f.windows(2) {
            prop_assert!(w[0] <= w[1]);
        }
    }
}
