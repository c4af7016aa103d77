//! Tolerances and summation helpers for order-sensitive float work.
//!
//! The frontier algorithms compare long products of fractions; exact
//! equality is meaningless there, but so is a loose tolerance, which would
//! merge genuinely distinct hull vertices. The constants below are the
//! tight thresholds the engine uses.

/// Two marginal-efficiency ratios closer than this are treated as equal.
pub const RATIO_TIE_TOLERANCE: f64 = 1e-14;

/// Cost moving backwards by less than this is rounding noise.
pub const BACKWARDATION_TOLERANCE: f64 = 1e-8;

/// Decides whether a ratio equals the previously accepted one.
///
/// Ratios are compared directly while the previous ratio is at most 0.5,
/// and through their inverses otherwise, so the absolute tolerance always
/// applies to the smaller of the two representations. Either form may be
/// infinite (vertical or horizontal segments), but not both at once.
#[inline]
pub fn ratios_coincide(prev_ratio: f64, prev_inverse: f64, ratio: f64, inverse: f64) -> bool {
    if prev_ratio <= 0.5 {
        (ratio - prev_ratio).abs() < RATIO_TIE_TOLERANCE
    } else {
        (inverse - prev_inverse).abs() < RATIO_TIE_TOLERANCE
    }
}

/// Cumulative fractions of a sequence of non-negative masses.
///
/// Entry `i` of the result is the share of the total carried by the first
/// `i` masses, so the output has one more element than the input, starts
/// at exactly 0 and ends at exactly 1. Each interior value is computed as
/// `left / (left + right)` from a prefix sum and a suffix sum, which keeps
/// the last interior point from overshooting 1 through accumulated error.
///
/// Returns `None` when the masses sum to zero.
pub fn two_sided_fractions(masses: &[f64]) -> Option<Vec<f64>> {
    let n = masses.len();
    let mut left = vec![0.0; n + 1];
    let mut right = vec![0.0; n + 1];
    for i in 0..n {
        left[i + 1] = left[i] + masses[i];
    }
    for i in (0..n).rev() {
        right[i] = right[i + 1] + masses[i];
    }
    if left[n] <= 0.0 {
        return None;
    }

    let mut out = Vec::with_capacity(n + 1);
    out.push(0.0);
    for i in 1..n {
        out.push(left[i] / (left[i] + right[i]));
    }
    if n > 0 {
        out.push(1.0);
    }
    Some(out)
}
