//! Vertex selection, approximation passes, and the hull merge of frontiers.
//!
//! Every function here takes an owned, cost-sorted list of policies and
//! returns a new list; nothing is modified in place.

use ff_config::VertexSkip;
use tracing::trace;

use super::context::FrontierContext;
use super::error::{EngineError, Result};
use super::frontier::{Frontier, FrontierView};
use super::policy::Policy;
use super::signature::PolicySignature;
use crate::logging::events::event_names;

/// Keeps the vertices of the upper convex hull of `sorted`.
///
/// Stops at the first vertex that costs as much as INSPECT, skips vertices
/// within the context's eps box of the previous kept vertex or on/under the
/// chord to INSPECT, and pops kept vertices that the new one makes concave.
pub fn select_necessary(ctx: &FrontierContext, sorted: Vec<Policy>) -> Result<Vec<Policy>> {
    let pi = ctx.pi;
    let inspect_cost = ctx.inspect_cost();
    let len = sorted.len();
    let release = PolicySignature::RELEASE;
    let mut kept: Vec<Policy> = Vec::with_capacity(len);
    let mut last_cost = f64::NEG_INFINITY;

    for p in sorted {
        let s = *p.signature();
        let c = s.cost_at(pi);
        if c < last_cost {
            return Err(EngineError::invariant(format!(
                "vertex selection needs sorted input ({} after {})",
                c, last_cost
            )));
        }
        last_cost = c;
        if c >= inspect_cost {
            break;
        }

        let prev = kept.last().map_or(release, |k| *k.signature());
        let box_eps = match ctx.vs {
            VertexSkip::Eb1 => ctx.eps * prev.detection,
            VertexSkip::Vm2 => ctx.eps / len as f64,
            VertexSkip::Vm1 => ctx.eps,
        };
        if s.is_within_eps(&prev, box_eps, pi) || s.is_below_ray(&prev, &ctx.inspect, pi) {
            continue;
        }

        while let Some(last) = kept.last() {
            let last = *last.signature();
            let prev2 = match kept.len() {
                n if n >= 2 => *kept[n - 2].signature(),
                _ => release,
            };
            let to_neighbour = last.compare_to_ray(&prev2, &s, pi);
            let to_release = last.compare_to_ray(&release, &s, pi);
            if to_neighbour > 0.0 && to_release > 0.0 {
                break;
            }
            kept.pop();
        }
        kept.push(p);
    }
    Ok(kept)
}

/// Drops vertices inside the eps box of the last kept vertex.
pub fn approximate_vm1(ctx: &FrontierContext, sorted: Vec<Policy>) -> Vec<Policy> {
    let mut kept: Vec<Policy> = Vec::with_capacity(sorted.len());
    for p in sorted {
        let anchor = kept
            .last()
            .map_or(PolicySignature::RELEASE, |k| *k.signature());
        if !p.signature().is_within_eps(&anchor, ctx.eps, ctx.pi) {
            kept.push(p);
        }
    }
    kept
}

/// Bounded-ratio simplification (Boros): every dropped vertex is within a
/// factor `1 + eps` in detection of the kept chain.
pub fn approximate_eb1(ctx: &FrontierContext, sorted: Vec<Policy>) -> Vec<Policy> {
    let n = sorted.len();
    let eps = ctx.eps;
    let vertex = |k: usize| -> PolicySignature {
        match k {
            0 => PolicySignature::RELEASE,
            k if k > n => ctx.inspect,
            k => *sorted[k - 1].signature(),
        }
    };

    // Anchors use extended indices: 0 is RELEASE, n + 1 is INSPECT.
    let mut keep = Vec::new();
    let mut s = 0;
    loop {
        let ps = vertex(s);
        let mut i = s + 1;
        let mut max_slope = 0.0_f64;
        while i <= n + 1 {
            let pj = vertex(i);
            let dc = pj.cost - ps.cost;
            if (pj.detection - ps.detection) * (1.0 + eps) < max_slope * dc {
                break;
            }
            max_slope = max_slope.max((pj.detection - (1.0 + eps) * ps.detection) / dc);
            i += 1;
        }
        s = i - 1;
        if s > n {
            break;
        }
        keep.push(s - 1);
    }

    let mut sorted = sorted.into_iter().map(Some).collect::<Vec<_>>();
    keep.into_iter()
        .filter_map(|k| sorted[k].take())
        .collect()
}

/// Area-budget simplification: the total area between the true hull and
/// the kept chain stays within eps.
pub fn approximate_vm2(ctx: &FrontierContext, sorted: Vec<Policy>) -> Vec<Policy> {
    let n = sorted.len();
    let pi = ctx.pi;
    let eps2 = ctx.eps * ctx.eps;
    let vertex = |k: usize| -> PolicySignature {
        match k {
            0 => PolicySignature::RELEASE,
            k if k > n => ctx.inspect,
            k => *sorted[k - 1].signature(),
        }
    };

    let mut keep = Vec::new();
    let mut base = 0;
    let mut i = 1;
    let mut excluded = 0.0;
    while i <= n {
        let base_sig = vertex(base);
        let mut head = i;
        i += 1;
        let mut area = 0.0;
        while i <= n + 1 {
            let next = vertex(i);
            let grown = area + vertex(head).compare_to_ray(&base_sig, &next, pi);
            if grown * grown > eps2 * base_sig.hyp2(&next, pi) {
                break;
            }
            area = grown;
            head = i;
            i += 1;
        }
        excluded += area;
        if head > n {
            break;
        }
        keep.push(head - 1);
        base = head;
    }
    trace!(
        event = event_names::FRONTIER_VM2_AREA,
        excluded_area = excluded,
        before = n,
        after = keep.len(),
        "vm2 pass"
    );

    let mut sorted = sorted.into_iter().map(Some).collect::<Vec<_>>();
    keep.into_iter()
        .filter_map(|k| sorted[k].take())
        .collect()
}

/// Applies the context's extra approximation pass, if any.
pub fn approximate(ctx: &FrontierContext, sorted: Vec<Policy>) -> Vec<Policy> {
    match ctx.vs {
        VertexSkip::Vm1 => sorted,
        VertexSkip::Vm2 => approximate_vm2(ctx, sorted),
        VertexSkip::Eb1 => approximate_eb1(ctx, sorted),
    }
}

/// Merges two cost-sorted lists, keeping the higher detection on cost ties.
fn merge_by_cost(pi: f64, a: Vec<Policy>, b: Vec<Policy>) -> Result<Vec<Policy>> {
    let mut a = a
        .into_iter()
        .skip_while(|p| p.signature().detection == 0.0)
        .peekable();
    let mut b = b
        .into_iter()
        .skip_while(|p| p.signature().detection == 0.0)
        .peekable();
    let mut out: Vec<Policy> = Vec::new();
    loop {
        // (take from a, take from b, keep a's)
        let step = match (a.peek(), b.peek()) {
            (None, None) => break,
            (Some(_), None) => (true, false, true),
            (None, Some(_)) => (false, true, false),
            (Some(x), Some(y)) => {
                let (cx, cy) = (x.signature().cost_at(pi), y.signature().cost_at(pi));
                if cx < cy {
                    (true, false, true)
                } else if cy < cx {
                    (false, true, false)
                } else {
                    (true, true, x.signature().detection >= y.signature().detection)
                }
            }
        };
        let from_a = if step.0 { a.next() } else { None };
        let from_b = if step.1 { b.next() } else { None };
        let next = if step.2 { from_a } else { from_b };
        let Some(p) = next else { break };
        if let Some(last) = out.last() {
            if p.signature().cost_at(pi) < last.signature().cost_at(pi) {
                return Err(EngineError::invariant(
                    "merged frontiers are not sorted by cost",
                ));
            }
        }
        out.push(p);
    }
    Ok(out)
}

/// Hull merge of frontiers sharing `ctx`'s prior.
///
/// Merges by cost, runs vertex selection once, then applies the context's
/// approximation pass.
pub fn combine(ctx: &FrontierContext, frontiers: Vec<Frontier>) -> Result<Frontier> {
    let mut merged: Vec<Policy> = Vec::new();
    for f in frontiers {
        if f.context().pi != ctx.pi {
            return Err(EngineError::InvalidArgument(format!(
                "cannot merge a frontier for pi={} into one for pi={}",
                f.context().pi,
                ctx.pi
            )));
        }
        if ctx.paranoid {
            f.validate()?;
        }
        merged = merge_by_cost(ctx.pi, merged, f.into_policies())?;
    }
    let selected = select_necessary(ctx, merged)?;
    let result = Frontier::from_policies(*ctx, approximate(ctx, selected));
    if ctx.paranoid {
        result.validate()?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(vs: VertexSkip, eps: f64) -> FrontierContext {
        FrontierContext::new(0.0, vs, eps, false, 0.0)
    }

    fn summaries(points: &[(f64, f64)]) -> Vec<Policy> {
        points
            .iter()
            .map(|&(c, d)| Policy::summary(PolicySignature::new(c, d)))
            .collect()
    }

    fn points(policies: &[Policy]) -> Vec<(f64, f64)> {
        policies
            .iter()
            .map(|p| (p.signature().cost, p.signature().detection))
            .collect()
    }

    #[test]
    fn selection_drops_concave_and_dominated_vertices() {
        let c = ctx(VertexSkip::Vm1, 1e-9);
        let input = summaries(&[(0.1, 0.2), (0.2, 0.6), (0.3, 0.62), (0.5, 0.9), (1.5, 1.0)]);
        let kept = select_necessary(&c, input).unwrap();
        assert_eq!(points(&kept), vec![(0.2, 0.6), (0.5, 0.9)]);
    }

    #[test]
    fn selection_rejects_unsorted_input() {
        let c = ctx(VertexSkip::Vm1, 1e-9);
        let input = summaries(&[(0.3, 0.6), (0.2, 0.7)]);
        assert!(matches!(
            select_necessary(&c, input),
            Err(EngineError::Invariant(_))
        ));
    }

    #[test]
    fn selection_skips_vertices_under_the_diagonal() {
        let c = ctx(VertexSkip::Vm1, 1e-9);
        let kept = select_necessary(&c, summaries(&[(0.5, 0.4)])).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn vm1_box_merges_neighbours() {
        let c = ctx(VertexSkip::Vm1, 0.01);
        let kept = approximate_vm1(&c, summaries(&[(0.2, 0.6), (0.205, 0.605), (0.5, 0.9)]));
        assert_eq!(points(&kept), vec![(0.2, 0.6), (0.5, 0.9)]);
    }

    #[test]
    fn eb1_keeps_everything_with_zero_eps() {
        let c = ctx(VertexSkip::Eb1, 0.0);
        let input = summaries(&[(0.1, 0.4), (0.3, 0.7), (0.6, 0.9)]);
        let kept = approximate_eb1(&c, input.clone());
        assert_eq!(points(&kept), points(&input));
    }

    #[test]
    fn eb1_drops_nearly_colinear_vertex() {
        let c = ctx(VertexSkip::Eb1, 0.05);
        let input = summaries(&[(0.1, 0.4), (0.2, 0.601), (0.3, 0.8)]);
        let kept = approximate_eb1(&c, input);
        assert!(kept.len() < 3);
    }

    #[test]
    fn vm2_drops_small_area() {
        let c = ctx(VertexSkip::Vm2, 0.01);
        let input = summaries(&[(0.1, 0.4), (0.2, 0.6001), (0.3, 0.8)]);
        let kept = approximate_vm2(&c, input);
        assert_eq!(points(&kept), vec![(0.1, 0.4), (0.3, 0.8)]);

        let strict = ctx(VertexSkip::Vm2, 0.0);
        let input = summaries(&[(0.1, 0.4), (0.2, 0.6001), (0.3, 0.8)]);
        assert_eq!(approximate_vm2(&strict, input).len(), 3);
    }

    #[test]
    fn combine_is_commutative() {
        let c = ctx(VertexSkip::Vm1, 1e-9);
        let a = Frontier::from_policies(c, summaries(&[(0.1, 0.3), (0.4, 0.8)]));
        let b = Frontier::from_policies(c, summaries(&[(0.2, 0.6), (0.6, 0.9)]));
        let ab = combine(&c, vec![a.clone(), b.clone()]).unwrap();
        let ba = combine(&c, vec![b, a]).unwrap();
        assert_eq!(points(ab.policies()), points(ba.policies()));
        assert!(ab.validate().is_ok());
    }

    #[test]
    fn combine_keeps_higher_detection_on_cost_tie() {
        let c = ctx(VertexSkip::Vm1, 1e-9);
        let a = Frontier::from_policies(c, summaries(&[(0.2, 0.5)]));
        let b = Frontier::from_policies(c, summaries(&[(0.2, 0.6)]));
        let merged = combine(&c, vec![a, b]).unwrap();
        assert_eq!(points(merged.policies()), vec![(0.2, 0.6)]);
    }

    #[test]
    fn combine_rejects_mixed_priors() {
        let c = ctx(VertexSkip::Vm1, 1e-9);
        let other = Frontier::new(c.with_pi(0.5));
        assert!(matches!(
            combine(&c, vec![other]),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
