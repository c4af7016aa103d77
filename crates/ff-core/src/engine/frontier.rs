//! Frontiers: convex hulls of policy signatures for one prior.
//!
//! A frontier stores only non-trivial vertices, sorted by strictly
//! increasing cost at its context's pi. RELEASE and INSPECT bracket it
//! implicitly: extended vertex `0` is RELEASE and vertex `len() + 1` is
//! INSPECT.

use std::fmt;

use super::context::FrontierContext;
use super::error::{EngineError, Result};
use super::policy::{Policy, TreeFormat};
use super::selection::select_necessary;
use super::signature::PolicySignature;

/// Read access shared by every frontier representation.
pub trait FrontierView {
    fn context(&self) -> &FrontierContext;

    fn len(&self) -> usize;

    /// Signature of stored vertex `i`.
    fn signature(&self, i: usize) -> PolicySignature;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cost0(&self, i: usize) -> f64 {
        self.signature(i).cost
    }

    fn cost_on_bad(&self, i: usize) -> Option<f64> {
        self.signature(i).cost_on_bad
    }

    fn cost_pi(&self, i: usize) -> f64 {
        self.signature(i).cost_at(self.context().pi)
    }

    fn detection_rate(&self, i: usize) -> f64 {
        self.signature(i).detection
    }

    /// Extended vertex `k`: RELEASE at 0, INSPECT at `len() + 1`.
    fn vertex(&self, k: usize) -> PolicySignature {
        if k == 0 {
            PolicySignature::RELEASE
        } else if k > self.len() {
            self.context().inspect
        } else {
            self.signature(k - 1)
        }
    }

    /// Area under the piecewise-linear curve RELEASE, vertices, INSPECT.
    fn area_under_curve(&self) -> f64 {
        let pi = self.context().pi;
        let mut area = 0.0;
        for k in 0..=self.len() {
            let (a, b) = (self.vertex(k), self.vertex(k + 1));
            area += (b.cost_at(pi) - a.cost_at(pi)) * (a.detection + b.detection);
        }
        area / 2.0
    }

    /// Checks ordering and convexity; reports the first violation.
    fn validate(&self) -> Result<()> {
        let ctx = self.context();
        let pi = ctx.pi;
        let inspect_cost = ctx.inspect_cost();
        for i in 0..self.len() {
            let p = self.signature(i);
            let c = p.cost_at(pi);
            if c >= inspect_cost {
                return Err(EngineError::invariant(format!(
                    "vertex {} costs {} which is not below INSPECT ({})",
                    i, c, inspect_cost
                )));
            }
            if i == 0 {
                continue;
            }
            let prev = self.signature(i - 1);
            if prev.cost_at(pi) >= c {
                return Err(EngineError::invariant(format!(
                    "vertex {} does not cost more than vertex {}",
                    i,
                    i - 1
                )));
            }
            if prev.detection > p.detection {
                return Err(EngineError::invariant(format!(
                    "vertex {} detects less than vertex {}",
                    i,
                    i - 1
                )));
            }
            let prev2 = self.vertex(i - 1);
            if prev.is_below_ray(&prev2, &p, pi) {
                return Err(EngineError::invariant(format!(
                    "vertex {} is below the chord of its neighbours",
                    i - 1
                )));
            }
            if prev.is_below_ray(&PolicySignature::RELEASE, &p, pi) {
                return Err(EngineError::invariant(format!(
                    "vertex {} is below the chord from RELEASE to vertex {}",
                    i - 1,
                    i
                )));
            }
        }
        if let Some(last) = self.len().checked_sub(1) {
            let p = self.signature(last);
            if p.is_below_ray(&self.vertex(last), &ctx.inspect, pi) {
                return Err(EngineError::invariant(format!(
                    "vertex {} is below the chord to INSPECT",
                    last
                )));
            }
        }
        Ok(())
    }
}

/// A frontier whose vertices carry full policies (possibly summaries).
#[derive(Debug, Clone)]
pub struct Frontier {
    context: FrontierContext,
    policies: Vec<Policy>,
}

impl Frontier {
    /// The empty frontier: RELEASE and INSPECT only.
    pub fn new(context: FrontierContext) -> Self {
        Self {
            context,
            policies: Vec::new(),
        }
    }

    /// Wraps policies that are already sorted and convex.
    pub fn from_policies(context: FrontierContext, policies: Vec<Policy>) -> Self {
        Self { context, policies }
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn into_policies(self) -> Vec<Policy> {
        self.policies
    }

    /// Extended vertex `k` as a policy.
    pub fn vertex_policy(&self, k: usize) -> Policy {
        if k == 0 {
            Policy::release()
        } else if k > self.policies.len() {
            Policy::inspect(self.context.inspect)
        } else {
            self.policies[k - 1].clone()
        }
    }

    /// The same vertices re-sorted for `context.pi` and re-selected.
    pub fn realign(&self, context: FrontierContext) -> Result<Frontier> {
        let pi = context.pi;
        let mut policies = self.policies.clone();
        policies.sort_by(|a, b| {
            let (sa, sb) = (a.signature(), b.signature());
            sa.cost_at(pi)
                .total_cmp(&sb.cost_at(pi))
                .then(sa.detection.total_cmp(&sb.detection))
        });
        Ok(Frontier::from_policies(
            context,
            select_necessary(&context, policies)?,
        ))
    }

    /// One line per vertex: `(c d) tree`.
    pub fn long_string(&self, format: TreeFormat) -> String {
        let mut out = String::new();
        for p in &self.policies {
            out.push_str(&p.signature().short_string());
            out.push(' ');
            out.push_str(&p.tree_string(format));
            out.push('\n');
        }
        out
    }
}

impl FrontierView for Frontier {
    fn context(&self) -> &FrontierContext {
        &self.context
    }

    fn len(&self) -> usize {
        self.policies.len()
    }

    fn signature(&self, i: usize) -> PolicySignature {
        *self.policies[i].signature()
    }
}

/// Short form: the vertex signatures between RELEASE and INSPECT.
impl fmt::Display for Frontier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_short(self, f)
    }
}

fn write_short<F: FrontierView>(frontier: &F, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for k in 0..=frontier.len() + 1 {
        if k > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", frontier.vertex(k).short_string())?;
    }
    write!(f, "]")
}

/// Signatures only, packed as `c d` or `c d e` per vertex.
#[derive(Debug, Clone)]
pub struct CompactFrontier {
    context: FrontierContext,
    values: Vec<f64>,
    arity: usize,
}

impl CompactFrontier {
    /// Packs signatures. Arity 2 drops cost-on-bad, arity 3 keeps it.
    pub fn from_signatures<'a>(
        context: FrontierContext,
        signatures: impl IntoIterator<Item = &'a PolicySignature>,
        arity: usize,
    ) -> Result<Self> {
        if arity != 2 && arity != 3 {
            return Err(EngineError::InvalidArgument(format!(
                "compact frontiers store 2 or 3 values per vertex, not {}",
                arity
            )));
        }
        let mut values = Vec::new();
        for s in signatures {
            values.push(s.cost);
            values.push(s.detection);
            if arity == 3 {
                let e = s.cost_on_bad.ok_or_else(|| {
                    EngineError::invariant("cost on bad objects missing from a multi-pi vertex")
                })?;
                values.push(e);
            }
        }
        Ok(Self {
            context,
            values,
            arity,
        })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl FrontierView for CompactFrontier {
    fn context(&self) -> &FrontierContext {
        &self.context
    }

    fn len(&self) -> usize {
        self.values.len() / self.arity
    }

    fn signature(&self, i: usize) -> PolicySignature {
        let v = &self.values[i * self.arity..(i + 1) * self.arity];
        PolicySignature {
            cost: v[0],
            cost_on_bad: v.get(2).copied(),
            detection: v[1],
        }
    }
}

impl fmt::Display for CompactFrontier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_short(self, f)
    }
}

/// How a subset's frontier is held in the builder's slot table.
#[derive(Debug, Clone)]
pub enum FrontierRepr {
    Full(Frontier),
    Compact(CompactFrontier),
}

impl FrontierRepr {
    /// Drops trees, keeping `arity` values per vertex.
    pub fn to_compact(&self, arity: usize) -> Result<FrontierRepr> {
        let compact = match self {
            FrontierRepr::Full(f) => CompactFrontier::from_signatures(
                f.context,
                f.policies.iter().map(Policy::signature),
                arity,
            )?,
            FrontierRepr::Compact(c) => {
                let signatures: Vec<PolicySignature> = (0..c.len()).map(|i| c.signature(i)).collect();
                CompactFrontier::from_signatures(c.context, &signatures, arity)?
            }
        };
        Ok(FrontierRepr::Compact(compact))
    }

    /// A working frontier; compact vertices become signature-only policies.
    pub fn materialize(&self) -> Frontier {
        match self {
            FrontierRepr::Full(f) => f.clone(),
            FrontierRepr::Compact(c) => Frontier::from_policies(
                c.context,
                (0..c.len()).map(|i| Policy::summary(c.signature(i))).collect(),
            ),
        }
    }
}

impl FrontierView for FrontierRepr {
    fn context(&self) -> &FrontierContext {
        match self {
            FrontierRepr::Full(f) => f.context(),
            FrontierRepr::Compact(c) => c.context(),
        }
    }

    fn len(&self) -> usize {
        match self {
            FrontierRepr::Full(f) => f.len(),
            FrontierRepr::Compact(c) => c.len(),
        }
    }

    fn signature(&self, i: usize) -> PolicySignature {
        match self {
            FrontierRepr::Full(f) => f.signature(i),
            FrontierRepr::Compact(c) => c.signature(i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_config::VertexSkip;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn ctx() -> FrontierContext {
        FrontierContext::new(0.0, VertexSkip::Vm1, 1e-6, false, 0.0)
    }

    fn summaries(points: &[(f64, f64)]) -> Vec<Policy> {
        points
            .iter()
            .map(|&(c, d)| Policy::summary(PolicySignature::with_cost_on_bad(c, c, d)))
            .collect()
    }

    #[test]
    fn extended_vertices_bracket_the_frontier() {
        let f = Frontier::from_policies(ctx(), summaries(&[(0.2, 0.6)]));
        assert_eq!(f.vertex(0), PolicySignature::RELEASE);
        assert_eq!(f.vertex(1).cost, 0.2);
        assert_eq!(f.vertex(2), PolicySignature::inspect(0.0));
        assert!(f.vertex_policy(2).is_inspect());
        assert_eq!(f.to_string(), "[(0 0) (0.2 0.6) (1 1)]");
    }

    #[test]
    fn area_of_empty_frontier_is_half() {
        assert!(approx_eq(Frontier::new(ctx()).area_under_curve(), 0.5));
        let f = Frontier::from_policies(ctx(), summaries(&[(0.2, 0.6)]));
        // 0.2*0.6/2 + 0.8*1.6/2
        assert!(approx_eq(f.area_under_curve(), 0.06 + 0.64));
    }

    #[test]
    fn validate_flags_concavity() {
        let good = Frontier::from_policies(ctx(), summaries(&[(0.2, 0.6), (0.5, 0.9)]));
        assert!(good.validate().is_ok());
        let dent = Frontier::from_policies(ctx(), summaries(&[(0.2, 0.3), (0.5, 0.9)]));
        assert!(matches!(dent.validate(), Err(EngineError::Invariant(_))));
        let expensive = Frontier::from_policies(ctx(), summaries(&[(1.2, 0.9)]));
        assert!(expensive.validate().is_err());
    }

    fn invariant_message(points: &[(f64, f64)]) -> String {
        match Frontier::from_policies(ctx(), summaries(points)).validate() {
            Err(EngineError::Invariant(message)) => message,
            other => panic!("expected an invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn validate_requires_strictly_increasing_cost() {
        let message = invariant_message(&[(0.2, 0.6), (0.2, 0.7)]);
        assert!(message.contains("does not cost more"), "{}", message);
    }

    #[test]
    fn validate_requires_non_decreasing_detection() {
        let message = invariant_message(&[(0.2, 0.6), (0.3, 0.5)]);
        assert!(message.contains("detects less"), "{}", message);
    }

    #[test]
    fn validate_requires_last_vertex_above_the_inspect_chord() {
        // (0.8, 0.85) is under the chord from (0.2, 0.6) to INSPECT (1, 1).
        let message = invariant_message(&[(0.2, 0.6), (0.8, 0.85)]);
        assert!(message.contains("chord to INSPECT"), "{}", message);
        let lone = invariant_message(&[(0.5, 0.4)]);
        assert!(lone.contains("vertex 0"), "{}", lone);
    }

    #[test]
    fn compact_round_trip_keeps_signatures() {
        let f = Frontier::from_policies(ctx(), summaries(&[(0.2, 0.6), (0.5, 0.9)]));
        let full = FrontierRepr::Full(f);
        let compact3 = full.to_compact(3).unwrap();
        assert_eq!(compact3.len(), 2);
        assert_eq!(compact3.cost_on_bad(1), Some(0.5));
        let compact2 = full.to_compact(2).unwrap();
        assert_eq!(compact2.cost_on_bad(1), None);
        let back = compact2.materialize();
        assert_eq!(back.detection_rate(0), 0.6);
        assert!(!back.policies()[0].has_tree());
        assert!(full.to_compact(4).is_err());
    }

    #[test]
    fn realign_resorts_for_new_pi() {
        let multi = FrontierContext::new(0.0, VertexSkip::Vm1, 1e-9, true, 0.0);
        let policies = vec![
            Policy::summary(PolicySignature::with_cost_on_bad(0.1, 0.9, 0.5)),
            Policy::summary(PolicySignature::with_cost_on_bad(0.3, 0.3, 0.6)),
        ];
        let f = Frontier::from_policies(multi, policies);
        let at_one = f.realign(multi.with_pi(1.0)).unwrap();
        assert!(at_one.validate().is_ok());
        assert_eq!(at_one.len(), 1);
        assert_eq!(at_one.cost0(0), 0.3);
    }
}
