//! Inspection policies: a signature plus, optionally, the decision tree
//! that achieves it.
//!
//! Trees are immutable once built. A fused policy refers to the same child
//! policies as the frontier it was built from, so subtrees are shared
//! through [`Arc`] instead of copied.

use std::fmt;
use std::sync::Arc;

use super::error::{EngineError, Result};
use super::sensor::Sensor;
use super::signature::PolicySignature;

/// Leaf decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Release,
    Inspect,
}

/// A sensor run at the root of a subtree, with one child per channel.
#[derive(Debug)]
pub struct Decision {
    pub sensor: Arc<Sensor>,
    pub children: Vec<Policy>,
}

#[derive(Debug, Clone)]
pub enum PolicyNode {
    Trivial(Terminal),
    Internal(Arc<Decision>),
    /// Signature only; the tree was not stored.
    Summary,
}

/// A policy signature with its (optional) tree.
#[derive(Debug, Clone)]
pub struct Policy {
    signature: PolicySignature,
    node: PolicyNode,
}

/// Options for [`Policy::tree_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeFormat {
    /// Collapse runs of identical children into `n*TREE`.
    pub fold: bool,
    /// Stop printing after this many characters; 0 means unlimited.
    pub line_length: usize,
    /// Count multiplicities in channels of the pre-approximation sensors.
    pub original_sensors: bool,
}

impl Default for TreeFormat {
    fn default() -> Self {
        Self {
            fold: true,
            line_length: 0,
            original_sensors: false,
        }
    }
}

/// Marker printed in place of a tree that was not stored.
pub const TREE_NOT_STORED: &str = "TREE_NOT_STORED";

impl Policy {
    pub fn release() -> Self {
        Self {
            signature: PolicySignature::RELEASE,
            node: PolicyNode::Trivial(Terminal::Release),
        }
    }

    /// Inspect everything; `inspect` carries the overhead in use.
    pub fn inspect(inspect: PolicySignature) -> Self {
        Self {
            signature: inspect,
            node: PolicyNode::Trivial(Terminal::Inspect),
        }
    }

    pub fn summary(signature: PolicySignature) -> Self {
        Self {
            signature,
            node: PolicyNode::Summary,
        }
    }

    /// A decision node whose signature was computed by the caller.
    pub(crate) fn with_decision(
        signature: PolicySignature,
        sensor: Arc<Sensor>,
        children: Vec<Policy>,
    ) -> Self {
        Self {
            signature,
            node: PolicyNode::Internal(Arc::new(Decision { sensor, children })),
        }
    }

    /// Runs `sensor` and continues with `children[i]` on channel `i`.
    ///
    /// The signature is summed over runs of identical adjacent children, the
    /// same way test fusion sums it, so a parsed tree reproduces the value
    /// the fusion computed.
    pub fn from_children(sensor: Arc<Sensor>, children: Vec<Policy>) -> Result<Self> {
        if children.len() != sensor.channel_count() {
            return Err(EngineError::invariant(format!(
                "sensor {} has {} channels but {} children were given",
                sensor.name(),
                sensor.channel_count(),
                children.len()
            )));
        }
        let runs = equal_runs(&children)
            .filter(|&(first, _)| !children[first].is_release())
            .map(|(first, last)| (first, last, &children[first].signature));
        let signature = sum_channel_runs(&sensor, runs);
        Ok(Self::with_decision(signature, sensor, children))
    }

    pub fn signature(&self) -> &PolicySignature {
        &self.signature
    }

    pub fn node(&self) -> &PolicyNode {
        &self.node
    }

    pub fn is_release(&self) -> bool {
        matches!(self.node, PolicyNode::Trivial(Terminal::Release))
    }

    pub fn is_inspect(&self) -> bool {
        matches!(self.node, PolicyNode::Trivial(Terminal::Inspect))
    }

    /// Whether the decision tree is available.
    pub fn has_tree(&self) -> bool {
        !matches!(self.node, PolicyNode::Summary)
    }

    /// Same tree and, for summaries, the same numbers.
    pub fn structurally_equal(&self, other: &Policy) -> bool {
        match (&self.node, &other.node) {
            (PolicyNode::Trivial(a), PolicyNode::Trivial(b)) => a == b,
            (PolicyNode::Internal(a), PolicyNode::Internal(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.sensor.name() == b.sensor.name()
                        && a.children.len() == b.children.len()
                        && a
                            .children
                            .iter()
                            .zip(&b.children)
                            .all(|(x, y)| x.structurally_equal(y)))
            }
            (PolicyNode::Summary, PolicyNode::Summary) => self.signature == other.signature,
            _ => false,
        }
    }

    /// Prints the tree in the `TREE := I | R | (name: {[n*] TREE}+)` syntax.
    pub fn tree_string(&self, format: TreeFormat) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, format);
        out
    }

    /// Returns false once the length cap was hit.
    fn write_tree(&self, out: &mut String, format: TreeFormat) -> bool {
        let decision = match &self.node {
            PolicyNode::Trivial(Terminal::Release) => {
                out.push('R');
                return true;
            }
            PolicyNode::Trivial(Terminal::Inspect) => {
                out.push('I');
                return true;
            }
            PolicyNode::Summary => {
                out.push_str(TREE_NOT_STORED);
                return true;
            }
            PolicyNode::Internal(decision) => decision,
        };
        let fold = format.fold || format.original_sensors;
        out.push('(');
        out.push_str(decision.sensor.name());
        out.push(':');
        let children = &decision.children;
        let mut i = 0;
        let mut complete = true;
        while i < children.len() {
            if format.line_length > 0 && out.len() >= format.line_length {
                out.push_str(".....");
                complete = false;
                break;
            }
            let count = if fold {
                run_length(children, i)
            } else {
                1
            };
            let mult = if format.original_sensors {
                decision.sensor.original_channel_count(i, count)
            } else {
                count
            };
            out.push(' ');
            if mult > 1 {
                out.push_str(&format!("{}*", mult));
            }
            if !children[i].write_tree(out, format) {
                complete = false;
                break;
            }
            i += count;
        }
        out.push(')');
        complete
    }

    /// Describes the policy as a sensor: every leaf becomes one channel.
    ///
    /// Leaves are sorted by decreasing bad/good ratio and written as
    /// `cost(good): X`, `cost(bad): Y`, then cumulative points from `0 0`
    /// to exactly `1 1`.
    pub fn device_description(&self) -> Result<String> {
        let mut leaves = Vec::new();
        self.collect_leaf_masses(1.0, 1.0, &mut leaves)?;
        let (cost_good, cost_bad) = self.sensor_costs()?;

        leaves.retain(|&(g, b)| g > 0.0 || b > 0.0);
        let ratio = |(g, b): (f64, f64)| if g == 0.0 { f64::INFINITY } else { b / g };
        leaves.sort_by(|x, y| ratio(*y).total_cmp(&ratio(*x)));

        let goods: Vec<f64> = leaves.iter().map(|l| l.0).collect();
        let bads: Vec<f64> = leaves.iter().map(|l| l.1).collect();
        let (cum_good, cum_bad) = match (
            ff_math::two_sided_fractions(&goods),
            ff_math::two_sided_fractions(&bads),
        ) {
            (Some(g), Some(b)) => (g, b),
            _ => {
                return Err(EngineError::InvalidArgument(
                    "policy has no leaf with positive mass".to_string(),
                ))
            }
        };

        let mut out = format!("cost(good): {}\ncost(bad): {}\n", cost_good, cost_bad);
        for (g, b) in cum_good.iter().zip(&cum_bad) {
            out.push_str(&format!("{} {}\n", g, b));
        }
        Ok(out)
    }

    fn collect_leaf_masses(&self, g: f64, b: f64, out: &mut Vec<(f64, f64)>) -> Result<()> {
        match &self.node {
            PolicyNode::Trivial(_) => out.push((g, b)),
            PolicyNode::Internal(d) => {
                for (i, child) in d.children.iter().enumerate() {
                    child.collect_leaf_masses(g * d.sensor.good(i), b * d.sensor.bad(i), out)?;
                }
            }
            PolicyNode::Summary => return Err(tree_not_stored()),
        }
        Ok(())
    }

    /// Expected sensor cost (excluding inspection) on good and bad objects.
    fn sensor_costs(&self) -> Result<(f64, f64)> {
        match &self.node {
            PolicyNode::Trivial(_) => Ok((0.0, 0.0)),
            PolicyNode::Summary => Err(tree_not_stored()),
            PolicyNode::Internal(d) => {
                let (mut good, mut bad) = (d.sensor.cost(), d.sensor.cost());
                for (i, child) in d.children.iter().enumerate() {
                    if let PolicyNode::Internal(_) = child.node {
                        let (cg, cb) = child.sensor_costs()?;
                        good += d.sensor.good(i) * cg;
                        bad += d.sensor.bad(i) * cb;
                    }
                }
                Ok((good, bad))
            }
        }
    }
}

fn tree_not_stored() -> EngineError {
    EngineError::InvalidArgument("the policy tree was not stored".to_string())
}

/// Length of the run of children structurally equal to `children[start]`.
fn run_length(children: &[Policy], start: usize) -> usize {
    children[start..]
        .iter()
        .take_while(|c| c.structurally_equal(&children[start]))
        .count()
}

/// `(first, last)` channel ranges of equal adjacent children.
fn equal_runs(children: &[Policy]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut i = 0;
    std::iter::from_fn(move || {
        if i >= children.len() {
            return None;
        }
        let first = i;
        i += run_length(children, first);
        Some((first, i - 1))
    })
}

/// Signature of running `sensor` and continuing with a child per channel
/// range.
///
/// `runs` yields `(first, last, child)` for each channel range; ranges whose
/// child is RELEASE may be left out. Cost-on-bad is set only when every
/// child carries one.
pub(crate) fn sum_channel_runs<'a>(
    sensor: &Sensor,
    runs: impl IntoIterator<Item = (usize, usize, &'a PolicySignature)>,
) -> PolicySignature {
    let mut cost = sensor.cost();
    let mut cost_on_bad = Some(sensor.cost());
    let mut detection = 0.0;
    for (first, last, child) in runs {
        let g = sensor.good_range(first, last);
        let b = sensor.bad_range(first, last);
        cost += g * child.cost;
        cost_on_bad = match (cost_on_bad, child.cost_on_bad) {
            (Some(e), Some(child_e)) => Some(e + b * child_e),
            _ => None,
        };
        detection += b * child.detection;
    }
    PolicySignature {
        cost,
        cost_on_bad,
        detection,
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.signature.short_string(),
            self.tree_string(TreeFormat::default())
        )
    }
}
