//! Sensor model: a classifier with a cost and a discretized ROC curve.
//!
//! A sensor with `M` channels stores the cumulative good and bad fractions
//! at the end of each channel. The last entry is always `(1, 1)`. Channels
//! are ordered by non-increasing bad/good ratio, so the first channel is the
//! one where bad objects are most concentrated.

use std::fmt;
use std::sync::Arc;

use ff_config::VertexSkip;
use tracing::debug;

use super::context::FrontierContext;
use super::error::{EngineError, Result};
use super::fusion::single_sensor_frontier;
use super::selection::{approximate_eb1, approximate_vm2};
use crate::logging::events::event_names;

/// One classifier: name, cost, and cumulative (good, bad) fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    name: String,
    cost: f64,
    cum_good: Vec<f64>,
    cum_bad: Vec<f64>,
    copies: usize,
    /// Pre-approximation sensor, and for each kept channel the last original
    /// channel it covers.
    origin: Option<(Arc<Sensor>, Vec<usize>)>,
}

impl Sensor {
    /// Builds and validates a sensor from its ROC points.
    ///
    /// `points` are cumulative `(good, bad)` fractions at the end of each
    /// channel, without the leading `(0, 0)`. The last point must be exactly
    /// `(1, 1)`.
    pub fn new(name: impl Into<String>, cost: f64, points: &[(f64, f64)]) -> Result<Self> {
        let name = name.into();
        if !cost.is_finite() || cost < 0.0 {
            return Err(EngineError::data_format(
                name,
                None,
                cost.to_string(),
                "sensor cost must be finite and non-negative",
            ));
        }
        let cum_good: Vec<f64> = points.iter().map(|p| p.0).collect();
        let cum_bad: Vec<f64> = points.iter().map(|p| p.1).collect();
        validate_points(&name, &cum_good, &cum_bad)?;
        Ok(Self {
            name,
            cost,
            cum_good,
            cum_bad,
            copies: 1,
            origin: None,
        })
    }

    /// Cumulative arrays that are already known to be valid.
    fn from_cumulative(
        name: String,
        cost: f64,
        cum_good: Vec<f64>,
        cum_bad: Vec<f64>,
        copies: usize,
    ) -> Self {
        Self {
            name,
            cost,
            cum_good,
            cum_bad,
            copies,
            origin: None,
        }
    }

    pub fn with_copies(mut self, copies: usize) -> Self {
        self.copies = copies;
        self
    }

    /// A copy of this sensor at another cost.
    pub fn with_cost(&self, cost: f64) -> Self {
        Self {
            cost,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// How many identical copies of this sensor may be used.
    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Number of output channels `M`.
    pub fn channel_count(&self) -> usize {
        self.cum_good.len()
    }

    /// Marginal good fraction routed to channel `i`.
    pub fn good(&self, i: usize) -> f64 {
        self.good_range(i, i)
    }

    /// Marginal bad fraction routed to channel `i`.
    pub fn bad(&self, i: usize) -> f64 {
        self.bad_range(i, i)
    }

    /// Good fraction routed to channels `i1..=i2`.
    pub fn good_range(&self, i1: usize, i2: usize) -> f64 {
        range_sum(&self.cum_good, i1, i2)
    }

    /// Bad fraction routed to channels `i1..=i2`.
    pub fn bad_range(&self, i1: usize, i2: usize) -> f64 {
        range_sum(&self.cum_bad, i1, i2)
    }

    /// Good fraction routed to the first `level` channels.
    pub fn cum_good(&self, level: usize) -> f64 {
        if level == 0 {
            0.0
        } else {
            self.cum_good[level - 1]
        }
    }

    /// Bad fraction routed to the first `level` channels.
    pub fn cum_bad(&self, level: usize) -> f64 {
        if level == 0 {
            0.0
        } else {
            self.cum_bad[level - 1]
        }
    }

    /// Cumulative `(good, bad)` points, ending with `(1, 1)`.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.cum_good.iter().copied().zip(self.cum_bad.iter().copied())
    }

    /// The sensor this one was approximated from, or itself.
    pub fn original(&self) -> &Sensor {
        match &self.origin {
            Some((original, _)) => original,
            None => self,
        }
    }

    pub fn is_approximated(&self) -> bool {
        self.origin.is_some()
    }

    /// Number of original channels covered by kept channels
    /// `first..first+count`.
    pub fn original_channel_count(&self, first: usize, count: usize) -> usize {
        match &self.origin {
            None => count,
            Some((_, map)) => {
                let last = map[first + count - 1];
                if first == 0 {
                    last + 1
                } else {
                    last - map[first - 1]
                }
            }
        }
    }

    /// Merges channels to shrink the sensor.
    ///
    /// VM1 merges consecutive channels whose cumulative point is within
    /// `eps` of the last kept point. VM2 and EB1 build the zero-cost ROC hull
    /// and apply the frontier pruning pass of the same name. The result
    /// remembers this sensor as its original.
    pub fn approximate(&self, vs: VertexSkip, eps: f64) -> Result<Sensor> {
        let (good, bad, map) = match vs {
            VertexSkip::Vm1 => self.merge_close_channels(eps),
            VertexSkip::Vm2 | VertexSkip::Eb1 => self.prune_hull_vertices(vs, eps)?,
        };
        debug!(
            event = event_names::SENSOR_APPROXIMATED,
            sensor = %self.name,
            method = %vs,
            channels_before = self.channel_count(),
            channels_after = good.len(),
            "sensor approximated"
        );
        let mut approx =
            Sensor::from_cumulative(self.name.clone(), self.cost, good, bad, self.copies);
        approx.origin = Some((Arc::new(self.original().clone()), self.compose_map(map)));
        Ok(approx)
    }

    /// Re-expresses a channel map over this sensor in terms of the original.
    fn compose_map(&self, map: Vec<usize>) -> Vec<usize> {
        match &self.origin {
            None => map,
            Some((_, inner)) => map.into_iter().map(|k| inner[k]).collect(),
        }
    }

    fn merge_close_channels(&self, eps: f64) -> (Vec<f64>, Vec<f64>, Vec<usize>) {
        let m = self.channel_count();
        let (mut good, mut bad, mut map) = (Vec::new(), Vec::new(), Vec::new());
        let (mut last_good, mut last_bad) = (0.0, 0.0);
        for i in 0..m {
            if i < m - 1 && self.cum_bad[i] <= last_bad + eps && self.cum_good[i] <= last_good + eps
            {
                continue;
            }
            last_good = self.cum_good[i];
            last_bad = self.cum_bad[i];
            good.push(last_good);
            bad.push(last_bad);
            map.push(i);
        }
        (good, bad, map)
    }

    fn prune_hull_vertices(
        &self,
        vs: VertexSkip,
        eps: f64,
    ) -> Result<(Vec<f64>, Vec<f64>, Vec<usize>)> {
        let ctx = FrontierContext::new(0.0, vs, eps, false, 0.0);
        let free = self.with_cost(0.0);
        let hull = single_sensor_frontier(&Arc::new(free), &ctx, false)?.into_policies();
        let kept = match vs {
            VertexSkip::Eb1 => approximate_eb1(&ctx, hull),
            _ => approximate_vm2(&ctx, hull),
        };

        let mut kept_good: Vec<f64> = kept.iter().map(|p| p.signature().cost).collect();
        let mut kept_bad: Vec<f64> = kept.iter().map(|p| p.signature().detection).collect();
        kept_good.push(1.0);
        kept_bad.push(1.0);

        let mut map = Vec::with_capacity(kept_good.len());
        let mut j = 0;
        for (&g, &b) in kept_good.iter().zip(&kept_bad) {
            while j < self.channel_count() && (self.cum_good[j] < g || self.cum_bad[j] < b) {
                if self.cum_good[j] > g || self.cum_bad[j] > b {
                    return Err(EngineError::invariant(format!(
                        "sensor {}: kept point ({} {}) crosses original point {}",
                        self.name, g, b, j
                    )));
                }
                j += 1;
            }
            if j >= self.channel_count() || self.cum_good[j] != g || self.cum_bad[j] != b {
                return Err(EngineError::invariant(format!(
                    "sensor {}: kept point ({} {}) is not an original point",
                    self.name, g, b
                )));
            }
            map.push(j);
            j += 1;
        }
        Ok((kept_good, kept_bad, map))
    }
}

fn range_sum(cum: &[f64], i1: usize, i2: usize) -> f64 {
    if i1 == 0 {
        cum[i2]
    } else {
        cum[i2] - cum[i1 - 1]
    }
}

fn validate_points(name: &str, cum_good: &[f64], cum_bad: &[f64]) -> Result<()> {
    let fail = |i: usize, message: String| {
        Err(EngineError::data_format(
            name,
            Some(i),
            format!("({} {})", cum_good[i], cum_bad[i]),
            message,
        ))
    };
    let (mut prev_g, mut prev_b) = (0.0, 0.0);
    let (mut last_g, mut last_b) = (0.0, 0.0);
    for i in 0..cum_good.len() {
        let (g, b) = (cum_good[i] - last_g, cum_bad[i] - last_b);
        if !(g >= 0.0 && b >= 0.0) {
            return fail(i, format!("channel {} has a negative increment", i));
        }
        if i == 0 {
            if b < g {
                return fail(
                    i,
                    "first channel has bad/good ratio below 1; the curve should be flipped"
                        .to_string(),
                );
            }
        } else if b * prev_g > g * prev_b {
            return fail(
                i,
                format!("channel {} has a higher bad/good ratio than channel {}", i, i - 1),
            );
        }
        prev_g = g;
        prev_b = b;
        last_g = cum_good[i];
        last_b = cum_bad[i];
    }
    match cum_good.len() {
        0 => Err(EngineError::data_format(name, None, "", "sensor has no channels")),
        n if cum_good[n - 1] != 1.0 || cum_bad[n - 1] != 1.0 => {
            fail(n - 1, "end point is not (1 1)".to_string())
        }
        _ => Ok(()),
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}: c={} (", self.name, self.cost)?;
        for (g, b) in self.points() {
            write!(f, "({} {}) ", g, b)?;
        }
        write!(f, ")}}")
    }
}
