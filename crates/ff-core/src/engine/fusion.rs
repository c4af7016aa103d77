//! Frontier construction from sensors.
//!
//! Test fusion puts a sensor at the root and attaches, to each of its
//! channels, a vertex of a downstream frontier. Every (channel, segment)
//! pair is an increment with a marginal detection/cost ratio; taking
//! increments in decreasing ratio order traces the new hull.

use std::sync::Arc;

use ff_math::{ratios_coincide, BACKWARDATION_TOLERANCE};

use super::context::FrontierContext;
use super::error::{EngineError, Result};
use super::frontier::{Frontier, FrontierView};
use super::policy::{sum_channel_runs, Policy};
use super::selection::select_necessary;
use super::sensor::Sensor;
use super::signature::PolicySignature;

/// Frontier of policies that run `sensor` once and inspect its top channels.
pub fn single_sensor_frontier(
    sensor: &Arc<Sensor>,
    ctx: &FrontierContext,
    full: bool,
) -> Result<Frontier> {
    let pi = ctx.pi;
    let release = PolicySignature::RELEASE;
    let inspect = ctx.inspect;
    let m = sensor.channel_count();
    let mut out: Vec<Policy> = Vec::new();

    for level in 1..m {
        let candidate = if full {
            let children = (0..m)
                .map(|i| {
                    if i < level {
                        Policy::inspect(inspect)
                    } else {
                        Policy::release()
                    }
                })
                .collect();
            Policy::from_children(Arc::clone(sensor), children)?
        } else {
            Policy::summary(PolicySignature::inspect_top_channels(sensor, level, &inspect))
        };
        let s = *candidate.signature();
        if s.cost_at(pi) >= ctx.inspect_cost() {
            break;
        }
        if out.is_empty() && s.is_below_ray(&release, &inspect, pi) {
            continue;
        }
        let last = out.last().map_or(release, |p| *p.signature());
        if s.is_below_ray(&last, &inspect, pi) {
            break;
        }
        if out.len() == 1 && !s.is_below_ray(&release, &last, pi) {
            out.clear();
        }
        out.push(candidate);
    }
    Ok(Frontier::from_policies(*ctx, out))
}

/// Increments in decreasing ratio order, flagging the earlier of two tied
/// increments as skippable.
///
/// `segments[i]` is how many increments channel `i` offers; `ratio(i, j)`
/// returns the ratio of channel `i`'s increment `j` and its inverse.
fn greedy_order(
    segments: &[usize],
    ratio: impl Fn(usize, usize) -> (f64, f64),
) -> Vec<(usize, bool)> {
    let mut used = vec![0usize; segments.len()];
    let mut order: Vec<(usize, bool)> = Vec::new();
    let mut last: Option<(f64, f64)> = None;
    loop {
        let mut best: Option<(usize, f64, f64)> = None;
        for (i, (&u, &count)) in used.iter().zip(segments).enumerate() {
            if u == count {
                continue;
            }
            let (r, inv) = ratio(i, u);
            if best.map_or(true, |(_, b, _)| r > b) {
                best = Some((i, r, inv));
            }
        }
        let Some((i, r, inv)) = best else { break };
        match last {
            Some((lr, linv)) if ratios_coincide(lr, linv, r, inv) => {
                if let Some(prev) = order.last_mut() {
                    prev.1 = true;
                }
            }
            _ => last = Some((r, inv)),
        }
        order.push((i, false));
        used[i] += 1;
    }
    order
}

/// Puts `sensor` on top of `downstream` (prior 0): every channel continues
/// with a vertex of the same frontier.
pub fn fuse(
    sensor: &Arc<Sensor>,
    downstream: &Frontier,
    ctx: &FrontierContext,
    full: bool,
) -> Result<Frontier> {
    if ctx.pi != 0.0 || downstream.context().pi != 0.0 {
        return Err(EngineError::InvalidArgument(
            "single-frontier fusion works at pi=0; use multi-pi fusion".to_string(),
        ));
    }
    let m = sensor.channel_count();
    let n = downstream.len();
    let vertices: Vec<PolicySignature> = (0..=n + 1).map(|k| downstream.vertex(k)).collect();

    let slopes: Vec<(f64, f64)> = vertices
        .windows(2)
        .map(|w| {
            let (dc, dd) = (w[1].cost - w[0].cost, w[1].detection - w[0].detection);
            (dd / dc, dc / dd)
        })
        .collect();
    let heights: Vec<(f64, f64)> = (0..m)
        .map(|i| {
            let (g, b) = (sensor.good(i), sensor.bad(i));
            (b / g, g / b)
        })
        .collect();
    let order = greedy_order(&vec![n + 1; m], |i, j| {
        (heights[i].0 * slopes[j].0, heights[i].1 * slopes[j].1)
    });

    let inspect_cost = ctx.inspect_cost();
    let mut used = vec![0usize; m];
    let mut out: Vec<Policy> = Vec::new();
    for (i, skippable) in order {
        used[i] += 1;
        if skippable {
            continue;
        }
        let runs = channel_runs(&used)?;
        let signature = sum_channel_runs(
            sensor,
            runs.iter()
                .filter(|r| r.2 > 0)
                .map(|&(first, last, u)| (first, last, &vertices[u])),
        );
        let c = signature.cost;
        if c >= inspect_cost {
            break;
        }
        let make = || {
            if full {
                let children = used.iter().map(|&u| downstream.vertex_policy(u)).collect();
                Policy::with_decision(signature, Arc::clone(sensor), children)
            } else {
                Policy::summary(signature)
            }
        };
        if let Some(prev) = out.last_mut() {
            let prev_sig = *prev.signature();
            if c <= prev_sig.cost {
                check_backwardation(prev_sig.cost - c, sensor)?;
                if signature.detection > prev_sig.detection {
                    *prev = make();
                }
                continue;
            }
        }
        out.push(make());
    }
    Ok(Frontier::from_policies(*ctx, select_necessary(ctx, out)?))
}

/// Puts `sensor` on top of one frontier per channel, each already realigned
/// to that channel's posterior prior. Signatures carry cost-on-bad.
pub fn fuse_multi_pi(
    sensor: &Arc<Sensor>,
    per_channel: &[Frontier],
    ctx: &FrontierContext,
    full: bool,
) -> Result<Frontier> {
    let m = sensor.channel_count();
    if per_channel.len() != m {
        return Err(EngineError::invariant(format!(
            "sensor {} has {} channels but {} frontiers were attached",
            sensor.name(),
            m,
            per_channel.len()
        )));
    }
    let pi = ctx.pi;

    // (cost, cost on bad, detection) of every extended vertex, per channel.
    let mut vertices: Vec<Vec<(f64, f64, f64)>> = Vec::with_capacity(m);
    for f in per_channel {
        let mut row = Vec::with_capacity(f.len() + 2);
        for k in 0..=f.len() + 1 {
            let v = f.vertex(k);
            let e = v.cost_on_bad.ok_or_else(|| {
                EngineError::invariant("multi-pi fusion needs cost on bad objects")
            })?;
            row.push((v.cost, e, v.detection));
        }
        vertices.push(row);
    }
    let goods: Vec<f64> = (0..m).map(|k| sensor.good(k)).collect();
    let bads: Vec<f64> = (0..m).map(|k| sensor.bad(k)).collect();

    let segments: Vec<usize> = per_channel.iter().map(|f| f.len() + 1).collect();
    let order = greedy_order(&segments, |k, j| {
        let (a, b) = (vertices[k][j], vertices[k][j + 1]);
        let gain = bads[k] * (b.2 - a.2);
        let spend = pi * bads[k] * (b.1 - a.1) + (1.0 - pi) * goods[k] * (b.0 - a.0);
        (gain / spend, spend / gain)
    });

    let inspect_cost = ctx.inspect_cost();
    let mut used = vec![0usize; m];
    let mut out: Vec<Policy> = Vec::new();
    for (k, skippable) in order {
        used[k] += 1;
        if skippable {
            continue;
        }
        let (mut c0, mut e, mut d) = (sensor.cost(), sensor.cost(), 0.0);
        for (ch, &u) in used.iter().enumerate() {
            if u == 0 {
                continue;
            }
            let (vc, ve, vd) = vertices[ch][u];
            c0 += goods[ch] * vc;
            e += bads[ch] * ve;
            d += bads[ch] * vd;
        }
        let signature = PolicySignature::with_cost_on_bad(c0, e, d);
        let c = signature.cost_at(pi);
        if c >= inspect_cost {
            break;
        }
        let make = || {
            if full {
                let children = used
                    .iter()
                    .zip(per_channel)
                    .map(|(&u, f)| f.vertex_policy(u))
                    .collect();
                Policy::with_decision(signature, Arc::clone(sensor), children)
            } else {
                Policy::summary(signature)
            }
        };
        if let Some(prev) = out.last_mut() {
            let prev_sig = *prev.signature();
            let back = prev_sig.cost_at(pi) - c;
            if back > 0.0 {
                check_backwardation(back, sensor)?;
                if d > prev_sig.detection {
                    *prev = make();
                }
                continue;
            }
        }
        out.push(make());
    }
    Ok(Frontier::from_policies(*ctx, select_necessary(ctx, out)?))
}

/// Runs of equal `used` values as `(first, last, used)`. Channels are
/// ordered by decreasing ratio, so `used` must not increase.
fn channel_runs(used: &[usize]) -> Result<Vec<(usize, usize, usize)>> {
    let mut runs = Vec::new();
    let mut first = 0;
    while first < used.len() {
        let u = used[first];
        let mut last = first;
        while last + 1 < used.len() && used[last + 1] == u {
            last += 1;
        }
        if last + 1 < used.len() && used[last + 1] > u {
            return Err(EngineError::invariant(format!(
                "channel {} uses more segments than channel {}",
                last + 1,
                last
            )));
        }
        runs.push((first, last, u));
        first = last + 1;
    }
    Ok(runs)
}

fn check_backwardation(back: f64, sensor: &Sensor) -> Result<()> {
    if back > BACKWARDATION_TOLERANCE {
        return Err(EngineError::invariant(format!(
            "backwardation of {} while fusing sensor {}",
            back,
            sensor.name()
        )));
    }
    Ok(())
}
