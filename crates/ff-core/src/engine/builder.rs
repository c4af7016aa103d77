//! The subset dynamic program.
//!
//! Every subset of sensor copies gets a frontier slot addressed by its
//! mixed-radix index. Size-1 slots hold single-sensor frontiers. A slot of
//! size `k` is the hull merge, over every sensor `j` it contains, of `j`
//! fused on top of the slot for the subset without one copy of `j`. Only
//! the two newest levels are kept alive.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use ff_config::EngineConfig;
use tracing::{debug, info};
use uuid::Uuid;

use super::context::FrontierContext;
use super::error::{EngineError, Result};
use super::frontier::{Frontier, FrontierRepr, FrontierView};
use super::fusion::{fuse, fuse_multi_pi, single_sensor_frontier};
use super::progress::{Flow, ProgressEvent, ProgressSink};
use super::selection::combine;
use super::sensor::Sensor;
use super::subset::{SensorSet, SubsetIndexer};
use crate::logging::events::event_names;

/// Result of a build that may have been cancelled by its progress sink.
#[derive(Debug, Clone)]
pub enum BuildOutcome<T> {
    Completed(T),
    Cancelled { level: usize, message: String },
}

impl<T> BuildOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildOutcome::Cancelled { .. })
    }

    /// Turns cancellation into [`EngineError::Cancelled`].
    pub fn into_result(self) -> Result<T> {
        match self {
            BuildOutcome::Completed(v) => Ok(v),
            BuildOutcome::Cancelled { level, message } => Err(EngineError::Cancelled(format!(
                "{} (after subset size {})",
                message, level
            ))),
        }
    }
}

/// A finished frontier plus what is needed to report it.
#[derive(Debug, Clone)]
pub struct AnnotatedFrontier {
    pub frontier: Frontier,
    /// Frontiers of every subset one copy smaller than the largest computed.
    pub others: Vec<Frontier>,
    /// Sensors as used by the build (after approximation).
    pub sensors: Vec<Arc<Sensor>>,
    pub config: EngineConfig,
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub runtime_ms: u64,
    /// Depth limit in effect; `None` when unrestricted.
    pub max_depth: Option<usize>,
}

/// Runs the subset DP for one sensor list and option set.
#[derive(Debug)]
pub struct FrontierBuilder {
    config: EngineConfig,
    sensors: Vec<Arc<Sensor>>,
    indexer: SubsetIndexer,
}

/// Wall-clock bookkeeping shared by the two entry points.
struct RunClock {
    run_id: Uuid,
    started_at: DateTime<Local>,
    started: Instant,
}

impl RunClock {
    fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Local::now(),
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl FrontierBuilder {
    /// Prepares sensors (approximating them if configured) and checks that
    /// the subset index space fits.
    pub fn new(sensors: &[Sensor], config: &EngineConfig) -> Result<Self> {
        let counts: Vec<usize> = sensors.iter().map(Sensor::copies).collect();
        let indexer = SubsetIndexer::new(&counts)?;
        let sensors = sensors
            .iter()
            .map(|s| {
                if config.approximate_sensors {
                    s.approximate(config.vs, config.eps).map(Arc::new)
                } else {
                    Ok(Arc::new(s.clone()))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config: config.clone(),
            sensors,
            indexer,
        })
    }

    pub fn sensors(&self) -> &[Arc<Sensor>] {
        &self.sensors
    }

    pub fn indexer(&self) -> &SubsetIndexer {
        &self.indexer
    }

    fn max_set_size(&self) -> usize {
        let total = self.indexer.total_copies();
        self.config.depth_limit(total).min(total)
    }

    fn full_trees(&self) -> bool {
        !self.config.signatures_only
    }

    fn store(&self, frontier: Frontier, arity: usize) -> Result<FrontierRepr> {
        let repr = FrontierRepr::Full(frontier);
        if self.config.signatures_only {
            repr.to_compact(arity)
        } else {
            Ok(repr)
        }
    }

    /// Fills levels `2..=max` of `slots`. Returns the cancelled level, if any.
    fn run_levels<T>(
        &self,
        slots: &mut [Option<T>],
        clock: &RunClock,
        pi_count: Option<usize>,
        progress: &mut dyn ProgressSink,
        mut compute: impl FnMut(&SensorSet, &[Option<T>]) -> Result<T>,
    ) -> Result<Option<(usize, String)>> {
        let max = self.max_set_size();
        if let Some(cancelled) = self.checkpoint(1, max, clock, pi_count, progress) {
            return Ok(Some(cancelled));
        }
        for size in 2..=max {
            let mut sets = 0usize;
            for set in self.indexer.sets_of_size(size) {
                let value = compute(&set, slots)?;
                slots[set.index()] = Some(value);
                sets += 1;
            }
            if size < max {
                for set in self.indexer.sets_of_size(size - 1) {
                    slots[set.index()] = None;
                }
            }
            debug!(
                event = event_names::BUILD_LEVEL_DONE,
                level = size,
                max_level = max,
                sets,
                elapsed_ms = clock.elapsed_ms(),
                "subset level done"
            );
            if let Some(cancelled) = self.checkpoint(size, max, clock, pi_count, progress) {
                return Ok(Some(cancelled));
            }
        }
        Ok(None)
    }

    fn checkpoint(
        &self,
        level: usize,
        max: usize,
        clock: &RunClock,
        pi_count: Option<usize>,
        progress: &mut dyn ProgressSink,
    ) -> Option<(usize, String)> {
        let mut event = ProgressEvent::new(
            event_names::BUILD_LEVEL_DONE,
            level,
            max,
            format!("computed subsets of size {} of {}", level.min(max), max),
        )
        .with_elapsed_ms(clock.elapsed_ms());
        if let Some(n) = pi_count {
            event = event.with_pi_count(n);
        }
        match progress.checkpoint(&event) {
            Flow::Continue => None,
            Flow::Cancel => {
                info!(
                    event = event_names::BUILD_CANCELLED,
                    level,
                    "frontier build cancelled"
                );
                Some((level, "frontier computation cancelled".to_string()))
            }
        }
    }

    fn slot<'s, T>(slots: &'s [Option<T>], index: usize) -> Result<&'s T> {
        slots
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| EngineError::invariant(format!("subset {} has no frontier", index)))
    }

    fn annotate(
        &self,
        frontier: Frontier,
        others: Vec<Frontier>,
        clock: &RunClock,
        finished_at: DateTime<Local>,
        runtime_ms: u64,
    ) -> AnnotatedFrontier {
        AnnotatedFrontier {
            frontier,
            others,
            sensors: self.sensors.clone(),
            config: self.config.clone(),
            run_id: clock.run_id,
            started_at: clock.started_at,
            finished_at,
            runtime_ms,
            max_depth: self.config.max_depth,
        }
    }

    /// Frontier at pi = 0.
    pub fn build(&self, progress: &mut dyn ProgressSink) -> Result<BuildOutcome<AnnotatedFrontier>> {
        let clock = RunClock::start();
        let ctx = FrontierContext::from_config(&self.config, 0.0, false);
        let full = self.full_trees();
        let max = self.max_set_size();
        info!(
            event = event_names::BUILD_STARTED,
            run_id = %clock.run_id,
            sensors = self.sensors.len(),
            copies = self.indexer.total_copies(),
            max_set_size = max,
            vs = %self.config.vs,
            eps = self.config.eps,
            "frontier build started"
        );

        let mut slots: Vec<Option<FrontierRepr>> =
            (0..self.indexer.slot_count()).map(|_| None).collect();
        if max >= 1 {
            for (i, sensor) in self.sensors.iter().enumerate() {
                if let Some(set) = self.indexer.single(i) {
                    let f = single_sensor_frontier(sensor, &ctx, full)?;
                    slots[set.index()] = Some(self.store(f, 2)?);
                }
            }
        }

        let cancelled = self.run_levels(&mut slots, &clock, None, progress, |set, slots| {
            let mut fused = Vec::new();
            for j in set.present() {
                let sub = self
                    .indexer
                    .minus(set, j)
                    .ok_or_else(|| EngineError::invariant("sensor missing from its subset"))?;
                let downstream = Self::slot(slots, sub)?.materialize();
                fused.push(fuse(&self.sensors[j], &downstream, &ctx, full)?);
            }
            let merged = combine(&ctx, fused)?;
            if self.config.paranoid {
                merged.validate()?;
            }
            self.store(merged, 2)
        })?;
        if let Some((level, message)) = cancelled {
            return Ok(BuildOutcome::Cancelled { level, message });
        }

        let frontier = self.final_frontier(&slots, max, &ctx, |r| r.materialize())?;
        let others = self.others(&slots, max, |r| r.materialize());
        let runtime_ms = clock.elapsed_ms();
        info!(
            event = event_names::BUILD_FINISHED,
            run_id = %clock.run_id,
            vertices = frontier.len(),
            runtime_ms,
            "frontier build finished"
        );
        Ok(BuildOutcome::Completed(self.annotate(
            frontier,
            others,
            &clock,
            Local::now(),
            runtime_ms,
        )))
    }

    /// One frontier per prior in the configured pi list.
    pub fn build_multi_pi(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> Result<BuildOutcome<Vec<AnnotatedFrontier>>> {
        let clock = RunClock::start();
        let pis = self.config.pi.values().to_vec();
        ff_config::validate::validate_pi_list(&pis)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))?;
        let ctxs: Vec<FrontierContext> = pis
            .iter()
            .map(|&pi| FrontierContext::from_config(&self.config, pi, true))
            .collect();
        let full = self.full_trees();
        let max = self.max_set_size();
        info!(
            event = event_names::BUILD_STARTED,
            run_id = %clock.run_id,
            sensors = self.sensors.len(),
            copies = self.indexer.total_copies(),
            max_set_size = max,
            pi_count = pis.len(),
            "multi-pi frontier build started"
        );

        let mut slots: Vec<Option<Vec<FrontierRepr>>> =
            (0..self.indexer.slot_count()).map(|_| None).collect();
        if max >= 1 {
            for (i, sensor) in self.sensors.iter().enumerate() {
                if let Some(set) = self.indexer.single(i) {
                    let per_pi = ctxs
                        .iter()
                        .map(|ctx| self.store(single_sensor_frontier(sensor, ctx, full)?, 3))
                        .collect::<Result<Vec<_>>>()?;
                    slots[set.index()] = Some(per_pi);
                }
            }
        }

        let cancelled =
            self.run_levels(&mut slots, &clock, Some(pis.len()), progress, |set, slots| {
                let mut per_pi = Vec::with_capacity(ctxs.len());
                for ctx in &ctxs {
                    let mut fused = Vec::new();
                    for j in set.present() {
                        let sub = self.indexer.minus(set, j).ok_or_else(|| {
                            EngineError::invariant("sensor missing from its subset")
                        })?;
                        let sub = Self::slot(slots, sub)?;
                        let sensor = &self.sensors[j];
                        let per_channel = (0..sensor.channel_count())
                            .map(|ch| {
                                adjusted_frontier(sub, &pis, ctx, sensor.good(ch), sensor.bad(ch))
                            })
                            .collect::<Result<Vec<_>>>()?;
                        fused.push(fuse_multi_pi(sensor, &per_channel, ctx, full)?);
                    }
                    let merged = combine(ctx, fused)?;
                    if self.config.paranoid {
                        merged.validate()?;
                    }
                    per_pi.push(self.store(merged, 3)?);
                }
                Ok(per_pi)
            })?;
        if let Some((level, message)) = cancelled {
            return Ok(BuildOutcome::Cancelled { level, message });
        }

        let mut results = Vec::with_capacity(ctxs.len());
        let finished_at = Local::now();
        let runtime_ms = clock.elapsed_ms();
        for (jp, ctx) in ctxs.iter().enumerate() {
            let frontier = self.final_frontier(&slots, max, ctx, |r| r[jp].materialize())?;
            let others = self.others(&slots, max, |r| r[jp].materialize());
            results.push(self.annotate(frontier, others, &clock, finished_at, runtime_ms));
        }
        info!(
            event = event_names::BUILD_FINISHED,
            run_id = %clock.run_id,
            pi_count = results.len(),
            runtime_ms,
            "multi-pi frontier build finished"
        );
        Ok(BuildOutcome::Completed(results))
    }

    /// The full-set slot, or the merge of every largest computed subset when
    /// the depth limit stopped the DP early.
    fn final_frontier<T>(
        &self,
        slots: &[Option<T>],
        max: usize,
        ctx: &FrontierContext,
        pick: impl Fn(&T) -> Frontier,
    ) -> Result<Frontier> {
        if max == 0 {
            return Ok(Frontier::new(*ctx));
        }
        if max == self.indexer.total_copies() {
            return Ok(pick(Self::slot(slots, self.indexer.slot_count() - 1)?));
        }
        let mut frontiers = Vec::new();
        for set in self.indexer.sets_of_size(max) {
            frontiers.push(pick(Self::slot(slots, set.index())?));
        }
        combine(ctx, frontiers)
    }

    fn others<T>(&self, slots: &[Option<T>], max: usize, pick: impl Fn(&T) -> Frontier) -> Vec<Frontier> {
        if max < 2 {
            return Vec::new();
        }
        self.indexer
            .sets_of_size(max - 1)
            .filter_map(|set| slots[set.index()].as_ref().map(&pick))
            .collect()
    }
}

/// The frontier a sensor channel continues with, at that channel's
/// posterior prior `pi*b / (pi*b + g*(1-pi))`.
///
/// Slices are precomputed only on the pi mesh: the nearest lower slice is
/// realigned to the posterior and, when the posterior falls strictly between
/// two slices, merged with the realigned upper one.
fn adjusted_frontier(
    slices: &[FrontierRepr],
    pis: &[f64],
    ctx: &FrontierContext,
    good: f64,
    bad: f64,
) -> Result<Frontier> {
    let pi = ctx.pi;
    let denom = pi * bad + good * (1.0 - pi);
    let adjusted = if denom > 0.0 { pi * bad / denom } else { pi };
    let jp = pis.iter().rposition(|&p| p <= adjusted).unwrap_or(0);
    let adj_ctx = ctx.with_pi(adjusted);
    let lower = slices[jp].materialize().realign(adj_ctx)?;
    if adjusted > pis[jp] && jp + 1 < slices.len() {
        let upper = slices[jp + 1].materialize().realign(adj_ctx)?;
        return combine(&adj_ctx, vec![lower, upper]);
    }
    Ok(lower)
}

/// Builds the pi = 0 frontier for `sensors` under `config`.
pub fn build_frontier(
    sensors: &[Sensor],
    config: &EngineConfig,
    progress: &mut dyn ProgressSink,
) -> Result<BuildOutcome<AnnotatedFrontier>> {
    FrontierBuilder::new(sensors, config)?.build(progress)
}

/// Builds one frontier per prior in `config.pi`.
pub fn build_frontiers_multi_pi(
    sensors: &[Sensor],
    config: &EngineConfig,
    progress: &mut dyn ProgressSink,
) -> Result<BuildOutcome<Vec<AnnotatedFrontier>>> {
    FrontierBuilder::new(sensors, config)?.build_multi_pi(progress)
}
