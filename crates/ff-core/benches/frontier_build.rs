//! Criterion benchmarks for the subset DP.
//!
//! Benchmarks single-pi builds over growing sensor lists, a multi-pi mesh,
//! and the sensor approximation pass that runs before every build.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ff_config::{EngineConfig, PiList, VertexSkip};
use ff_core::engine::{build_frontier, build_frontiers_multi_pi, FrontierView, NoProgress, Sensor};

// ── Helpers ──────────────────────────────────────────────────────────

/// A concave curve with `channels` channels whose bad/good ratio halves
/// from one channel to the next.
fn sensor(name: &str, cost: f64, channels: usize) -> Sensor {
    let mut slope = 4.0;
    let (mut good, mut bad) = (Vec::new(), Vec::new());
    for _ in 0..channels {
        good.push(1.0);
        bad.push(slope);
        slope *= 0.5;
    }
    let (tg, tb): (f64, f64) = (good.iter().sum(), bad.iter().sum());
    let (mut cg, mut cb) = (0.0, 0.0);
    let mut points = Vec::new();
    for i in 0..channels - 1 {
        cg += good[i] / tg;
        cb += bad[i] / tb;
        points.push((cg, cb));
    }
    points.push((1.0, 1.0));
    Sensor::new(name, cost, &points).expect("benchmark sensor is concave")
}

fn sensors(count: usize) -> Vec<Sensor> {
    (0..count)
        .map(|i| sensor(&format!("S{}", i), 0.01 * (i + 1) as f64, 3 + i % 3))
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_single_pi(c: &mut Criterion) {
    let mut group = c.benchmark_group("build/single_pi");
    let config = EngineConfig::default();
    for count in [2, 3, 4] {
        let input = sensors(count);
        group.bench_with_input(BenchmarkId::new("sensors", count), &input, |b, s| {
            b.iter(|| {
                let out = build_frontier(black_box(s), &config, &mut NoProgress).unwrap();
                black_box(out.into_result().unwrap().frontier.len());
            });
        });
    }
    group.finish();
}

fn bench_copies(c: &mut Criterion) {
    let mut group = c.benchmark_group("build/copies");
    let config = EngineConfig::default();
    for copies in [1, 2, 3] {
        let input = vec![
            sensor("A", 0.02, 4).with_copies(copies),
            sensor("B", 0.01, 3).with_copies(copies),
        ];
        group.bench_with_input(BenchmarkId::new("each", copies), &input, |b, s| {
            b.iter(|| {
                let out = build_frontier(black_box(s), &config, &mut NoProgress).unwrap();
                black_box(out.into_result().unwrap().frontier.len());
            });
        });
    }
    group.finish();
}

fn bench_multi_pi(c: &mut Criterion) {
    let mut group = c.benchmark_group("build/multi_pi");
    let input = sensors(3);
    for mesh in ["0 0.5 1", "0 0.25 0.5 0.75 1"] {
        let config = EngineConfig {
            pi: PiList::parse(mesh).unwrap(),
            ..EngineConfig::default()
        };
        let points = config.pi.len();
        group.bench_with_input(BenchmarkId::new("mesh", points), &config, |b, cfg| {
            b.iter(|| {
                let out = build_frontiers_multi_pi(black_box(&input), cfg, &mut NoProgress).unwrap();
                black_box(out.into_result().unwrap().len());
            });
        });
    }
    group.finish();
}

fn bench_vertex_skipping(c: &mut Criterion) {
    let mut group = c.benchmark_group("build/vertex_skipping");
    let input = sensors(3);
    for vs in [VertexSkip::Vm1, VertexSkip::Vm2, VertexSkip::Eb1] {
        let config = EngineConfig {
            vs,
            eps: 0.01,
            ..EngineConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("method", vs), &config, |b, cfg| {
            b.iter(|| {
                let out = build_frontier(black_box(&input), cfg, &mut NoProgress).unwrap();
                black_box(out.into_result().unwrap().frontier.len());
            });
        });
    }
    group.finish();
}

fn bench_sensor_approximation(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensor/approximate");
    let s = sensor("wide", 0.01, 40);
    for vs in [VertexSkip::Vm1, VertexSkip::Vm2, VertexSkip::Eb1] {
        group.bench_with_input(BenchmarkId::new("method", vs), &s, |b, s| {
            b.iter(|| black_box(s.approximate(vs, black_box(1e-3)).unwrap().channel_count()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_single_pi,
    bench_copies,
    bench_multi_pi,
    bench_vertex_skipping,
    bench_sensor_approximation
);
criterion_main!(benches);
