//! The two-sensor reference frontier.
//!
//! A = cost 0.05, curve (0.2 0.6) (0.4 0.8) (1 1)
//! B = cost 0.01, curve (0.4 0.6) (1 1)

use ff_config::EngineConfig;
use ff_core::engine::{
    budget_for_detection_rate, build_frontier, detection_rate_for_budget, AnnotatedFrontier,
    FrontierView, NoProgress, Sensor, TreeFormat,
};

const EXPECTED: [(f64, f64); 5] = [
    (0.11, 0.36),
    (0.25, 0.6),
    (0.332, 0.72),
    (0.45, 0.8),
    (0.68, 0.92),
];

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn sensors() -> Vec<Sensor> {
    vec![
        Sensor::new("A", 0.05, &[(0.2, 0.6), (0.4, 0.8), (1.0, 1.0)]).unwrap(),
        Sensor::new("B", 0.01, &[(0.4, 0.6), (1.0, 1.0)]).unwrap(),
    ]
}

fn build(config: &EngineConfig) -> AnnotatedFrontier {
    build_frontier(&sensors(), config, &mut NoProgress)
        .expect("build should succeed")
        .into_result()
        .expect("build should not be cancelled")
}

fn signatures(af: &AnnotatedFrontier) -> Vec<(f64, f64)> {
    (0..af.frontier.len())
        .map(|i| (af.frontier.cost0(i), af.frontier.detection_rate(i)))
        .collect()
}

#[test]
fn frontier_has_the_five_reference_policies() {
    let af = build(&EngineConfig::default());
    let got = signatures(&af);
    assert_eq!(got.len(), EXPECTED.len(), "got {:?}", got);
    for (i, ((c, d), (ec, ed))) in got.iter().zip(EXPECTED.iter()).enumerate() {
        assert!(
            approx_eq(*c, *ec) && approx_eq(*d, *ed),
            "vertex {}: got ({}, {}), expected ({}, {})",
            i,
            c,
            d,
            ec,
            ed
        );
    }
    af.frontier.validate().unwrap();
}

#[test]
fn frontier_is_bracketed_by_release_and_inspect() {
    let af = build(&EngineConfig::default());
    let n = af.frontier.len();
    let release = af.frontier.vertex(0);
    let inspect = af.frontier.vertex(n + 1);
    assert_eq!((release.cost, release.detection), (0.0, 0.0));
    assert_eq!((inspect.cost, inspect.detection), (1.0, 1.0));
}

#[test]
fn cheapest_policy_screens_with_b_then_a() {
    let af = build(&EngineConfig::default());
    let tree = af.frontier.policies()[0].tree_string(TreeFormat::default());
    assert_eq!(tree, "(B: (A: I 2*R) R)");
}

#[test]
fn every_policy_has_a_tree() {
    let af = build(&EngineConfig::default());
    for p in af.frontier.policies() {
        assert!(p.has_tree());
        assert!(p.tree_string(TreeFormat::default()).starts_with('('));
    }
}

#[test]
fn deep_enough_limit_matches_unrestricted() {
    let unrestricted = build(&EngineConfig::default());
    for depth in [2, 3, 10] {
        let limited = build(&EngineConfig {
            max_depth: Some(depth),
            ..EngineConfig::default()
        });
        assert_eq!(signatures(&limited), signatures(&unrestricted), "maxDepth={}", depth);
    }
}

#[test]
fn depth_one_uses_a_single_sensor_per_policy() {
    let af = build(&EngineConfig {
        max_depth: Some(1),
        ..EngineConfig::default()
    });
    af.frontier.validate().unwrap();
    assert!(af.frontier.len() < EXPECTED.len());
    for p in af.frontier.policies() {
        let tree = p.tree_string(TreeFormat::default());
        assert_eq!(tree.matches('(').count(), 1, "{}", tree);
    }
}

#[test]
fn budget_at_inspect_cost_buys_full_detection() {
    let af = build(&EngineConfig::default());
    let out = detection_rate_for_budget(&af.frontier, 1.0, true).unwrap();
    assert_eq!(out.detection, 1.0);
    assert_eq!(out.weight_low, 1.0);
    assert!(!out.is_mixed());
    assert_eq!(out.low_vertex, af.frontier.len() + 1);
}

#[test]
fn budget_between_vertices_mixes() {
    let af = build(&EngineConfig::default());
    let out = detection_rate_for_budget(&af.frontier, 0.18, true).unwrap();
    assert!(out.is_mixed());
    assert_eq!((out.low_vertex, out.high_vertex), (1, 2));
    assert!(approx_eq(out.weight_low, 0.5));
    assert!(approx_eq(out.detection, 0.48));

    let pure = detection_rate_for_budget(&af.frontier, 0.18, false).unwrap();
    assert!(!pure.is_mixed());
    assert!(approx_eq(pure.detection, 0.36));
}

#[test]
fn detection_target_finds_the_bracketing_chord() {
    let af = build(&EngineConfig::default());
    let out = budget_for_detection_rate(&af.frontier, 0.48, true).unwrap();
    assert!(approx_eq(out.cost, 0.18));

    let exact = budget_for_detection_rate(&af.frontier, 0.6, true).unwrap();
    assert!(approx_eq(exact.cost, 0.25));

    let pure = budget_for_detection_rate(&af.frontier, 0.5, false).unwrap();
    assert!(!pure.is_mixed());
    assert_eq!(pure.low_vertex, 2);
}

#[test]
fn overhead_raises_inspect_costs() {
    let af = build(&EngineConfig {
        inspection_overhead: 0.5,
        ..EngineConfig::default()
    });
    af.frontier.validate().unwrap();
    let inspect = af.frontier.vertex(af.frontier.len() + 1);
    assert!(approx_eq(inspect.cost, 1.5));
    assert_eq!(inspect.cost_on_bad, Some(1.0));
}
