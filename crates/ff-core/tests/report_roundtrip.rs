//! Saved frontiers: write to disk, read back, and query.

use std::fs;
use std::path::Path;

use ff_config::{EngineConfig, PiList, VertexSkip};
use ff_core::engine::{
    build_frontier, build_frontiers_multi_pi, detection_rate_for_budget, AnnotatedFrontier,
    EngineError, FrontierView, NoProgress, Sensor, TreeFormat,
};
use ff_core::io::{load_sensors, read_report, report_string, write_report};
use tempfile::TempDir;

fn write_inputs(dir: &Path) -> std::path::PathBuf {
    fs::write(
        dir.join("sensorA.txt"),
        "# three channels\ncost: 0.05\n0 0\n0.2 0.6\n0.4 0.8\n1 1\n",
    )
    .unwrap();
    fs::write(dir.join("sensorB.txt"), "cost 0.01\n0 0\n0.4, 0.6\n1, 1\n").unwrap();
    fs::write(
        dir.join("sensorC.txt"),
        "cost 0.02\n0 0\n0.05 0.3\n0.15 0.55\n0.35 0.8\n0.6 0.93\n1 1\n",
    )
    .unwrap();
    let config = dir.join("sensors.cfg");
    fs::write(&config, "sensorA.txt\nsensorB.txt\n2*sensorC.txt\n").unwrap();
    config
}

fn build(sensors: &[Sensor], config: &EngineConfig) -> AnnotatedFrontier {
    build_frontier(sensors, config, &mut NoProgress)
        .unwrap()
        .into_result()
        .unwrap()
}

fn save(dir: &Path, af: &AnnotatedFrontier) -> std::path::PathBuf {
    let path = dir.join("frontier.txt");
    let mut file = fs::File::create(&path).unwrap();
    write_report(&mut file, af).unwrap();
    path
}

#[test]
fn saved_file_reads_back_bit_for_bit() {
    let dir = TempDir::new().unwrap();
    let sensors = load_sensors(&write_inputs(dir.path())).unwrap();
    assert_eq!(sensors.len(), 3);
    assert_eq!(sensors[2].copies(), 2);

    let af = build(&sensors, &EngineConfig::default());
    let saved = read_report(&save(dir.path(), &af)).unwrap();

    assert_eq!(saved.summaries, 0);
    assert_eq!(saved.max_depth, af.max_depth);
    assert_eq!(saved.frontier.len(), af.frontier.len());
    for (a, b) in af.frontier.policies().iter().zip(saved.frontier.policies()) {
        assert_eq!(a.signature(), b.signature());
        assert_eq!(
            a.tree_string(TreeFormat::default()),
            b.tree_string(TreeFormat::default())
        );
    }
}

#[test]
fn saved_frontier_answers_budget_queries_like_the_built_one() {
    let dir = TempDir::new().unwrap();
    let sensors = load_sensors(&write_inputs(dir.path())).unwrap();
    let af = build(&sensors, &EngineConfig::default());
    let saved = read_report(&save(dir.path(), &af)).unwrap();

    for budget in [0.0, 0.05, 0.1, 0.2, 0.5, 0.9, 1.0] {
        let built = detection_rate_for_budget(&af.frontier, budget, true).unwrap();
        let read = detection_rate_for_budget(&saved.frontier, budget, true).unwrap();
        assert_eq!(built, read, "budget {}", budget);
    }
}

#[test]
fn approximated_sensors_round_trip() {
    let dir = TempDir::new().unwrap();
    let sensors = load_sensors(&write_inputs(dir.path())).unwrap();
    let config = EngineConfig {
        eps: 0.02,
        vs: VertexSkip::Vm2,
        ..EngineConfig::default()
    };
    let af = build(&sensors, &config);
    assert!(af.sensors.iter().any(|s| s.is_approximated()));

    let saved = read_report(&save(dir.path(), &af)).unwrap();
    assert_eq!(saved.frontier.context().vs, VertexSkip::Vm2);
    assert_eq!(saved.frontier.context().eps, 0.02);
    for (a, b) in af.frontier.policies().iter().zip(saved.frontier.policies()) {
        assert_eq!(a.signature(), b.signature());
    }
}

#[test]
fn capped_trees_fall_back_to_printed_values() {
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    let pair = dir.path().join("pair.cfg");
    fs::write(&pair, "sensorA.txt\nsensorB.txt\n").unwrap();
    let sensors = load_sensors(&pair).unwrap();
    let config = EngineConfig {
        line_length: 12,
        ..EngineConfig::default()
    };
    let af = build(&sensors, &config);
    let text = report_string(&af);
    assert!(text.contains("....."));

    let saved = read_report(&save(dir.path(), &af)).unwrap();
    assert!(saved.summaries > 0);
    assert_eq!(saved.frontier.len(), af.frontier.len());
    for i in 0..af.frontier.len() {
        let (a, b) = (af.frontier.signature(i), saved.frontier.signature(i));
        assert!((a.cost - b.cost).abs() < 1e-6);
        assert!((a.detection - b.detection).abs() < 1e-6);
    }
}

#[test]
fn multi_pi_reports_carry_cost_on_bad() {
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    let pair = dir.path().join("pair.cfg");
    fs::write(&pair, "sensorA.txt\nsensorB.txt\n").unwrap();
    let sensors = load_sensors(&pair).unwrap();
    let config = EngineConfig {
        pi: PiList::parse("0 0.5 1").unwrap(),
        ..EngineConfig::default()
    };
    let frontiers = build_frontiers_multi_pi(&sensors, &config, &mut NoProgress)
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(frontiers.len(), 3);

    let middle = &frontiers[1];
    let text = report_string(middle);
    assert!(text.contains("pi=0.5"));
    let saved = read_report(&save(dir.path(), middle)).unwrap();
    assert!(saved.frontier.context().multi_pi);
    assert_eq!(saved.frontier.context().pi, 0.5);
    assert_eq!(saved.frontier.len(), middle.frontier.len());
    // Trees are re-evaluated, so values agree up to summation order.
    for (a, b) in middle.frontier.policies().iter().zip(saved.frontier.policies()) {
        let (a, b) = (a.signature(), b.signature());
        assert!((a.cost - b.cost).abs() < 1e-12);
        assert!((a.detection - b.detection).abs() < 1e-12);
        assert!(b.cost_on_bad.is_some());
    }
}

#[test]
fn missing_report_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = read_report(&dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}

#[test]
fn garbage_is_a_data_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.txt");
    fs::write(&path, "this is not a frontier\n").unwrap();
    let err = read_report(&path).unwrap_err();
    assert!(matches!(err, EngineError::DataFormat { .. }));
}
