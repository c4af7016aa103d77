//! frontier-finder: batch computation of efficient inspection frontiers.
//!
//! Reads a config list of sensor files, builds the cost / detection-rate
//! frontier, and writes it to stdout. Saved frontiers can then be queried
//! for budgets or detection rates, and single policies exported as sensors.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgGroup, Args, Parser, Subcommand};
use ff_common::error::StructuredError;
use ff_common::{Error, OutputFormat, SCHEMA_VERSION};
use ff_config::{load_config, ConfigError, ConfigOverrides, EngineConfig, PiList, VertexSkip};
use ff_core::engine::{
    budget_for_detection_rate, detection_rate_for_budget, AnnotatedFrontier, BudgetOutcome,
    BuildOutcome, FrontierBuilder, FrontierView, JsonlProgress, MixChoice, NoProgress,
    ProgressSink, TreeFormat,
};
use ff_core::exit_codes::ExitCode;
use ff_core::io::{
    load_sensors, read_report, read_sensor_file, report_json, sensor_text, write_report,
    PolicyParser, SavedFrontier,
};
use ff_core::logging::{event_names, init_logging, LogConfig, LogFormat, Stage};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{error, info, warn};

/// Frontier Finder - efficient frontiers of sensor inspection policies
#[derive(Parser)]
#[command(name = "frontier-finder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Options file (JSON); defaults to FF_CONFIG or the user config dir
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Write one JSON progress line per subset level to stderr
    #[arg(long, global = true)]
    progress: bool,

    #[command(flatten)]
    engine: EngineOpts,
}

/// Engine option overrides (highest priority layer)
#[derive(Args, Debug, Default)]
struct EngineOpts {
    /// Vertex-skipping tolerance
    #[arg(long, global = true)]
    eps: Option<f64>,

    /// Vertex-skipping method: VM1, VM2 or EB1
    #[arg(long, global = true)]
    vs: Option<VertexSkip>,

    /// Largest number of sensors along a policy path; negative for no limit
    #[arg(long, global = true, allow_negative_numbers = true)]
    max_depth: Option<i64>,

    /// Extra cost of inspecting a good object (E)
    #[arg(long = "overhead", short = 'E', global = true)]
    overhead: Option<f64>,

    /// Validate every intermediate frontier
    #[arg(long, global = true)]
    paranoid: bool,

    /// Keep only (cost, detection) values, not policy trees
    #[arg(long, global = true)]
    signatures_only: bool,

    /// Print every child instead of n*TREE runs
    #[arg(long, global = true)]
    no_fold: bool,

    /// Use sensor curves as given, without approximation
    #[arg(long, global = true)]
    exact_sensors: bool,

    /// Print trees in terms of the unapproximated sensors
    #[arg(long, global = true)]
    original_sensors: bool,

    /// Cap printed trees at this many characters (0 = unlimited)
    #[arg(long, global = true)]
    line_length: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the frontier at pi = 0 and write it as a saved frontier
    Build {
        /// Config list naming the sensor files
        config: PathBuf,
    },

    /// Build one frontier per prior on a pi mesh
    MultiPi {
        config: PathBuf,

        /// Pi mesh, e.g. "0 0.25 0.5 1"
        #[arg(long)]
        pi: String,
    },

    /// Best detection rate for a budget, or cheapest cost for a detection rate
    #[command(group(ArgGroup::new("query").required(true).args(["budget", "detection"])))]
    Budget {
        /// Saved frontier
        saved: PathBuf,

        #[arg(long)]
        budget: Option<f64>,

        #[arg(long)]
        detection: Option<f64>,

        /// Only deterministic policies; no randomized mixes
        #[arg(long)]
        no_mix: bool,

        /// Draw the policy for this many objects and report the split
        #[arg(long, value_name = "N")]
        sample: Option<usize>,

        /// Seed for --sample; random when absent
        #[arg(long, requires = "sample")]
        seed: Option<u64>,
    },

    /// Evaluate policy trees over the sensors of a config list
    CheckTree {
        config: PathBuf,

        /// Trees such as "(B: (A: I 2*R) R)"
        #[arg(required = true)]
        trees: Vec<String>,
    },

    /// Approximate one sensor file with --vs and --eps
    Approximate {
        sensor: PathBuf,
    },

    /// Describe one policy of a saved frontier as a new sensor
    ExportPolicy {
        saved: PathBuf,

        /// POLICY index as printed in the saved frontier
        index: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_config =
        LogConfig::from_env(cli.global.verbose, cli.global.quiet, cli.global.log_format);
    init_logging(&log_config);
    for (var, value) in &log_config.ignored {
        warn!(var = *var, value = %value, "ignoring unrecognised log setting");
    }

    let result = match &cli.command {
        Commands::Build { config } => run_build(&cli.global, config),
        Commands::MultiPi { config, pi } => run_multi_pi(&cli.global, config, pi),
        Commands::Budget {
            saved,
            budget,
            detection,
            no_mix,
            sample,
            seed,
        } => run_budget(
            &cli.global,
            saved,
            BudgetQuery {
                budget: *budget,
                detection: *detection,
                can_mix: !no_mix,
                sample: *sample,
                seed: *seed,
            },
        ),
        Commands::CheckTree { config, trees } => run_check_tree(&cli.global, config, trees),
        Commands::Approximate { sensor } => run_approximate(&cli.global, sensor),
        Commands::ExportPolicy { saved, index } => run_export_policy(saved, *index),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => output_error(&cli.global, &err),
    };
    std::process::exit(exit_code.as_i32());
}

type CmdResult = Result<ExitCode, Error>;

fn output_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    let code = ExitCode::for_error(err);
    error!(
        event = event_names::COMMAND_FAILED,
        code = err.code(),
        category = %err.category(),
        exit = %code,
        "{}",
        err
    );
    match global.format {
        OutputFormat::Json => println!("{}", StructuredError::from(err).to_json()),
        _ => eprintln!("{}", err.to_human()),
    }
    code
}

fn config_error(err: ConfigError) -> Error {
    match err {
        ConfigError::InvalidEnv {
            var,
            value,
            message,
        } => Error::InvalidOption {
            name: var,
            message: format!("'{}': {}", value, message),
        },
        other => Error::Config(other.to_string()),
    }
}

fn resolve_config(global: &GlobalOpts, pi: Option<PiList>) -> Result<EngineConfig, Error> {
    let e = &global.engine;
    let flag = |set: bool| set.then_some(true);
    let overrides = ConfigOverrides {
        eps: e.eps,
        vs: e.vs,
        max_depth: e.max_depth,
        inspection_overhead: e.overhead,
        pi,
        paranoid: flag(e.paranoid),
        signatures_only: flag(e.signatures_only),
        fold: e.no_fold.then_some(false),
        approximate_sensors: e.exact_sensors.then_some(false),
        original_sensors_in_trees: flag(e.original_sensors),
        line_length: e.line_length,
    };
    let resolved = load_config(global.options.as_deref(), &overrides).map_err(config_error)?;
    info!(
        event = event_names::CONFIG_LOADED,
        stage = %Stage::Init,
        source = %resolved.source,
        eps = resolved.config.eps,
        vs = %resolved.config.vs,
        "options resolved"
    );
    Ok(resolved.config)
}

fn progress_sink(global: &GlobalOpts) -> Box<dyn ProgressSink> {
    if global.progress {
        Box::new(JsonlProgress::new(std::io::stderr()))
    } else {
        Box::new(NoProgress)
    }
}

fn cancelled(level: usize, message: &str) -> CmdResult {
    eprintln!("{} (after subset size {})", message, level);
    Ok(ExitCode::Cancelled)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn summary_line(af: &AnnotatedFrontier) -> String {
    format!(
        "pi={} policies={} area={:.6} runtime_ms={} {}",
        af.frontier.context().pi,
        af.frontier.len(),
        af.frontier.area_under_curve(),
        af.runtime_ms,
        af.frontier
    )
}

fn run_build(global: &GlobalOpts, config_path: &Path) -> CmdResult {
    let config = resolve_config(global, None)?;
    let sensors = load_sensors(config_path)?;
    let builder = FrontierBuilder::new(&sensors, &config)?;
    let af = match builder.build(progress_sink(global).as_mut())? {
        BuildOutcome::Completed(af) => af,
        BuildOutcome::Cancelled { level, message } => return cancelled(level, &message),
    };

    match global.format {
        OutputFormat::Json => print_json(&report_json(&af))?,
        OutputFormat::Summary => println!("{}", summary_line(&af)),
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_report(&mut out, &af)?;
            out.flush()?;
        }
    }
    Ok(ExitCode::Clean)
}

fn run_multi_pi(global: &GlobalOpts, config_path: &Path, pi: &str) -> CmdResult {
    let pis = PiList::parse(pi).map_err(|e| Error::InvalidOption {
        name: "--pi".to_string(),
        message: e.to_string(),
    })?;
    let config = resolve_config(global, Some(pis))?;
    let sensors = load_sensors(config_path)?;
    let builder = FrontierBuilder::new(&sensors, &config)?;
    let frontiers = match builder.build_multi_pi(progress_sink(global).as_mut())? {
        BuildOutcome::Completed(v) => v,
        BuildOutcome::Cancelled { level, message } => return cancelled(level, &message),
    };

    match global.format {
        OutputFormat::Json => {
            let reports: Vec<_> = frontiers.iter().map(report_json).collect();
            print_json(&serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "frontiers": reports,
            }))?;
        }
        OutputFormat::Summary => {
            for af in &frontiers {
                println!("{}", summary_line(af));
            }
        }
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for af in &frontiers {
                write_report(&mut out, af)?;
            }
            out.flush()?;
        }
    }
    Ok(ExitCode::Clean)
}

fn vertex_label(k: usize, len: usize) -> String {
    if k == 0 {
        "RELEASE".to_string()
    } else if k > len {
        "INSPECT".to_string()
    } else {
        format!("POLICY {}", k - 1)
    }
}

struct BudgetQuery {
    budget: Option<f64>,
    detection: Option<f64>,
    can_mix: bool,
    sample: Option<usize>,
    seed: Option<u64>,
}

/// Draws `draws` objects through the mix; returns how many took each side.
fn sample_split(outcome: &BudgetOutcome, draws: usize, seed: Option<u64>) -> (usize, usize) {
    let mut rng: Box<dyn RngCore> = match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(rand::rng()),
    };
    let low = (0..draws)
        .filter(|_| outcome.sample(&mut *rng) == MixChoice::Low)
        .count();
    (low, draws - low)
}

fn run_budget(global: &GlobalOpts, saved_path: &Path, query: BudgetQuery) -> CmdResult {
    let saved = read_report(saved_path)?;
    let frontier = &saved.frontier;
    let outcome: BudgetOutcome = match (query.budget, query.detection) {
        (Some(b), _) => detection_rate_for_budget(frontier, b, query.can_mix)?,
        (None, Some(d)) => budget_for_detection_rate(frontier, d, query.can_mix)?,
        (None, None) => {
            return Err(Error::InvalidArgument(
                "one of --budget or --detection is required".to_string(),
            ))
        }
    };
    let split = query
        .sample
        .map(|draws| (draws, sample_split(&outcome, draws, query.seed)));
    info!(
        event = event_names::QUERY_ANSWERED,
        stage = %Stage::Query,
        cost = outcome.cost,
        detection = outcome.detection,
        mixed = outcome.is_mixed(),
        "budget query answered"
    );

    let len = frontier.len();
    let tree = |k: usize| frontier.vertex_policy(k).tree_string(TreeFormat::default());
    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "pi": frontier.context().pi,
            "outcome": outcome,
            "low_label": vertex_label(outcome.low_vertex, len),
            "low_tree": tree(outcome.low_vertex),
            "high_label": vertex_label(outcome.high_vertex, len),
            "high_tree": tree(outcome.high_vertex),
            "sample": split.map(|(draws, (low, high))| serde_json::json!({
                "draws": draws,
                "low": low,
                "high": high,
            })),
        }))?,
        _ => {
            println!(
                "cost={} detection={} mixed={}",
                outcome.cost,
                outcome.detection,
                outcome.is_mixed()
            );
            println!(
                "[{}] {} weight={} {}",
                vertex_label(outcome.low_vertex, len),
                outcome.low.short_string(),
                outcome.weight_low,
                tree(outcome.low_vertex)
            );
            if outcome.is_mixed() {
                println!(
                    "[{}] {} weight={} {}",
                    vertex_label(outcome.high_vertex, len),
                    outcome.high.short_string(),
                    1.0 - outcome.weight_low,
                    tree(outcome.high_vertex)
                );
            }
            if let Some((draws, (low, high))) = split {
                println!("sampled={} low={} high={}", draws, low, high);
            }
        }
    }
    Ok(ExitCode::Clean)
}

fn run_check_tree(global: &GlobalOpts, config_path: &Path, trees: &[String]) -> CmdResult {
    let config = resolve_config(global, None)?;
    let sensors: Vec<Arc<_>> = load_sensors(config_path)?
        .into_iter()
        .map(Arc::new)
        .collect();
    let parser = PolicyParser::new(&sensors, config.inspection_overhead)
        .map_err(ff_core::engine::EngineError::from)?;
    let format = TreeFormat {
        fold: config.fold,
        ..TreeFormat::default()
    };

    let mut rows = Vec::with_capacity(trees.len());
    for text in trees {
        let policy = parser
            .parse(text)
            .map_err(ff_core::engine::EngineError::from)?;
        rows.push((policy.tree_string(format), *policy.signature()));
    }
    match global.format {
        OutputFormat::Json => {
            let items: Vec<_> = rows
                .iter()
                .map(|(tree, s)| {
                    serde_json::json!({
                        "tree": tree,
                        "cost": s.cost,
                        "cost_on_bad": s.cost_on_bad,
                        "detection": s.detection,
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "policies": items,
            }))?;
        }
        _ => {
            for (tree, s) in &rows {
                println!("{} {}", s.short_string(), tree);
            }
        }
    }
    Ok(ExitCode::Clean)
}

fn run_approximate(global: &GlobalOpts, sensor_path: &Path) -> CmdResult {
    let config = resolve_config(global, None)?;
    let sensor = read_sensor_file(sensor_path, 1)?;
    let approx = sensor.approximate(config.vs, config.eps)?;
    info!(
        stage = %Stage::Approximate,
        sensor = %sensor.name(),
        before = sensor.channel_count(),
        after = approx.channel_count(),
        "sensor approximated"
    );
    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "name": approx.name(),
            "vs": config.vs,
            "eps": config.eps,
            "channels_before": sensor.channel_count(),
            "channels_after": approx.channel_count(),
            "cost": approx.cost(),
            "points": approx.points().collect::<Vec<_>>(),
        }))?,
        _ => {
            println!(
                "# {} approximated with {} eps={}: {} -> {} channels",
                approx.name(),
                config.vs,
                config.eps,
                sensor.channel_count(),
                approx.channel_count()
            );
            print!("{}", sensor_text(&approx));
        }
    }
    Ok(ExitCode::Clean)
}

fn run_export_policy(saved_path: &Path, index: usize) -> CmdResult {
    let SavedFrontier { frontier, .. } = read_report(saved_path)?;
    let policy = frontier.policies().get(index).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "policy index {} is out of range (the frontier has {} policies)",
            index,
            frontier.len()
        ))
    })?;
    print!("{}", policy.device_description()?);
    Ok(ExitCode::Clean)
}
