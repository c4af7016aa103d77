//! Saved frontiers.
//!
//! The text report has four sections (INPUTS, OPTIONS, RUNTIME, OUTPUT) and
//! an optional OTHERS section. Written with an unrestricted line length it
//! reads back into the same policies, bit for bit: sensors are printed at
//! full precision and every tree is re-evaluated on them.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local};
use ff_config::{EngineConfig, VertexSkip};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::sensor_file::parse_sensor_display;
use super::tree_parser::PolicyParser;
use super::ParseError;
use crate::engine::{
    AnnotatedFrontier, Frontier, FrontierContext, FrontierView, Policy, PolicySignature, Result,
    Sensor, TreeFormat, TREE_NOT_STORED,
};
use crate::logging::events::event_names;

const INPUTS_HEADER: &str = "----------- INPUTS: ----------------------";
const OPTIONS_HEADER: &str = "------------ OPTIONS: ---------------------";
const RUNTIME_HEADER: &str = "------------ RUNTIME: ---------------------";
const OUTPUT_HEADER: &str = "-------------- OUTPUT: ---------------------";
const OTHERS_HEADER: &str = "-------------- OTHERS: ---------------------";
const RULE: &str = "-------------------------";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const TRUNCATED: &str = ".....";

/// Sensors as they appear in trees: the approximated ones, or the
/// originals when trees are printed in original channels.
fn reported_sensors(af: &AnnotatedFrontier) -> Vec<&Sensor> {
    af.sensors
        .iter()
        .map(|s| {
            if af.config.original_sensors_in_trees {
                s.original()
            } else {
                s.as_ref()
            }
        })
        .collect()
}

fn tree_format(config: &EngineConfig) -> TreeFormat {
    TreeFormat {
        fold: config.fold,
        line_length: config.line_length,
        original_sensors: config.original_sensors_in_trees,
    }
}

/// `(c d)`, or `(c d e)` for multi-pi frontiers; rounded when lines are capped.
fn coordinates(s: &PolicySignature, exact: bool, with_e: bool) -> String {
    let fmt = |x: f64| {
        if exact {
            x.to_string()
        } else {
            crate::engine::signature::format_short(x)
        }
    };
    match (with_e, s.cost_on_bad) {
        (true, Some(e)) => format!("({} {} {})", fmt(s.cost), fmt(s.detection), fmt(e)),
        _ => format!("({} {})", fmt(s.cost), fmt(s.detection)),
    }
}

fn runtime_text(ms: u64) -> String {
    if ms < 1000 {
        format!("{} msec", ms)
    } else {
        format!("{} sec", ms as f64 * 0.001)
    }
}

/// Writes the text report for `af`.
pub fn write_report<W: Write>(out: &mut W, af: &AnnotatedFrontier) -> std::io::Result<()> {
    let config = &af.config;
    let ctx = af.frontier.context();

    writeln!(out, "{}", INPUTS_HEADER)?;
    let sensors = reported_sensors(af);
    writeln!(out, "A set of {} sensors.", sensors.len())?;
    for (i, s) in sensors.iter().enumerate() {
        writeln!(
            out,
            "Sensor[{}], name={}, multiplicity={}:",
            i + 1,
            s.name(),
            s.copies()
        )?;
        writeln!(out, "{}", s)?;
    }

    writeln!(out, "{}", OPTIONS_HEADER)?;
    writeln!(out, "eps={}", ctx.eps)?;
    writeln!(out, "vs={}", ctx.vs)?;
    writeln!(
        out,
        "maxDepth={}",
        af.max_depth.map_or(-1, |d| i64::try_from(d).unwrap_or(i64::MAX))
    )?;
    writeln!(out, "E={}", config.inspection_overhead)?;
    writeln!(out, "pi={}", ctx.pi)?;

    writeln!(out, "{}", RUNTIME_HEADER)?;
    writeln!(
        out,
        "Frontier computation started at  {}",
        af.started_at.format(TIME_FORMAT)
    )?;
    writeln!(
        out,
        "Frontier computation finished at {}",
        af.finished_at.format(TIME_FORMAT)
    )?;
    writeln!(out, "Wall-clock runtime = {}", runtime_text(af.runtime_ms))?;

    writeln!(out, "{}", OUTPUT_HEADER)?;
    let exact = config.line_length == 0;
    let format = tree_format(config);
    let with_e = ctx.multi_pi;
    writeln!(out, "Fold={}", format.fold || format.original_sensors)?;
    writeln!(
        out,
        "Frontier contains {} non-trivial policies",
        af.frontier.len()
    )?;
    writeln!(out, "[POLICY ] (policyCost, detectionRate) policy_tree")?;
    writeln!(out, "{}", RULE)?;
    writeln!(
        out,
        "[RELEASE] {} R",
        coordinates(&PolicySignature::RELEASE, exact, false)
    )?;
    for (i, p) in af.frontier.policies().iter().enumerate() {
        writeln!(
            out,
            "[POLICY {}] {} {}",
            i,
            coordinates(p.signature(), exact, with_e),
            p.tree_string(format)
        )?;
    }
    writeln!(out, "[INSPECT] {} I", coordinates(&ctx.inspect, exact, false))?;
    writeln!(out, "{}", RULE)?;

    if !af.others.is_empty() {
        writeln!(out, "{}", OTHERS_HEADER)?;
        writeln!(
            out,
            "Frontiers of the {} largest proper subsets:",
            af.others.len()
        )?;
        for (i, f) in af.others.iter().enumerate() {
            writeln!(out, "Subset frontier {}: {}", i + 1, f)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

/// The text report as a string.
pub fn report_string(af: &AnnotatedFrontier) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_report(&mut buf, af);
    String::from_utf8_lossy(&buf).into_owned()
}

/// One sensor in the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReport {
    pub name: String,
    pub copies: usize,
    pub cost: f64,
    pub channels: usize,
    pub points: Vec<(f64, f64)>,
    pub approximated: bool,
}

/// One frontier vertex in the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexReport {
    pub index: usize,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_on_bad: Option<f64>,
    pub detection: f64,
    pub tree: String,
}

/// The JSON form of a built frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierReport {
    pub schema_version: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub runtime_ms: u64,
    pub options: EngineConfig,
    pub context: FrontierContext,
    pub sensors: Vec<SensorReport>,
    pub vertices: Vec<VertexReport>,
    pub area_under_curve: f64,
    pub other_frontiers: usize,
}

/// Builds the JSON form of `af`.
pub fn report_json(af: &AnnotatedFrontier) -> FrontierReport {
    let format = tree_format(&af.config);
    FrontierReport {
        schema_version: ff_common::SCHEMA_VERSION.to_string(),
        run_id: af.run_id,
        started_at: af.started_at,
        finished_at: af.finished_at,
        runtime_ms: af.runtime_ms,
        options: af.config.clone(),
        context: *af.frontier.context(),
        sensors: af
            .sensors
            .iter()
            .map(|s| SensorReport {
                name: s.name().to_string(),
                copies: s.copies(),
                cost: s.cost(),
                channels: s.channel_count(),
                points: s.points().collect(),
                approximated: s.is_approximated(),
            })
            .collect(),
        vertices: af
            .frontier
            .policies()
            .iter()
            .enumerate()
            .map(|(index, p)| VertexReport {
                index,
                cost: p.signature().cost,
                cost_on_bad: p.signature().cost_on_bad,
                detection: p.signature().detection,
                tree: p.tree_string(format),
            })
            .collect(),
        area_under_curve: af.frontier.area_under_curve(),
        other_frontiers: af.others.len(),
    }
}

/// A frontier read back from a text report.
#[derive(Debug, Clone)]
pub struct SavedFrontier {
    pub sensors: Vec<Arc<Sensor>>,
    pub frontier: Frontier,
    pub max_depth: Option<usize>,
    /// Policies whose tree could not be re-evaluated (not stored or cut
    /// short) and were taken at their printed values.
    pub summaries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Inputs,
    Options,
    Runtime,
    Output,
    Others,
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^-+\s*(INPUTS|OPTIONS|RUNTIME|OUTPUT|OTHERS):.*$").expect("header pattern")
    })
}

fn sensor_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Sensor\[([0-9]+)\],\s*name=([A-Za-z][A-Za-z0-9_]*),\s*multiplicity=([0-9]+):\s*$")
            .expect("sensor header pattern")
    })
}

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z]+)\s*=\s*(\S+)\s*$").expect("option pattern"))
}

fn policy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\[POLICY\s+([0-9]+)\]\s*\(\s*([^\s()]+)\s+([^\s()]+)(?:\s+([^\s()]+))?\s*\)\s*(.*)$",
        )
        .expect("policy line pattern")
    })
}

struct ReportOptions {
    eps: f64,
    vs: VertexSkip,
    max_depth: Option<usize>,
    overhead: f64,
    pi: f64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            eps: config.eps,
            vs: config.vs,
            max_depth: None,
            overhead: config.inspection_overhead,
            pi: 0.0,
        }
    }
}

struct PolicyLine {
    line: usize,
    signature: PolicySignature,
    tree: String,
}

fn parse_number(origin: &str, line: usize, token: &str) -> std::result::Result<f64, ParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::at_line(origin, line, token, "not a number"))
}

fn apply_option(
    opts: &mut ReportOptions,
    key: &str,
    value: &str,
    origin: &str,
    line: usize,
) -> std::result::Result<(), ParseError> {
    match key {
        "eps" => opts.eps = parse_number(origin, line, value)?,
        "vs" => {
            opts.vs = value
                .parse()
                .map_err(|e: ff_config::ValidationError| ParseError::at_line(origin, line, value, e.to_string()))?
        }
        "maxDepth" => {
            let depth: i64 = value
                .parse()
                .map_err(|_| ParseError::at_line(origin, line, value, "maxDepth is not an integer"))?;
            opts.max_depth = usize::try_from(depth).ok();
        }
        "E" => opts.overhead = parse_number(origin, line, value)?,
        "pi" => opts.pi = parse_number(origin, line, value)?,
        _ => {}
    }
    Ok(())
}

/// Parses a text report. `origin` labels error messages.
pub fn parse_report(text: &str, origin: &str) -> std::result::Result<SavedFrontier, ParseError> {
    let mut section = Section::Preamble;
    let mut sensors: Vec<Arc<Sensor>> = Vec::new();
    let mut pending: Option<(usize, String, usize)> = None;
    let mut opts = ReportOptions::default();
    let mut lines: Vec<PolicyLine> = Vec::new();
    let mut multi_pi = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if let Some(caps) = header_re().captures(line) {
            section = match &caps[1] {
                "INPUTS" => Section::Inputs,
                "OPTIONS" => Section::Options,
                "RUNTIME" => Section::Runtime,
                "OUTPUT" => Section::Output,
                _ => Section::Others,
            };
            continue;
        }
        match section {
            Section::Inputs => {
                if let Some((number, name, copies)) = pending.take() {
                    let sensor = parse_sensor_display(line, copies, origin, line_no)?;
                    if sensor.name() != name {
                        return Err(ParseError::at_line(
                            origin,
                            line_no,
                            line,
                            format!("Sensor[{}] is named '{}' but described as '{}'", number, name, sensor.name()),
                        ));
                    }
                    sensors.push(Arc::new(sensor));
                } else if let Some(caps) = sensor_header_re().captures(line) {
                    let number: usize = caps[1].parse().unwrap_or(0);
                    if number != sensors.len() + 1 {
                        return Err(ParseError::at_line(
                            origin,
                            line_no,
                            line,
                            format!("expected Sensor[{}]", sensors.len() + 1),
                        ));
                    }
                    let copies = caps[3].parse().map_err(|_| {
                        ParseError::at_line(origin, line_no, &caps[3], "multiplicity is too large")
                    })?;
                    pending = Some((number, caps[2].to_string(), copies));
                }
            }
            Section::Options => {
                if let Some(caps) = option_re().captures(line) {
                    apply_option(&mut opts, &caps[1], &caps[2], origin, line_no)?;
                }
            }
            Section::Output => {
                let Some(caps) = policy_re().captures(line) else {
                    continue;
                };
                let index: usize = caps[1].parse().unwrap_or(usize::MAX);
                if index != lines.len() {
                    return Err(ParseError::at_line(
                        origin,
                        line_no,
                        &caps[1],
                        format!("expected POLICY {}", lines.len()),
                    ));
                }
                let cost = parse_number(origin, line_no, &caps[2])?;
                let detection = parse_number(origin, line_no, &caps[3])?;
                let cost_on_bad = caps
                    .get(4)
                    .map(|m| parse_number(origin, line_no, m.as_str()))
                    .transpose()?;
                multi_pi |= cost_on_bad.is_some();
                lines.push(PolicyLine {
                    line: line_no,
                    signature: PolicySignature {
                        cost,
                        cost_on_bad,
                        detection,
                    },
                    tree: caps[5].trim().to_string(),
                });
            }
            Section::Preamble | Section::Runtime | Section::Others => {}
        }
    }
    if pending.is_some() {
        return Err(ParseError::new(origin, None, "", "sensor description missing at end of INPUTS"));
    }
    if section == Section::Preamble {
        return Err(ParseError::new(origin, None, "", "not a saved frontier: no section headers"));
    }

    let parser = PolicyParser::new(&sensors, opts.overhead)
        .map_err(|e| ParseError::new(origin, e.position, e.text, e.message))?;
    let mut summaries = 0;
    let mut policies = Vec::with_capacity(lines.len());
    for pl in lines {
        if pl.tree == TREE_NOT_STORED || pl.tree.ends_with(TRUNCATED) || pl.tree.is_empty() {
            summaries += 1;
            policies.push(Policy::summary(pl.signature));
            continue;
        }
        let policy = parser.parse(&pl.tree).map_err(|e| {
            ParseError::at_line(
                origin,
                pl.line,
                e.text,
                format!("{} (at offset {})", e.message, e.position.unwrap_or(0)),
            )
        })?;
        policies.push(policy);
    }

    let context = FrontierContext::new(opts.pi, opts.vs, opts.eps, multi_pi, opts.overhead);
    let frontier = Frontier::from_policies(context, policies);
    frontier
        .validate()
        .map_err(|e| ParseError::new(origin, None, "", format!("policies do not form a frontier: {}", e)))?;
    Ok(SavedFrontier {
        sensors,
        frontier,
        max_depth: opts.max_depth,
        summaries,
    })
}

/// Reads a text report from disk.
pub fn read_report(path: &Path) -> Result<SavedFrontier> {
    let text = std::fs::read_to_string(path)?;
    let origin = path.display().to_string();
    let saved = parse_report(&text, &origin)?;
    info!(
        event = event_names::REPORT_READ,
        path = %origin,
        sensors = saved.sensors.len(),
        vertices = saved.frontier.len(),
        summaries = saved.summaries,
        "saved frontier read"
    );
    Ok(saved)
}
