//! Sensor description files.
//!
//! ```text
//! # sensorA.txt
//! cost 0.05
//! 0 0
//! 0.2 0.6
//! 0.4 0.8
//! 1 1
//! ```
//!
//! The first content line gives the cost (`cost X` or `cost: X`), followed by
//! cumulative `good bad` points starting at `0 0` and ending at `1 1`. `#`
//! starts a comment.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{is_sensor_name, ParseError};
use crate::engine::{EngineError, Result, Sensor};

fn cost_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^cost\s*:?\s*(\S+)$").expect("cost pattern"))
}

fn display_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\{\s*([A-Za-z][A-Za-z0-9_]*)\s*:\s*c=(\S+)\s*\((.*)\)\s*\}$")
            .expect("sensor display pattern")
    })
}

fn point_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\s*(\S+)\s+(\S+)\s*\)").expect("point pattern"))
}

fn number(origin: &str, line: usize, token: &str, what: &str) -> std::result::Result<f64, ParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::at_line(origin, line, token, format!("{} is not a number", what)))
}

/// Sensor name for a file: the stem without a leading `sensor`.
///
/// `sensorA.txt` is `A`; `sensor_noise.dat` is `noise`.
pub fn sensor_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = stem
        .strip_prefix("sensor")
        .unwrap_or(&stem)
        .trim_start_matches(['_', '-', '.']);
    if stripped.is_empty() {
        stem
    } else {
        stripped.to_string()
    }
}

/// Parses a sensor description. `origin` labels error messages.
pub fn parse_sensor_text(
    name: &str,
    text: &str,
    origin: &str,
) -> std::result::Result<Sensor, ParseError> {
    let mut cost = None;
    let mut points = Vec::new();
    let mut point_lines = Vec::new();
    let mut last_line = 0;
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        last_line = line_no;
        if cost.is_none() {
            let caps = cost_re().captures(line).ok_or_else(|| {
                ParseError::at_line(origin, line_no, line, "expected 'cost <number>'")
            })?;
            cost = Some(number(origin, line_no, &caps[1], "cost")?);
            continue;
        }
        let mut fields = line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty());
        let (g, b) = match (fields.next(), fields.next(), fields.next()) {
            (Some(g), Some(b), None) => (
                number(origin, line_no, g, "good fraction")?,
                number(origin, line_no, b, "bad fraction")?,
            ),
            _ => {
                return Err(ParseError::at_line(
                    origin,
                    line_no,
                    line,
                    "expected two numbers: cumulative good and bad fractions",
                ))
            }
        };
        if points.is_empty() && (g, b) != (0.0, 0.0) {
            return Err(ParseError::at_line(origin, line_no, line, "the first point must be '0 0'"));
        }
        points.push((g, b));
        point_lines.push(line_no);
    }
    let cost = cost.ok_or_else(|| ParseError::new(origin, None, "", "missing 'cost' line"))?;
    if points.len() < 2 {
        return Err(ParseError::new(
            origin,
            Some(last_line),
            "",
            "a sensor needs '0 0' and at least one more point",
        ));
    }
    // Engine positions index the points after `0 0`.
    Sensor::new(name, cost, &points[1..]).map_err(|e| match e {
        EngineError::DataFormat {
            position,
            text,
            message,
            ..
        } => {
            let line = position.and_then(|i| point_lines.get(i + 1).copied());
            ParseError::new(origin, line.or(Some(last_line)), text, message)
        }
        other => ParseError::new(origin, Some(last_line), "", other.to_string()),
    })
}

/// Parses the one-line display form `{A: c=0.05 ((0.2 0.6) (1 1) )}`.
pub fn parse_sensor_display(
    line: &str,
    copies: usize,
    origin: &str,
    line_no: usize,
) -> std::result::Result<Sensor, ParseError> {
    let line = line.trim();
    let caps = display_re().captures(line).ok_or_else(|| {
        ParseError::at_line(origin, line_no, line, "expected '{name: c=<cost> ((g b) ...)}'")
    })?;
    let cost = number(origin, line_no, &caps[2], "cost")?;
    let points = point_re()
        .captures_iter(&caps[3])
        .map(|p| {
            Ok((
                number(origin, line_no, &p[1], "good fraction")?,
                number(origin, line_no, &p[2], "bad fraction")?,
            ))
        })
        .collect::<std::result::Result<Vec<_>, ParseError>>()?;
    Sensor::new(&caps[1], cost, &points)
        .map(|s| s.with_copies(copies))
        .map_err(|e| ParseError::at_line(origin, line_no, line, e.to_string()))
}

/// Reads a sensor file, naming the sensor after the file.
pub fn read_sensor_file(path: &Path, copies: usize) -> Result<Sensor> {
    let text = std::fs::read_to_string(path)?;
    let name = sensor_name_from_path(path);
    let origin = path.display().to_string();
    if !is_sensor_name(&name) {
        return Err(EngineError::data_format(
            origin,
            None,
            name,
            "sensor name must start with a letter and contain only letters, digits and '_'",
        ));
    }
    Ok(parse_sensor_text(&name, &text, &origin)?.with_copies(copies))
}

/// The file form of `sensor`, at full precision.
pub fn sensor_text(sensor: &Sensor) -> String {
    let mut out = format!("cost {}\n0 0\n", sensor.cost());
    for (g, b) in sensor.points() {
        out.push_str(&format!("{}\t{}\n", g, b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENSOR_A: &str = "# test sensor\ncost 0.05\n0 0\n0.2 0.6\n0.4 0.8\n1 1\n";

    #[test]
    fn parses_cost_and_points() {
        let s = parse_sensor_text("A", SENSOR_A, "a.txt").unwrap();
        assert_eq!(s.cost(), 0.05);
        assert_eq!(s.channel_count(), 3);
        assert_eq!(s.cum_bad(1), 0.6);
    }

    #[test]
    fn cost_colon_and_comments_are_accepted() {
        let text = "cost: 0.01   # cheap\n\n0 0\n0.4 0.6 # one channel\n1 1\n";
        let s = parse_sensor_text("B", text, "b.txt").unwrap();
        assert_eq!(s.cost(), 0.01);
        assert_eq!(s.channel_count(), 2);
    }

    #[test]
    fn first_point_must_be_origin() {
        let err = parse_sensor_text("A", "cost 1\n0.1 0.2\n1 1\n", "a.txt").unwrap_err();
        assert_eq!(err.position, Some(2));
        assert!(err.message.contains("0 0"));
    }

    #[test]
    fn malformed_point_reports_line() {
        let err = parse_sensor_text("A", "cost 1\n0 0\n0.5 x\n1 1\n", "a.txt").unwrap_err();
        assert_eq!(err.position, Some(3));
        assert_eq!(err.text, "x");
    }

    #[test]
    fn missing_cost_is_an_error() {
        let err = parse_sensor_text("A", "0 0\n1 1\n", "a.txt").unwrap_err();
        assert!(err.message.contains("cost"));
    }

    #[test]
    fn non_convex_curve_reports_the_offending_line() {
        let err =
            parse_sensor_text("A", "cost 1\n0 0\n0.5 0.5\n# rises\n0.6 0.9\n1 1\n", "a.txt")
                .unwrap_err();
        assert_eq!(err.position, Some(5));
        assert_eq!(err.text, "(0.6 0.9)");
    }

    #[test]
    fn curve_without_end_point_is_rejected() {
        let err = parse_sensor_text("X", "cost 0.1\n0 0\n0.4 0.6\n0.8 0.9\n", "x.txt").unwrap_err();
        assert_eq!(err.position, Some(4));
        assert!(err.message.contains("end point is not (1 1)"));
        match EngineError::from(err) {
            EngineError::DataFormat { origin, .. } => assert_eq!(origin, "x.txt"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn name_strips_sensor_prefix() {
        assert_eq!(sensor_name_from_path(Path::new("dir/sensorA.txt")), "A");
        assert_eq!(sensor_name_from_path(Path::new("sensor_noise.dat")), "noise");
        assert_eq!(sensor_name_from_path(Path::new("gamma.txt")), "gamma");
        assert_eq!(sensor_name_from_path(Path::new("sensor.txt")), "sensor");
    }

    #[test]
    fn text_form_reparses_identically() {
        let s = parse_sensor_text("A", SENSOR_A, "a.txt").unwrap();
        let again = parse_sensor_text("A", &sensor_text(&s), "again").unwrap();
        assert_eq!(s, again);
    }

    #[test]
    fn display_form_reparses_identically() {
        let s = parse_sensor_text("A", SENSOR_A, "a.txt").unwrap().with_copies(2);
        let again = parse_sensor_display(&s.to_string(), 2, "report", 4).unwrap();
        assert_eq!(s, again);
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensorA.txt");
        std::fs::write(&path, SENSOR_A).unwrap();
        let s = read_sensor_file(&path, 3).unwrap();
        assert_eq!(s.name(), "A");
        assert_eq!(s.copies(), 3);
    }
}
