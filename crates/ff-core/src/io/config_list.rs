//! Config lists: which sensor files to combine, and how many copies of each.
//!
//! ```text
//! sensorA.txt
//! 3*sensorB.txt
//! ```
//!
//! Paths are relative to the directory holding the list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use super::sensor_file::read_sensor_file;
use super::ParseError;
use crate::engine::{EngineError, Result, Sensor};
use crate::logging::events::event_names;

/// One line of a config list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEntry {
    pub path: PathBuf,
    pub copies: usize,
    /// 1-based line number in the list.
    pub line: usize,
}

fn entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+)\s*\*\s*(\S.*)$").expect("config entry pattern"))
}

/// Parses list text into entries, paths as written.
pub fn parse_config_list(text: &str, origin: &str) -> std::result::Result<Vec<SensorEntry>, ParseError> {
    let mut entries = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (copies, path) = match entry_re().captures(line) {
            Some(caps) => {
                let copies = caps[1].parse::<usize>().map_err(|_| {
                    ParseError::at_line(origin, idx + 1, &caps[1], "copy count is too large")
                })?;
                (copies, caps[2].trim().to_string())
            }
            None => (1, line.to_string()),
        };
        entries.push(SensorEntry {
            path: PathBuf::from(path),
            copies,
            line: idx + 1,
        });
    }
    Ok(entries)
}

/// Reads a config list and every sensor it names.
///
/// Two files that yield the same sensor name are rejected, since trees refer
/// to sensors by name.
pub fn load_sensors(config_path: &Path) -> Result<Vec<Sensor>> {
    let origin = config_path.display().to_string();
    let text = std::fs::read_to_string(config_path)?;
    let entries = parse_config_list(&text, &origin)?;
    let base = config_path.parent().unwrap_or_else(|| Path::new(""));

    let mut names = HashSet::new();
    let mut sensors = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = base.join(&entry.path);
        let sensor = read_sensor_file(&path, entry.copies)?;
        if !names.insert(sensor.name().to_string()) {
            return Err(EngineError::data_format(
                origin,
                Some(entry.line),
                entry.path.display().to_string(),
                format!("duplicate sensor name '{}'", sensor.name()),
            ));
        }
        debug!(
            sensor = %sensor.name(),
            copies = entry.copies,
            channels = sensor.channel_count(),
            "sensor file read"
        );
        sensors.push(sensor);
    }
    info!(
        event = event_names::SENSORS_LOADED,
        config = %origin,
        sensors = sensors.len(),
        copies = sensors.iter().map(Sensor::copies).sum::<usize>(),
        "sensors loaded"
    );
    Ok(sensors)
}
