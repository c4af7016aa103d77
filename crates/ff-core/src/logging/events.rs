//! Structured event names and pipeline stages.
//!
//! Every `tracing` call in the crate sets an `event` field from
//! [`event_names`] so JSONL consumers can filter on stable keys.

use serde::{Deserialize, Serialize};

/// Phases of a frontier-finder invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Option resolution and logging setup.
    Init,
    /// Reading config lists, sensor files and saved frontiers.
    Load,
    /// Sensor approximation.
    Approximate,
    /// The subset DP.
    Build,
    /// Budget and detection-rate queries.
    Query,
    /// Writing reports.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Approximate => "approximate",
            Stage::Build => "build",
            Stage::Query => "query",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Build lifecycle
    pub const BUILD_STARTED: &str = "build.started";
    pub const BUILD_LEVEL_DONE: &str = "build.level_done";
    pub const BUILD_FINISHED: &str = "build.finished";
    pub const BUILD_CANCELLED: &str = "build.cancelled";

    // Engine detail
    pub const SENSOR_APPROXIMATED: &str = "sensor.approximated";
    pub const FRONTIER_VM2_AREA: &str = "frontier.vm2_area";

    // Inputs and outputs
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const SENSORS_LOADED: &str = "sensors.loaded";
    pub const REPORT_READ: &str = "report.read";
    pub const QUERY_ANSWERED: &str = "query.answered";

    pub const COMMAND_FAILED: &str = "command.failed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [Stage::Init, Stage::Load, Stage::Build, Stage::Report] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(event_names::BUILD_LEVEL_DONE, "build.level_done");
        assert_eq!(event_names::FRONTIER_VM2_AREA, "frontier.vm2_area");
    }
}
