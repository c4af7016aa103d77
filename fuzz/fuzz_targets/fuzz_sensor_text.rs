//! Fuzz target for sensor file parsing.
//!
//! Any accepted sensor must print and re-parse to the same curve.

#![no_main]

use ff_core::io::{parse_sensor_text, sensor_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(sensor) = parse_sensor_text("S", text, "fuzz") else {
        return;
    };
    let again = parse_sensor_text("S", &sensor_text(&sensor), "fuzz")
        .expect("printed sensor should parse");
    assert_eq!(again.channel_count(), sensor.channel_count());
    assert!(again.points().eq(sensor.points()));
});
