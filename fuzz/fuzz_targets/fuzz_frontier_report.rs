//! Fuzz target for saved frontier reading.
//!
//! Reports may be hand-edited, so malformed input must come back as an
//! error, never a panic.

#![no_main]

use ff_core::engine::FrontierView;
use ff_core::io::parse_report;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(saved) = parse_report(text, "fuzz") {
        assert!(saved.frontier.validate().is_ok());
        assert!(saved.summaries <= saved.frontier.len());
    }
});
