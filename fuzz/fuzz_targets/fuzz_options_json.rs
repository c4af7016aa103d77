//! Fuzz target for options.json parsing.
//!
//! Deserialization must never panic, and whatever it accepts must have a
//! well-formed pi list.

#![no_main]

use ff_config::EngineConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<EngineConfig>(data) {
        assert!(ff_config::validate::validate_pi_list(config.pi.values()).is_ok());
    }
});
