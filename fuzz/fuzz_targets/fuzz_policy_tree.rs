//! Fuzz target for the policy tree parser.
//!
//! Trees are parsed over a fixed pair of sensors. Accepted trees must print
//! back to text that parses to the same signature.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use ff_core::engine::{Sensor, TreeFormat};
use ff_core::io::PolicyParser;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    copies: u8,
    fold: bool,
    tree: String,
}

fuzz_target!(|input: Input| {
    let copies = usize::from(input.copies % 3) + 1;
    let sensors = vec![
        Arc::new(
            Sensor::new("A", 0.05, &[(0.2, 0.6), (0.4, 0.8), (1.0, 1.0)]).expect("valid sensor"),
        ),
        Arc::new(
            Sensor::new("B", 0.01, &[(0.4, 0.6), (1.0, 1.0)])
                .expect("valid sensor")
                .with_copies(copies),
        ),
    ];
    let parser = PolicyParser::new(&sensors, 0.0).expect("distinct names");
    let Ok(policy) = parser.parse(&input.tree) else {
        return;
    };
    let format = TreeFormat {
        fold: input.fold,
        ..TreeFormat::default()
    };
    let printed = policy.tree_string(format);
    let again = parser.parse(&printed).expect("printed tree should parse");
    assert_eq!(again.signature(), policy.signature());
});
