//! Frontier Finder core library.
//!
//! Computes cost / detection-rate efficient frontiers of sensor inspection
//! policies:
//! - `engine`: sensors, policies, frontiers, fusion and the subset DP
//! - `io`: sensor files, config lists, policy trees and saved frontiers
//! - `logging`: tracing setup and event names
//! - `exit_codes`: CLI exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
