//! Frontier Finder math utilities.

pub mod math;

pub use math::geometry::*;
pub use math::stable::*;
