//! Core math modules.

pub mod geometry;
pub mod stable;
