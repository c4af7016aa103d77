//! Frontier engine: sensors, policies, frontiers, fusion and the subset DP.

pub mod budget;
pub mod builder;
pub mod context;
pub mod error;
pub mod frontier;
pub mod fusion;
pub mod policy;
pub mod progress;
pub mod selection;
pub mod sensor;
pub mod signature;
pub mod subset;

pub use budget::{budget_for_detection_rate, detection_rate_for_budget, BudgetOutcome, MixChoice};
pub use builder::{
    build_frontier, build_frontiers_multi_pi, AnnotatedFrontier, BuildOutcome, FrontierBuilder,
};
pub use context::FrontierContext;
pub use error::{EngineError, Result};
pub use frontier::{CompactFrontier, Frontier, FrontierRepr, FrontierView};
pub use fusion::{fuse, fuse_multi_pi, single_sensor_frontier};
pub use policy::{Policy, PolicyNode, Terminal, TreeFormat, TREE_NOT_STORED};
pub use progress::{Flow, FnProgress, JsonlProgress, NoProgress, ProgressEvent, ProgressSink};
pub use selection::{
    approximate_eb1, approximate_vm1, approximate_vm2, combine, select_necessary,
};
pub use sensor::Sensor;
pub use signature::PolicySignature;
pub use subset::{SensorSet, SubsetIndexer};
