//! Path decompositions of flows on directed acyclic graphs.
//!
//! - [`MinFlowDecomp`]: fewest weighted paths reproducing a flow exactly
//! - [`KFlowDecomp`]: exactly `k` weighted paths reproducing a flow
//! - [`KLeastAbsErrors`]: `k` paths minimizing absolute edge errors
//! - [`KMinPathError`]: `k` paths with per-path slack, minimizing total slack
//!
//! Every problem is a MILP over the [`PathModel`] encoding. Safety analysis
//! pins edges that every solution must route through one path before the
//! solver runs.

pub mod backend;
mod driver;
mod error;
mod greedy;
mod instance;
pub mod model;
mod objectives;
mod options;
pub mod safety;
mod solution;
mod stats;
mod verify;

pub use backend::{BackendFactory, backend_for};
pub use driver::MinFlowDecomp;
pub use error::DecompError;
pub use instance::Instance;
pub use model::{PathModel, PathModelOptions};
pub use objectives::{
    KFlowDecomp, KLeastAbsErrors, KMinPathError, Outcome, PathObjective, analyze_safety,
    solve_with_paths,
};
pub use options::{
    Coverage, DecompositionConfig, FlowOrigin, OptimizationOptions, SafetyMode, Subpath,
    WeightType,
};
pub use safety::{SafeList, SafetyAnalysis};
pub use solution::{
    Decomposition, EdgeError, EdgeErrorDecomposition, SlackDecomposition,
};
pub use stats::{Attempt, SolveStatistics};
