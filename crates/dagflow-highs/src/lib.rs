//! HiGHS backend for dagflow.
//!
//! [`HighsBackend`] lowers a `dagflow_core::Model` into a HiGHS row problem,
//! applies the session's `SolverConfig` and maps the outcome back to a
//! solver-agnostic `Solution`.

pub mod ffi;
pub mod solver;
mod status;

pub use ffi::{HighsModel, HighsModelError, HighsOption, HighsStatus, ObjectiveSense, highs_version};
pub use solver::HighsBackend;
