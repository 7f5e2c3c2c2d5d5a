//! Solver abstraction for dagflow models.
//!
//! - [`SolverConfig`]: immutable, validated solve parameters
//! - [`Backend`]: trait implemented by MILP solver integrations
//! - [`SolverSession`]: one model plus one backend for a single solve attempt

mod config;
mod error;
mod session;
mod traits;

pub use config::{ExternalSolver, Presolve, SolverConfig, SolverConfigBuilder};
pub use error::SolverConfigError;
pub use session::SolverSession;
pub use traits::Backend;
