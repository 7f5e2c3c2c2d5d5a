//! Backend trait for abstraction over MILP solvers.

use dagflow_core::{Model, Solution, SolverError};

use crate::SolverConfig;

/// A MILP solver integration.
///
/// Implementations must report every terminal outcome (optimal, infeasible,
/// time limit, other) as `Ok` with the matching status; `Err` is for models
/// the backend could not accept.
pub trait Backend {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Solve the model under the given configuration.
    fn solve(&mut self, model: &Model, config: &SolverConfig) -> Result<Solution, SolverError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&mut self, model: &Model, config: &SolverConfig) -> Result<Solution, SolverError> {
        (**self).solve(model, config)
    }
}
