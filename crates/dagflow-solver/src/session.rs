//! One model, one backend, one solve attempt.

use std::time::Instant;

use dagflow_core::{
    Bounds, ConstraintExpr, ConstraintId, LinearExpr, Model, ModelError, Objective, Sense,
    Solution, SolverError, SolverStatus, VarKind, Variable, VariableId,
};
use tracing::{debug, warn};

use crate::{Backend, SolverConfig};

/// Builds a MILP and solves it once with a fixed configuration.
///
/// The session owns its model exclusively. Solving again re-solves the same
/// model; callers that need a different model start a new session.
pub struct SolverSession {
    model: Model,
    config: SolverConfig,
    backend: Box<dyn Backend>,
    solution: Option<Solution>,
}

impl SolverSession {
    pub fn new(config: SolverConfig, backend: Box<dyn Backend>) -> Self {
        debug!(
            component = "session",
            operation = "init",
            status = "success",
            backend = backend.name(),
            threads = config.threads(),
            time_limit = config.time_limit(),
            "Created solver session"
        );
        Self {
            model: Model::new(),
            config,
            backend,
            solution: None,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Read-only view of the model built so far.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Add a decision variable with the given domain and bounds.
    pub fn create_variable(
        &mut self,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> Result<VariableId, ModelError> {
        let variable = match kind {
            VarKind::Binary => Variable {
                bounds: Bounds::new(lower.max(0.0), upper.min(1.0)),
                kind,
            },
            VarKind::Integer => Variable::integer(Bounds::new(lower, upper)),
            VarKind::Continuous => Variable::continuous(Bounds::new(lower, upper)),
        };
        self.model.add_variable(variable)
    }

    /// Add `expr (<=|>=|==) rhs`.
    pub fn add_linear_constraint(
        &mut self,
        constraint: ConstraintExpr,
    ) -> Result<ConstraintId, ModelError> {
        self.model.add_constraint_expr(constraint)
    }

    /// Constrain `product == binary * continuous`, with `continuous` in `[0, upper]`.
    pub fn add_binary_continuous_product_constraint(
        &mut self,
        binary: VariableId,
        continuous: VariableId,
        product: VariableId,
        upper: f64,
    ) -> Result<(), ModelError> {
        self.model
            .add_binary_product(binary, continuous, product, upper)
            .map(|_| ())
    }

    /// Set or replace the objective.
    pub fn set_objective(&mut self, expr: LinearExpr, sense: Sense) -> Result<(), ModelError> {
        self.model.set_objective(Objective {
            sense: Some(sense),
            terms: expr.into_parts().0,
        })
    }

    /// Solve with the session's time limit and thread count.
    pub fn solve(&mut self) -> Result<SolverStatus, SolverError> {
        let started = Instant::now();
        let solution = self.backend.solve(&self.model, &self.config)?;
        let status = solution.status;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        if status.is_optimal() {
            debug!(
                component = "session",
                operation = "solve",
                status = "success",
                backend = self.backend.name(),
                solver_status = status.as_str(),
                variables = self.model.num_variables(),
                constraints = self.model.num_constraints(),
                duration_ms,
                "Solve finished"
            );
        } else {
            warn!(
                component = "session",
                operation = "solve",
                status = "warn",
                backend = self.backend.name(),
                solver_status = status.as_str(),
                variables = self.model.num_variables(),
                constraints = self.model.num_constraints(),
                duration_ms,
                "Solve finished without an optimal solution"
            );
        }

        self.solution = Some(solution);
        Ok(status)
    }

    /// Status of the last solve, `None` before [`solve`](Self::solve).
    pub fn get_status(&self) -> Option<SolverStatus> {
        self.solution.as_ref().map(|s| s.status)
    }

    /// Value of a variable in the last solution.
    pub fn get_value(&self, var: VariableId) -> Option<f64> {
        self.solution.as_ref().and_then(|s| s.value(var))
    }

    /// Objective value of the last solution.
    pub fn objective_value(&self) -> Option<f64> {
        self.solution.as_ref().and_then(|s| s.objective_value)
    }

    /// Full solution of the last solve.
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }
}

impl std::fmt::Debug for SolverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverSession")
            .field("backend", &self.backend.name())
            .field("num_variables", &self.model.num_variables())
            .field("num_constraints", &self.model.num_constraints())
            .field("status", &self.get_status())
            .finish_non_exhaustive()
    }
}
