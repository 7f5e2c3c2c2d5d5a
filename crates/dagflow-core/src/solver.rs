//! Solver-agnostic solve results and errors.
//!
//! Backends translate their native outcome into a [`Solution`] carrying one of
//! four [`SolverStatus`] values. Infeasibility and time limits are statuses,
//! not errors; [`SolverError`] is reserved for models that could not be
//! handed to the solver at all.

use crate::ids::VariableId;
use std::collections::BTreeMap;

/// Terminal status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Solver stopped at the configured time limit.
    TimeLimitReached,
    /// Any other outcome (unbounded, iteration limit, interrupted, ...).
    Other,
}

impl SolverStatus {
    /// Check if the status indicates an optimal solution.
    pub fn is_optimal(self) -> bool {
        matches!(self, SolverStatus::Optimal)
    }

    /// Check if the status indicates infeasibility.
    pub fn is_infeasible(self) -> bool {
        matches!(self, SolverStatus::Infeasible)
    }

    /// Get a human-readable string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::TimeLimitReached => "time_limit",
            SolverStatus::Other => "other",
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for solver operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Model has no variables.
    EmptyModel,
    /// No objective function set.
    NoObjective,
    /// Invalid variable ID.
    InvalidVariableId(u32),
    /// Solver is not available (e.g., library not installed).
    SolverNotAvailable(String),
    /// Solver-specific error not covered by other variants.
    SolverSpecific(String),
}

impl SolverError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            SolverError::EmptyModel => "SOLVER_EMPTY_MODEL",
            SolverError::NoObjective => "SOLVER_NO_OBJECTIVE",
            SolverError::InvalidVariableId(_) => "SOLVER_INVALID_VARIABLE_ID",
            SolverError::SolverNotAvailable(_) => "SOLVER_NOT_AVAILABLE",
            SolverError::SolverSpecific(_) => "SOLVER_SPECIFIC",
        }
    }
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::EmptyModel => write!(f, "[{}] Model has no variables", self.code()),
            SolverError::NoObjective => write!(f, "[{}] Model has no objective", self.code()),
            SolverError::InvalidVariableId(id) => {
                write!(f, "[{}] Variable ID {} does not exist", self.code(), id)
            }
            SolverError::SolverNotAvailable(msg) => {
                write!(f, "[{}] Solver not available: {}", self.code(), msg)
            }
            SolverError::SolverSpecific(msg) => {
                write!(f, "[{}] Solver error: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for SolverError {}

/// Solver-agnostic solution from an optimization solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Status of the solve.
    pub status: SolverStatus,
    /// Primal values indexed by variable position. Empty when no solution exists.
    pub primal_values: Vec<f64>,
    /// Objective value, present when primal values are.
    pub objective_value: Option<f64>,
    /// Wall-clock solve time in seconds.
    pub solve_time_seconds: f64,
    /// Backend-specific metrics (iteration counts, gaps).
    pub metadata: BTreeMap<String, f64>,
}

impl Solution {
    /// A solution carrying only a status, with no values.
    pub fn status_only(status: SolverStatus, solve_time_seconds: f64) -> Self {
        Self {
            status,
            primal_values: Vec::new(),
            objective_value: None,
            solve_time_seconds,
            metadata: BTreeMap::new(),
        }
    }

    /// Value of a variable, if the solve produced values.
    pub fn value(&self, id: VariableId) -> Option<f64> {
        self.primal_values.get(id.index()).copied()
    }

    /// Whether primal values are available.
    pub fn has_values(&self) -> bool {
        !self.primal_values.is_empty()
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}
