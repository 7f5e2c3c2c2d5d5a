//! Decomposition objectives built on [`PathModel`].
//!
//! Each objective adds its weight variables, error terms and objective to a
//! shared path encoding, then reads its result type back from the solved
//! model. [`solve_with_paths`] runs one build-and-solve attempt and records
//! it in the caller's statistics. An objective defined outside this crate
//! runs through the same two calls: [`analyze_safety`] once, then
//! [`solve_with_paths`] per attempt.

mod flow;
mod least_abs;
mod min_path_error;

pub use flow::KFlowDecomp;
pub use least_abs::KLeastAbsErrors;
pub use min_path_error::KMinPathError;

pub(crate) use flow::{FlowObjective, greedy_decomposition, prepare_flow};

use std::time::Instant;

use dagflow_core::SolverStatus;
use dagflow_graph::{EdgeIx, NodeIx};
use tracing::debug;

use crate::backend::new_session;
use crate::error::DecompError;
use crate::instance::Instance;
use crate::model::{PathModel, PathModelOptions};
use crate::options::DecompositionConfig;
use crate::safety::SafetyAnalysis;
use crate::stats::{Attempt, SolveStatistics};

/// Result of solving a decomposition problem.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Optimal solution.
    Solved(T),
    /// No decomposition exists under the given constraints.
    Infeasible,
    /// The solver stopped without proving optimality or infeasibility.
    Unsolved { status: SolverStatus },
}

impl<T> Outcome<T> {
    pub fn is_solved(&self) -> bool {
        matches!(self, Outcome::Solved(_))
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, Outcome::Infeasible)
    }

    pub fn solution(&self) -> Option<&T> {
        match self {
            Outcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<T> {
        match self {
            Outcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    /// Solver status name for reporting.
    pub fn status_str(&self) -> &'static str {
        match self {
            Outcome::Solved(_) => SolverStatus::Optimal.as_str(),
            Outcome::Infeasible => SolverStatus::Infeasible.as_str(),
            Outcome::Unsolved { status } => status.as_str(),
        }
    }
}

/// Objective-specific part of a decomposition model.
pub trait PathObjective {
    /// Variables the objective needs back after solving.
    type Encoding;
    type Solution;

    fn name(&self) -> &'static str;

    fn instance(&self) -> &Instance;

    /// Edges every solution path set must cover; safe lists are computed from these.
    fn trusted_edges(&self) -> Vec<EdgeIx>;

    fn encode(&self, model: &mut PathModel<'_>) -> Result<Self::Encoding, DecompError>;

    /// Read the result from an optimal model. `paths` holds the node labels of
    /// each path index.
    fn extract(
        &self,
        model: &PathModel<'_>,
        encoding: &Self::Encoding,
        paths: Vec<Vec<String>>,
    ) -> Result<Self::Solution, DecompError>;

    /// Check an extracted solution against the edge values it was fitted to.
    /// The first argument holds the solution paths in index space.
    fn verify(
        &self,
        _nodes: &[Vec<NodeIx>],
        _solution: &Self::Solution,
    ) -> Result<(), DecompError> {
        Ok(())
    }
}

/// Build and solve one model with `k` paths, verifying an optimal solution
/// before it is returned.
pub fn solve_with_paths<O: PathObjective>(
    objective: &O,
    k: usize,
    safety: &SafetyAnalysis,
    config: &DecompositionConfig,
    stats: &mut SolveStatistics,
) -> Result<Outcome<O::Solution>, DecompError> {
    let instance = objective.instance();
    let build_started = Instant::now();
    let session = new_session(&config.backend, &config.solver);
    let mut model = PathModel::build(instance, k, &model_options(config), safety, session)?;
    let encoding = objective.encode(&mut model)?;
    let build_ms = build_started.elapsed().as_secs_f64() * 1000.0;

    let solve_started = Instant::now();
    let status = model.solve()?;
    let solve_ms = solve_started.elapsed().as_secs_f64() * 1000.0;

    stats.attempts.push(Attempt {
        num_paths: k,
        status: status.as_str(),
        variables: model.session().model().num_variables(),
        constraints: model.session().model().num_constraints(),
        fixed_variables: model.fixed_variables(),
        build_ms,
        solve_ms,
    });
    debug!(
        component = "decomp",
        operation = "solve_attempt",
        status = status.as_str(),
        objective = objective.name(),
        num_paths = k,
        build_ms,
        solve_ms,
        "Finished solve attempt"
    );

    match status {
        SolverStatus::Optimal => {
            let nodes = model.solution_paths()?;
            let paths = nodes
                .iter()
                .map(|path| instance.path_labels(path))
                .collect();
            let solution = objective.extract(&model, &encoding, paths)?;
            objective.verify(&nodes, &solution)?;
            Ok(Outcome::Solved(solution))
        }
        SolverStatus::Infeasible => Ok(Outcome::Infeasible),
        status => Ok(Outcome::Unsolved { status }),
    }
}

/// Safety analysis for an objective, or a disabled one when the mode is off.
pub fn analyze_safety<O: PathObjective>(
    objective: &O,
    config: &DecompositionConfig,
    stats: &mut SolveStatistics,
) -> SafetyAnalysis {
    let mode = config.optimization.safety;
    let safety = if mode.is_enabled() {
        let threads = usize::try_from(config.solver.threads()).unwrap_or(1);
        SafetyAnalysis::compute(
            objective.instance().st_graph(),
            &objective.trusted_edges(),
            mode,
            threads,
        )
    } else {
        SafetyAnalysis::disabled()
    };
    stats.safety_mode = Some(safety.mode());
    stats.safe_lists = safety.num_safe_lists();
    stats.pinned_lists = safety.lists().len();
    stats.antichain_weight = safety.antichain_weight();
    stats.safety_ms = safety.duration_ms();
    safety
}

/// Encoding switches carried by the configuration.
fn model_options(config: &DecompositionConfig) -> PathModelOptions {
    PathModelOptions {
        encode_edge_position: config.encode_edge_position,
        encode_path_length: config.encode_path_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let solved: Outcome<u32> = Outcome::Solved(3);
        assert!(solved.is_solved());
        assert_eq!(solved.solution(), Some(&3));
        assert_eq!(solved.status_str(), "optimal");

        let timed_out: Outcome<u32> = Outcome::Unsolved {
            status: SolverStatus::TimeLimitReached,
        };
        assert!(!timed_out.is_solved());
        assert_eq!(timed_out.status_str(), "time_limit");
        assert_eq!(timed_out.into_solution(), None);

        assert!(Outcome::<u32>::Infeasible.is_infeasible());
    }
}
