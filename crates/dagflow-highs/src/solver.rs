//! HiGHS implementation of the dagflow `Backend` trait.

use crate::ffi::{HighsModel, HighsModelError, HighsOption, HighsStatus, ObjectiveSense};
use crate::status::{highs_status_string, highs_to_core_status};
use dagflow_core::{
    ConstraintId, Model, Sense, Solution, SolverError, SolverStatus, VariableId,
};
use dagflow_solver::{Backend, SolverConfig};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, trace, warn};

type ConstraintEntries = BTreeMap<ConstraintId, (Vec<usize>, Vec<f64>)>;

fn highs_model_error_to_solver_error(err: HighsModelError) -> SolverError {
    SolverError::SolverSpecific(err.to_string())
}

/// Stateless HiGHS backend; every call builds a fresh HiGHS problem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsBackend;

impl HighsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for HighsBackend {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(&mut self, model: &Model, config: &SolverConfig) -> Result<Solution, SolverError> {
        solve_model(model, config)
    }
}

/// Validate that a model is ready for solving.
fn validate_model(model: &Model) -> Result<(), SolverError> {
    if model.num_variables() == 0 {
        return Err(SolverError::EmptyModel);
    }
    Ok(())
}

fn collect_objective_coefficients(
    model: &Model,
) -> Result<(Sense, BTreeMap<VariableId, f64>), SolverError> {
    let objective = model.objective();
    let Some(sense) = objective.sense else {
        return Err(SolverError::NoObjective);
    };

    let mut objective_coeffs: BTreeMap<VariableId, f64> = BTreeMap::new();
    for (var_id, coeff) in &objective.terms {
        model
            .get_variable(*var_id)
            .map_err(|_| SolverError::InvalidVariableId(var_id.inner()))?;
        *objective_coeffs.entry(*var_id).or_insert(0.0) += *coeff;
    }

    Ok((sense, objective_coeffs))
}

fn apply_solver_config(highs_model: &mut HighsModel, config: &SolverConfig) {
    highs_model.set_log_to_console(config.log_to_console());
    highs_model.set_option("time_limit", HighsOption::Float(config.time_limit()));
    highs_model.set_option(
        "presolve",
        HighsOption::Str(config.presolve().as_str().to_string()),
    );
    highs_model.set_option(
        "threads",
        HighsOption::Int(i32::try_from(config.threads()).unwrap_or(i32::MAX)),
    );
    let tolerance = config.tolerance();
    for option in [
        "mip_rel_gap",
        "mip_abs_gap",
        "mip_feasibility_tolerance",
        "primal_feasibility_tolerance",
    ] {
        highs_model.set_option(option, HighsOption::Float(tolerance));
    }
}

fn add_variables_to_highs(
    model: &Model,
    highs_model: &mut HighsModel,
    objective_coeffs: &BTreeMap<VariableId, f64>,
) -> BTreeMap<VariableId, usize> {
    let mut var_id_to_col = BTreeMap::new();

    for (var_id, var) in model.variables() {
        let obj_coeff = objective_coeffs.get(&var_id).copied().unwrap_or(0.0);
        let col_idx = if var.is_integer() {
            highs_model.add_integer_col(var.bounds.lower, var.bounds.upper, obj_coeff)
        } else {
            highs_model.add_col(var.bounds.lower, var.bounds.upper, obj_coeff)
        };
        var_id_to_col.insert(var_id, col_idx);

        trace!(
            component = "highs",
            operation = "add_variable",
            status = "success",
            var_id = var_id.inner(),
            col_idx,
            lower = var.bounds.lower,
            upper = var.bounds.upper,
            obj_coeff,
            kind = var.kind.as_str(),
            "Added variable to HiGHS"
        );
    }

    debug!(
        component = "highs",
        operation = "add_variables",
        status = "success",
        num_vars = model.num_variables(),
        "Added all variables to HiGHS"
    );

    var_id_to_col
}

fn build_constraint_entries(
    model: &Model,
    var_id_to_col: &BTreeMap<VariableId, usize>,
) -> ConstraintEntries {
    let started = Instant::now();
    let mut constraint_entries: ConstraintEntries = BTreeMap::new();

    for (var_id, column) in model.columns() {
        let Some(&col_idx) = var_id_to_col.get(&var_id) else {
            warn!(
                component = "highs",
                operation = "build_rows",
                status = "warn",
                var_id = var_id.inner(),
                "Variable missing HiGHS column index; skipping coefficients"
            );
            continue;
        };

        for (constraint_id, coeff) in column {
            let entry = constraint_entries
                .entry(*constraint_id)
                .or_insert_with(|| (Vec::new(), Vec::new()));
            entry.0.push(col_idx);
            entry.1.push(*coeff);
        }
    }

    debug!(
        component = "highs",
        operation = "build_rows",
        status = "success",
        num_constraints = constraint_entries.len(),
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Built constraint matrix"
    );

    constraint_entries
}

fn add_constraints_to_highs(
    model: &Model,
    highs_model: &mut HighsModel,
    mut constraint_entries: ConstraintEntries,
) -> Result<(), SolverError> {
    for (constraint_id, constraint) in model.constraints() {
        let (col_indices, coefficients) = constraint_entries
            .remove(&constraint_id)
            .unwrap_or_default();

        highs_model
            .add_row(
                constraint.bounds.lower,
                constraint.bounds.upper,
                &col_indices,
                &coefficients,
            )
            .map_err(highs_model_error_to_solver_error)?;
    }

    debug!(
        component = "highs",
        operation = "add_constraints",
        status = "success",
        num_constraints = model.num_constraints(),
        "Added all constraints to HiGHS"
    );

    Ok(())
}

/// A model whose columns all have finite bounds cannot be unbounded.
fn all_bounded(model: &Model) -> bool {
    model
        .variables()
        .all(|(_, var)| var.bounds.lower.is_finite() && var.bounds.upper.is_finite())
}

/// Lower, solve and extract.
fn solve_model(model: &Model, config: &SolverConfig) -> Result<Solution, SolverError> {
    validate_model(model)?;

    let solver_version = crate::ffi::highs_version().unwrap_or_else(|| "unknown".to_string());
    let solve_started = Instant::now();

    debug!(
        component = "highs",
        operation = "solve",
        status = "success",
        solver_version = %solver_version,
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        nnz = model.num_coefficients(),
        "Starting solve process"
    );

    let (sense, objective_coeffs) = collect_objective_coefficients(model)?;

    let mut highs_model = HighsModel::new();
    apply_solver_config(&mut highs_model, config);
    highs_model.set_objective_sense(match sense {
        Sense::Minimize => ObjectiveSense::Minimize,
        Sense::Maximize => ObjectiveSense::Maximize,
    });

    let var_id_to_col = add_variables_to_highs(model, &mut highs_model, &objective_coeffs);
    let constraint_entries = build_constraint_entries(model, &var_id_to_col);
    add_constraints_to_highs(model, &mut highs_model, constraint_entries)?;

    let highs_status = highs_model
        .solve()
        .map_err(highs_model_error_to_solver_error)?;
    let status = if highs_status == HighsStatus::UnboundedOrInfeasible && all_bounded(model) {
        SolverStatus::Infeasible
    } else {
        highs_to_core_status(highs_status)
    };
    let solve_time_seconds = solve_started.elapsed().as_secs_f64();
    let simplex_iterations = highs_model.simplex_iteration_count();
    let mip_gap = highs_model.mip_gap();

    let mut metadata = BTreeMap::new();
    metadata.insert("simplex_iterations".to_string(), simplex_iterations as f64);
    metadata.insert("mip_gap".to_string(), mip_gap);

    let has_values = highs_status == HighsStatus::Optimal || highs_model.has_primal_solution();
    if highs_status != HighsStatus::Optimal {
        warn!(
            component = "highs",
            operation = "solve",
            status = "warn",
            solver_version = %solver_version,
            highs_status = highs_status_string(highs_status),
            has_values,
            simplex_iterations,
            duration_ms = solve_time_seconds * 1000.0,
            "Solver did not prove optimality"
        );
    }

    if !has_values {
        let mut solution = Solution::status_only(status, solve_time_seconds);
        solution.metadata = metadata;
        return Ok(solution);
    }

    let primal_values = highs_model
        .col_values()
        .map_err(highs_model_error_to_solver_error)?;
    let objective_value = highs_model
        .objective_value()
        .map_err(highs_model_error_to_solver_error)?;

    debug!(
        component = "highs",
        operation = "extract_solution",
        status = "success",
        highs_status = highs_status_string(highs_status),
        objective_value,
        num_primal_values = primal_values.len(),
        mip_gap,
        simplex_iterations,
        duration_ms = solve_time_seconds * 1000.0,
        "Solution extracted"
    );

    Ok(Solution {
        status,
        primal_values,
        objective_value: Some(objective_value),
        solve_time_seconds,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagflow_core::{Bounds, Objective, Variable};

    #[test]
    fn test_rejects_empty_model() {
        let model = Model::new();
        let result = HighsBackend::new().solve(&model, &SolverConfig::default());
        assert_eq!(result.unwrap_err(), SolverError::EmptyModel);
    }

    #[test]
    fn test_rejects_missing_objective() {
        let mut model = Model::new();
        model
            .add_variable(Variable::continuous(Bounds::new(0.0, 1.0)))
            .unwrap();
        let result = HighsBackend::new().solve(&model, &SolverConfig::default());
        assert_eq!(result.unwrap_err(), SolverError::NoObjective);
    }

    #[test]
    fn test_all_bounded() {
        let mut model = Model::new();
        model.add_variable(Variable::binary()).unwrap();
        assert!(all_bounded(&model));
        model
            .add_variable(Variable::continuous(Bounds::new(0.0, f64::INFINITY)))
            .unwrap();
        assert!(!all_bounded(&model));
    }

    #[test]
    fn test_objective_coefficients_merge() {
        let mut model = Model::new();
        let x = model.add_variable(Variable::binary()).unwrap();
        model
            .set_objective(Objective {
                sense: Some(Sense::Minimize),
                terms: vec![(x, 1.0), (x, 2.0)],
            })
            .unwrap();
        let (sense, coeffs) = collect_objective_coefficients(&model).unwrap();
        assert_eq!(sense, Sense::Minimize);
        assert_eq!(coeffs.get(&x).copied(), Some(3.0));
    }
}
