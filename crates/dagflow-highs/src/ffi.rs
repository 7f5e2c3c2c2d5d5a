//! Thin wrapper over the `highs` crate plus raw info queries.
//!
//! This module contains unsafe code for reading HiGHS info values.
#![allow(unsafe_code)]

use highs::{Col, HighsModelStatus, RowProblem, Sense as HighsSense, SolvedModel};
use std::ffi::{CStr, CString};
use std::fmt;
use tracing::{debug, trace, warn};

/// HiGHS `SolutionStatus::kSolutionStatusFeasible`.
const SOLUTION_STATUS_FEASIBLE: u64 = 2;

/// Objective sense for optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

/// Model status reported by HiGHS after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighsStatus {
    Optimal,
    Infeasible,
    Unbounded,
    UnboundedOrInfeasible,
    ReachedTimeLimit,
    ReachedIterationLimit,
    Unknown,
}

/// Errors returned by the HiGHS model wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum HighsModelError {
    ColumnCoefficientLengthMismatch { columns: usize, coefficients: usize },
    ColumnIndexOutOfBounds { column_index: usize, num_columns: usize },
    RunFailed { reason: String },
    SolveRequired { operation: &'static str },
}

impl fmt::Display for HighsModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighsModelError::ColumnCoefficientLengthMismatch {
                columns,
                coefficients,
            } => write!(
                f,
                "columns length ({}) must match coefficients length ({})",
                columns, coefficients
            ),
            HighsModelError::ColumnIndexOutOfBounds {
                column_index,
                num_columns,
            } => write!(
                f,
                "column index {} out of bounds (num_columns = {})",
                column_index, num_columns
            ),
            HighsModelError::RunFailed { reason } => write!(f, "HiGHS run failed: {}", reason),
            HighsModelError::SolveRequired { operation } => {
                write!(f, "solve must be called before {}", operation)
            }
        }
    }
}

impl std::error::Error for HighsModelError {}

/// Option value types for HiGHS solver configuration.
#[derive(Debug, Clone)]
pub enum HighsOption {
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(String),
}

/// Safe wrapper around a HiGHS row-wise problem and its solved state.
pub struct HighsModel {
    problem: RowProblem,
    objective_sense: ObjectiveSense,
    solved: Option<SolvedModel>,
    columns: Vec<Col>,
    log_to_console: bool,
    options: Vec<(String, HighsOption)>,
}

impl HighsModel {
    /// Create a new HiGHS model
    pub fn new() -> Self {
        debug!(
            component = "highs",
            operation = "init_highs",
            status = "success",
            "Creating new HiGHS model"
        );
        HighsModel {
            problem: RowProblem::default(),
            objective_sense: ObjectiveSense::Minimize,
            solved: None,
            columns: Vec::new(),
            log_to_console: false,
            options: Vec::new(),
        }
    }

    /// Add a continuous column and return its index.
    pub fn add_col(&mut self, lower_bound: f64, upper_bound: f64, objective_coefficient: f64) -> usize {
        self.add_col_with_integrality(lower_bound, upper_bound, objective_coefficient, false)
    }

    /// Add an integer column and return its index.
    pub fn add_integer_col(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
        objective_coefficient: f64,
    ) -> usize {
        self.add_col_with_integrality(lower_bound, upper_bound, objective_coefficient, true)
    }

    fn add_col_with_integrality(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
        objective_coefficient: f64,
        is_integer: bool,
    ) -> usize {
        trace!(
            lower_bound,
            upper_bound,
            objective_coefficient,
            is_integer,
            component = "highs",
            operation = "add_column",
            status = "success",
            "Adding column"
        );
        self.solved = None;
        let col = if is_integer {
            self.problem
                .add_integer_column(objective_coefficient, lower_bound..=upper_bound)
        } else {
            self.problem
                .add_column(objective_coefficient, lower_bound..=upper_bound)
        };
        self.columns.push(col);
        self.columns.len() - 1
    }

    /// Add a row `lower <= sum(coefficients * columns) <= upper`.
    ///
    /// # Errors
    ///
    /// Returns an error if columns and coefficients have different lengths
    /// or if any column index is out of bounds.
    pub fn add_row(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
        columns: &[usize],
        coefficients: &[f64],
    ) -> Result<usize, HighsModelError> {
        if columns.len() != coefficients.len() {
            warn!(
                component = "highs",
                operation = "add_row",
                status = "error",
                columns = columns.len(),
                coefficients = coefficients.len(),
                "Column/coefficients length mismatch"
            );
            return Err(HighsModelError::ColumnCoefficientLengthMismatch {
                columns: columns.len(),
                coefficients: coefficients.len(),
            });
        }
        self.solved = None;
        let num_columns = self.columns.len();
        let mut factors = Vec::with_capacity(columns.len());
        for (col_idx, coeff) in columns.iter().copied().zip(coefficients.iter().copied()) {
            let col = *self
                .columns
                .get(col_idx)
                .ok_or(HighsModelError::ColumnIndexOutOfBounds {
                    column_index: col_idx,
                    num_columns,
                })?;
            factors.push((col, coeff));
        }
        self.problem.add_row(lower_bound..=upper_bound, factors);
        Ok(self.problem.num_rows().saturating_sub(1))
    }

    /// Set the objective sense
    pub fn set_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective_sense = sense;
    }

    /// Enable or disable logging to console for the next solve
    pub fn set_log_to_console(&mut self, enabled: bool) {
        self.log_to_console = enabled;
    }

    /// Set a HiGHS option for the next solve.
    pub fn set_option(&mut self, option: impl Into<String>, value: HighsOption) {
        self.options.push((option.into(), value));
    }

    /// Run HiGHS on the accumulated problem.
    ///
    /// The built problem is consumed; a later solve needs columns and rows
    /// to be added again.
    pub fn solve(&mut self) -> Result<HighsStatus, HighsModelError> {
        debug!(
            num_cols = self.problem.num_cols(),
            num_rows = self.problem.num_rows(),
            ?self.objective_sense,
            component = "highs",
            operation = "solve",
            status = "success",
            "Solving model"
        );

        let sense = match self.objective_sense {
            ObjectiveSense::Minimize => HighsSense::Minimise,
            ObjectiveSense::Maximize => HighsSense::Maximise,
        };

        let problem = std::mem::take(&mut self.problem);
        let mut model = problem.optimise(sense);
        if !self.log_to_console {
            model.make_quiet();
        }
        for (option, value) in self.options.drain(..) {
            match value {
                HighsOption::Bool(val) => model.set_option(option.as_str(), val),
                HighsOption::Int(val) => model.set_option(option.as_str(), val),
                HighsOption::Float(val) => model.set_option(option.as_str(), val),
                HighsOption::Str(val) => model.set_option(option.as_str(), val.as_str()),
            }
        }
        if self.log_to_console {
            model.set_option("log_to_console", true);
            model.set_option("output_flag", true);
        }

        self.columns.clear();
        let solved = model.try_solve().map_err(|status| {
            warn!(
                component = "highs",
                operation = "solve",
                status = "error",
                highs_status = ?status,
                "HiGHS run returned an error status"
            );
            HighsModelError::RunFailed {
                reason: format!("{status:?}"),
            }
        })?;
        let status = map_status(solved.status());
        trace!(
            component = "highs",
            operation = "solve",
            status = "success",
            ?status,
            "Model status received"
        );
        self.solved = Some(solved);
        Ok(status)
    }

    /// Get the number of columns added since the last solve.
    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    /// Objective value of the current solution.
    pub fn objective_value(&self) -> Result<f64, HighsModelError> {
        let solved = self.solved.as_ref().ok_or(HighsModelError::SolveRequired {
            operation: "objective_value",
        })?;
        Ok(solved.objective_value())
    }

    /// Primal column values of the current solution.
    pub fn col_values(&self) -> Result<Vec<f64>, HighsModelError> {
        let solved = self.solved.as_ref().ok_or(HighsModelError::SolveRequired {
            operation: "col_values",
        })?;
        Ok(solved.get_solution().columns().to_vec())
    }

    /// Whether HiGHS holds a feasible primal solution.
    pub fn has_primal_solution(&self) -> bool {
        self.get_int_info("primal_solution_status") == Some(SOLUTION_STATUS_FEASIBLE)
    }

    /// Get the MIP gap (or infinity for pure LPs).
    pub fn mip_gap(&self) -> f64 {
        match self.solved.as_ref() {
            Some(solved) => solved.mip_gap(),
            None => f64::NAN,
        }
    }

    /// Get the simplex iteration count for the latest solve.
    pub fn simplex_iteration_count(&self) -> u64 {
        self.get_int_info("simplex_iteration_count").unwrap_or(0)
    }

    fn get_int_info(&self, name: &str) -> Option<u64> {
        let solved = self.solved.as_ref()?;
        let c_name = CString::new(name).ok()?;
        let mut value: highs_sys::HighsInt = 0;
        let status = unsafe {
            highs_sys::Highs_getIntInfoValue(solved.as_ptr(), c_name.as_ptr(), &raw mut value)
        };
        if status == highs_sys::STATUS_OK && value >= 0 {
            Some(value as u64)
        } else {
            debug!(
                component = "highs",
                operation = "solve_info",
                info = name,
                status_code = status,
                "Info value not available"
            );
            None
        }
    }
}

impl Default for HighsModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HighsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let objective_value = self.solved.as_ref().map(|s| s.objective_value());
        f.debug_struct("HighsModel")
            .field("num_variables", &self.problem.num_cols())
            .field("num_constraints", &self.problem.num_rows())
            .field("objective_sense", &self.objective_sense)
            .field("objective_value", &objective_value)
            .finish_non_exhaustive()
    }
}

/// Return the HiGHS solver version string, if available.
pub fn highs_version() -> Option<String> {
    unsafe {
        let ptr = highs_sys::Highs_version();
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
        }
    }
}

fn map_status(status: HighsModelStatus) -> HighsStatus {
    match status {
        HighsModelStatus::Optimal => HighsStatus::Optimal,
        HighsModelStatus::Infeasible => HighsStatus::Infeasible,
        HighsModelStatus::Unbounded => HighsStatus::Unbounded,
        HighsModelStatus::UnboundedOrInfeasible => HighsStatus::UnboundedOrInfeasible,
        HighsModelStatus::ReachedTimeLimit => HighsStatus::ReachedTimeLimit,
        HighsModelStatus::ReachedIterationLimit => HighsStatus::ReachedIterationLimit,
        _ => HighsStatus::Unknown,
    }
}
