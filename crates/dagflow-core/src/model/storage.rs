//! Storage access methods for the model.

use crate::ids::{ConstraintId, VariableId};
use crate::types::{Constraint, Variable};

use super::Model;
use super::error::ModelError;

impl Model {
    /// Get the number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Get the number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Get the number of coefficients in the model.
    pub fn num_coefficients(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    /// Number of variables with an integer domain.
    pub fn num_integer_variables(&self) -> usize {
        self.variables.values().filter(|v| v.is_integer()).count()
    }

    /// Get a variable by ID.
    pub fn get_variable(&self, id: VariableId) -> Result<&Variable, ModelError> {
        self.variables
            .get(&id)
            .ok_or(ModelError::InvalidVariableId(id))
    }

    /// Get a constraint by ID.
    pub fn get_constraint(&self, id: ConstraintId) -> Result<&Constraint, ModelError> {
        self.constraints
            .get(&id)
            .ok_or(ModelError::InvalidConstraintId(id))
    }

    /// Variables in ID order.
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter().map(|(&id, var)| (id, var))
    }

    /// Constraints in ID order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints.iter().map(|(&id, con)| (id, con))
    }

    /// Get the coefficient matrix in column-first form.
    ///
    /// Each column holds `(constraint_id, coefficient)` pairs for one variable.
    pub fn columns(&self) -> impl Iterator<Item = (VariableId, &Vec<(ConstraintId, f64)>)> {
        self.columns.iter().map(|(&vid, coeffs)| (vid, coeffs))
    }

    /// Get the coefficient matrix in row-first form.
    ///
    /// Returns one vector of `(variable_id, coefficient)` pairs per constraint.
    pub fn rows(&self) -> Vec<Vec<(VariableId, f64)>> {
        let mut rows = vec![Vec::new(); self.num_constraints()];
        for (var_id, coeffs) in &self.columns {
            for (constraint_id, coeff) in coeffs {
                if let Some(row) = rows.get_mut(constraint_id.index()) {
                    row.push((*var_id, *coeff));
                }
            }
        }
        rows
    }

    /// Get the coefficients for a specific variable (column)
    pub fn get_column(&self, var_id: VariableId) -> Option<&Vec<(ConstraintId, f64)>> {
        self.columns.get(&var_id)
    }
}
