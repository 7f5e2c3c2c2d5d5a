//! Model builder methods for adding variables, constraints, and objectives.

use crate::expr::{ConstraintExpr, LinearExpr};
use crate::ids::{ConstraintId, VariableId};
use crate::types::{Bounds, Constraint, Objective, Sense, VarKind, Variable};

use crate::model::Model;
use crate::model::error::ModelError;

impl Model {
    /// Add a variable to the model.
    pub fn add_variable(&mut self, variable: Variable) -> Result<VariableId, ModelError> {
        if !variable.bounds.is_valid() {
            return Err(ModelError::InvalidVariableBounds {
                lower: variable.bounds.lower,
                upper: variable.bounds.upper,
            });
        }

        let id = VariableId::new(self.next_variable_id);
        self.next_variable_id += 1;
        self.variables.insert(id, variable);

        tracing::trace!(
            component = "model",
            operation = "add_variable",
            status = "success",
            var_id = id.inner(),
            kind = variable.kind.as_str(),
            lower = variable.bounds.lower,
            upper = variable.bounds.upper,
            "Added variable"
        );
        Ok(id)
    }

    /// Add an empty constraint row to the model.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintId, ModelError> {
        if !constraint.bounds.is_valid() {
            return Err(ModelError::InvalidConstraintBounds {
                lower: constraint.bounds.lower,
                upper: constraint.bounds.upper,
            });
        }

        let id = ConstraintId::new(self.next_constraint_id);
        self.next_constraint_id += 1;
        self.constraints.insert(id, constraint);

        Ok(id)
    }

    /// Set or replace the objective function.
    pub fn set_objective(&mut self, objective: Objective) -> Result<(), ModelError> {
        let sense = objective.sense.ok_or(ModelError::NoObjective)?;
        for (var_id, coeff) in &objective.terms {
            self.ensure_variable_exists(*var_id)?;
            if !coeff.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: *coeff,
                });
            }
        }

        let normalized = LinearExpr::from_terms(objective.terms).normalized_terms();
        self.objective = Objective {
            sense: Some(sense),
            terms: normalized,
        };
        tracing::debug!(
            component = "model",
            operation = "set_objective",
            status = "success",
            sense = sense.as_str(),
            terms = self.objective.terms.len(),
            "Set objective function"
        );
        Ok(())
    }

    /// Minimize a linear expression, replacing any previous objective.
    ///
    /// The expression constant does not change the optimum and is dropped.
    pub fn minimize(&mut self, expr: LinearExpr) -> Result<(), ModelError> {
        self.set_objective(Objective {
            sense: Some(Sense::Minimize),
            terms: expr.into_parts().0,
        })
    }

    /// Maximize a linear expression, replacing any previous objective.
    pub fn maximize(&mut self, expr: LinearExpr) -> Result<(), ModelError> {
        self.set_objective(Objective {
            sense: Some(Sense::Maximize),
            terms: expr.into_parts().0,
        })
    }

    /// Add a constraint from an expression and explicit row bounds.
    pub fn add_expr_constraint(
        &mut self,
        expr: LinearExpr,
        bounds: Bounds,
    ) -> Result<ConstraintId, ModelError> {
        let normalized = expr.normalized_terms();
        for (var_id, coeff) in &normalized {
            self.ensure_variable_exists(*var_id)?;
            if !coeff.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: *coeff,
                });
            }
        }
        let constraint_id = self.add_constraint(Constraint { bounds })?;
        for (var_id, coeff) in normalized {
            self.set_coefficient(var_id, constraint_id, coeff)?;
        }
        Ok(constraint_id)
    }

    /// Add a constraint from a relation (e.g., `x + y <= 10`).
    pub fn add_constraint_expr(
        &mut self,
        constraint: ConstraintExpr,
    ) -> Result<ConstraintId, ModelError> {
        let (lower, upper) = constraint.row_bounds();
        let (expr, _, _) = constraint.into_parts();
        self.add_expr_constraint(expr, Bounds::new(lower, upper))
    }

    /// Constrain `product == binary * continuous` for `0 <= continuous <= upper`.
    ///
    /// Emits the three big-M rows:
    /// `product <= upper * binary`, `product <= continuous` and
    /// `product >= continuous - (1 - binary) * upper`.
    pub fn add_binary_product(
        &mut self,
        binary: VariableId,
        continuous: VariableId,
        product: VariableId,
        upper: f64,
    ) -> Result<[ConstraintId; 3], ModelError> {
        if !upper.is_finite() || upper < 0.0 {
            return Err(ModelError::InvalidProductBound { upper });
        }
        let gate = self.get_variable(binary)?;
        if gate.kind != VarKind::Binary {
            return Err(ModelError::NonBinaryFactor(binary));
        }
        self.ensure_variable_exists(continuous)?;
        self.ensure_variable_exists(product)?;

        let p = LinearExpr::var(product);
        let x = LinearExpr::var(binary);
        let w = LinearExpr::var(continuous);

        let gated = self.add_constraint_expr(p.le_expr(&(x.clone() * upper)))?;
        let capped = self.add_constraint_expr(p.le_expr(&w))?;
        let tight = self.add_constraint_expr(
            p.ge_expr(&(w - (LinearExpr::from_constant(1.0) - x) * upper)),
        )?;
        Ok([gated, capped, tight])
    }

    /// Add a coefficient to the constraint matrix.
    ///
    /// Setting the same entry twice overwrites the previous coefficient.
    pub fn set_coefficient(
        &mut self,
        var_id: VariableId,
        constraint_id: ConstraintId,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        if !coefficient.is_finite() {
            return Err(ModelError::InvalidCoefficient { coefficient });
        }
        self.ensure_variable_exists(var_id)?;
        self.ensure_constraint_exists(constraint_id)?;

        let column = self.columns.entry(var_id).or_default();
        match column.iter_mut().find(|(cid, _)| *cid == constraint_id) {
            Some(entry) => entry.1 = coefficient,
            None => column.push((constraint_id, coefficient)),
        }

        Ok(())
    }
}
