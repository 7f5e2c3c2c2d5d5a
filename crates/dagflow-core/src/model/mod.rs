//! Model module for building mixed-integer linear programs.
//!
//! - [`error`]: Model error types
//! - [`builder`]: Methods for adding variables, constraints, and objectives
//! - [`storage`]: Column-first sparse storage access

mod builder;
mod error;
mod storage;

use crate::ids::{ConstraintId, VariableId};
use crate::types::{Constraint, Objective, Variable};
use std::collections::BTreeMap;

pub use error::ModelError;

/// A mixed-integer linear program under construction.
///
/// Variables, constraints, and the objective can be added at any time.
/// Coefficients live in column-first sparse storage.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) variables: BTreeMap<VariableId, Variable>,
    pub(crate) constraints: BTreeMap<ConstraintId, Constraint>,
    pub(crate) objective: Objective,
    // Column-first sparse storage: variable_id -> vec of (constraint_id, coefficient)
    pub(crate) columns: BTreeMap<VariableId, Vec<(ConstraintId, f64)>>,
    pub(crate) next_variable_id: u32,
    pub(crate) next_constraint_id: u32,
}

impl Model {
    /// Create a new empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the objective
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub(crate) fn ensure_variable_exists(&self, id: VariableId) -> Result<(), ModelError> {
        if self.variables.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::InvalidVariableId(id))
        }
    }

    pub(crate) fn ensure_constraint_exists(&self, id: ConstraintId) -> Result<(), ModelError> {
        if self.constraints.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::InvalidConstraintId(id))
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::expr::{ConstraintExpr, LinearExpr, Relation};
    use crate::types::{Bounds, Sense, VarKind};

    #[test]
    fn test_new_model_is_empty() {
        let model = Model::new();
        assert_eq!(model.num_variables(), 0);
        assert_eq!(model.num_constraints(), 0);
    }

    #[test]
    fn test_add_variable() {
        let mut model = Model::new();
        let var = Variable::continuous(Bounds::new(0.0, 10.0));

        let id = model.add_variable(var).unwrap();
        assert_eq!(model.num_variables(), 1);
        assert_eq!(model.get_variable(id).unwrap(), &var);
    }

    #[test]
    fn test_variable_bounds_validation() {
        let mut model = Model::new();
        let result = model.add_variable(Variable::continuous(Bounds::new(5.0, 1.0)));
        assert!(matches!(
            result,
            Err(ModelError::InvalidVariableBounds { .. })
        ));
    }

    #[test]
    fn test_constraint_bounds_validation() {
        let mut model = Model::new();
        let result = model.add_constraint(Constraint {
            bounds: Bounds::new(10.0, 0.0),
        });
        assert!(matches!(
            result,
            Err(ModelError::InvalidConstraintBounds { .. })
        ));
    }

    #[test]
    fn test_add_constraint_expr_maps_relation_to_bounds() {
        let mut model = Model::new();
        let var = model
            .add_variable(Variable::continuous(Bounds::new(0.0, 1.0)))
            .unwrap();
        let constraint =
            ConstraintExpr::new(LinearExpr::term(var, 1.0), Relation::GreaterEqual, 2.0);

        let con = model.add_constraint_expr(constraint).unwrap();
        let stored = model.get_constraint(con).unwrap();
        assert_eq!(stored.bounds.lower, 2.0);
        assert!(stored.bounds.upper.is_infinite());
        assert_eq!(model.get_column(var).unwrap(), &vec![(con, 1.0)]);
    }

    #[test]
    fn test_constraint_merges_duplicate_terms() {
        let mut model = Model::new();
        let x = model.add_variable(Variable::binary()).unwrap();
        let expr = LinearExpr::var(x) + LinearExpr::term(x, 2.0);
        let con = model.add_constraint_expr(expr.eq_scalar(3.0)).unwrap();
        assert_eq!(model.rows()[con.index()], vec![(x, 3.0)]);
    }

    #[test]
    fn test_constraint_rejects_unknown_variable() {
        let mut model = Model::new();
        let ghost = VariableId::new(9);
        let result = model.add_constraint_expr(LinearExpr::var(ghost).le_scalar(1.0));
        assert_eq!(result, Err(ModelError::InvalidVariableId(ghost)));
        assert_eq!(model.num_constraints(), 0);
    }

    #[test]
    fn test_set_objective_replaces_previous() {
        let mut model = Model::new();
        let x = model
            .add_variable(Variable::continuous(Bounds::new(0.0, 10.0)))
            .unwrap();

        model.minimize(LinearExpr::term(x, 1.0)).unwrap();
        model.maximize(LinearExpr::term(x, 2.0)).unwrap();
        assert_eq!(model.objective().sense, Some(Sense::Maximize));
        assert_eq!(model.objective().terms, vec![(x, 2.0)]);
    }

    #[test]
    fn test_set_objective_rejects_missing_sense() {
        let mut model = Model::new();
        let result = model.set_objective(Objective::default());
        assert_eq!(result, Err(ModelError::NoObjective));
    }

    #[test]
    fn test_set_coefficient_with_invalid_constraint_fails() {
        let mut model = Model::new();
        let var_id = model.add_variable(Variable::binary()).unwrap();
        let invalid = ConstraintId::new(999);

        let result = model.set_coefficient(var_id, invalid, 2.5);
        assert_eq!(result, Err(ModelError::InvalidConstraintId(invalid)));
    }

    #[test]
    fn test_binary_product_emits_three_rows() {
        let mut model = Model::new();
        let x = model.add_variable(Variable::binary()).unwrap();
        let w = model
            .add_variable(Variable::continuous(Bounds::new(0.0, 9.0)))
            .unwrap();
        let p = model
            .add_variable(Variable::continuous(Bounds::new(0.0, 9.0)))
            .unwrap();

        let rows = model.add_binary_product(x, w, p, 9.0).unwrap();
        assert_eq!(model.num_constraints(), 3);

        // p - 9x <= 0
        let gated = model.get_constraint(rows[0]).unwrap();
        assert_eq!(gated.bounds.upper, 0.0);
        // p - w - 9x >= -9
        let tight = model.get_constraint(rows[2]).unwrap();
        assert_eq!(tight.bounds.lower, -9.0);
        let tight_row = &model.rows()[rows[2].index()];
        assert!(tight_row.contains(&(x, -9.0)));
        assert!(tight_row.contains(&(w, -1.0)));
        assert!(tight_row.contains(&(p, 1.0)));
    }

    #[test]
    fn test_binary_product_requires_binary_gate() {
        let mut model = Model::new();
        let x = model
            .add_variable(Variable::integer(Bounds::new(0.0, 3.0)))
            .unwrap();
        let w = model
            .add_variable(Variable::continuous(Bounds::new(0.0, 1.0)))
            .unwrap();
        assert_eq!(
            model.add_binary_product(x, w, w, 1.0),
            Err(ModelError::NonBinaryFactor(x))
        );
        assert_eq!(
            model.get_variable(x).unwrap().kind,
            VarKind::Integer
        );
        let y = model.add_variable(Variable::binary()).unwrap();
        assert!(matches!(
            model.add_binary_product(y, w, w, f64::INFINITY),
            Err(ModelError::InvalidProductBound { .. })
        ));
    }
}
