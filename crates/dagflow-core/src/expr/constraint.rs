//! Constraint expressions: a linear expression related to a scalar bound.

use crate::expr::linear::LinearExpr;

/// Relational operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::LessEqual => "<=",
            Relation::GreaterEqual => ">=",
            Relation::Equal => "==",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstraintExpr {
    expr: LinearExpr,
    relation: Relation,
    rhs: f64,
}

impl ConstraintExpr {
    pub fn new(expr: LinearExpr, relation: Relation, rhs: f64) -> Self {
        Self {
            expr,
            relation,
            rhs,
        }
    }

    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// Row bounds `(lower, upper)` implied by the relation.
    pub fn row_bounds(&self) -> (f64, f64) {
        match self.relation {
            Relation::LessEqual => (f64::NEG_INFINITY, self.rhs),
            Relation::GreaterEqual => (self.rhs, f64::INFINITY),
            Relation::Equal => (self.rhs, self.rhs),
        }
    }

    pub fn into_parts(self) -> (LinearExpr, Relation, f64) {
        (self.expr, self.relation, self.rhs)
    }
}
