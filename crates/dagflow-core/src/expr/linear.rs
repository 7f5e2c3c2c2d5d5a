//! Linear expression type: weighted variable terms plus a constant.
//!
//! Terms are kept in insertion order and may repeat a variable; duplicates
//! are merged only when the expression is lowered into a model row.

use crate::expr::constraint::{ConstraintExpr, Relation};
use crate::ids::VariableId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    constant: f64,
    terms: Vec<(VariableId, f64)>,
}

impl LinearExpr {
    // ── Constructors ────────────────────────────────────────

    /// Empty expression (all zeros).
    pub fn new() -> Self {
        Self::default()
    }

    /// Just a constant, no variable terms.
    pub fn from_constant(constant: f64) -> Self {
        Self {
            constant,
            terms: Vec::new(),
        }
    }

    /// Single term: coeff * var.
    pub fn term(var_id: VariableId, coeff: f64) -> Self {
        if coeff == 0.0 {
            return Self::default();
        }
        Self {
            constant: 0.0,
            terms: vec![(var_id, coeff)],
        }
    }

    /// Single variable with coefficient 1.0.
    pub fn var(var_id: VariableId) -> Self {
        Self::term(var_id, 1.0)
    }

    /// Sum of variables, each with coefficient 1.0.
    pub fn sum_of(vars: impl IntoIterator<Item = VariableId>) -> Self {
        Self {
            constant: 0.0,
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
        }
    }

    /// From raw terms, no constant. Zero coefficients are dropped.
    pub fn from_terms(terms: impl IntoIterator<Item = (VariableId, f64)>) -> Self {
        Self {
            constant: 0.0,
            terms: terms.into_iter().filter(|(_, c)| *c != 0.0).collect(),
        }
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn terms(&self) -> &[(VariableId, f64)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Consume and return (terms, constant).
    pub fn into_parts(self) -> (Vec<(VariableId, f64)>, f64) {
        (self.terms, self.constant)
    }

    // ── Building ────────────────────────────────────────────

    /// Append `coeff * var` in place.
    pub fn push_term(&mut self, var_id: VariableId, coeff: f64) {
        if coeff != 0.0 {
            self.terms.push((var_id, coeff));
        }
    }

    /// Scale all terms and the constant by a factor.
    pub fn scale(&self, by: f64) -> Self {
        Self {
            constant: self.constant * by,
            terms: self
                .terms
                .iter()
                .map(|(v, c)| (*v, *c * by))
                .filter(|(_, c)| *c != 0.0)
                .collect(),
        }
    }

    /// Add another expression.
    pub fn plus(&self, other: &LinearExpr) -> Self {
        let mut terms = Vec::with_capacity(self.terms.len() + other.terms.len());
        terms.extend_from_slice(&self.terms);
        terms.extend_from_slice(&other.terms);
        Self {
            constant: self.constant + other.constant,
            terms,
        }
    }

    /// Add a constant offset.
    pub fn add_constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// Merged terms with duplicates combined and zeros removed.
    pub fn normalized_terms(&self) -> Vec<(VariableId, f64)> {
        let mut merged: BTreeMap<VariableId, f64> = BTreeMap::new();
        for (var_id, coeff) in &self.terms {
            *merged.entry(*var_id).or_insert(0.0) += *coeff;
        }
        merged.into_iter().filter(|(_, c)| *c != 0.0).collect()
    }

    /// Evaluate the expression against dense variable values.
    ///
    /// Variables without a value count as zero.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().fold(self.constant, |acc, (v, c)| {
            acc + c * values.get(v.index()).copied().unwrap_or(0.0)
        })
    }

    // ── Relations (produce ConstraintExpr) ──────────────────

    fn relate_scalar(&self, rhs: f64, relation: Relation) -> ConstraintExpr {
        let Self { constant, terms } = self.clone();
        ConstraintExpr::new(
            Self {
                constant: 0.0,
                terms,
            },
            relation,
            rhs - constant,
        )
    }

    fn relate_expr(&self, other: &LinearExpr, relation: Relation) -> ConstraintExpr {
        let combined = self.plus(&other.scale(-1.0));
        combined.relate_scalar(0.0, relation)
    }

    pub fn le_scalar(&self, rhs: f64) -> ConstraintExpr {
        self.relate_scalar(rhs, Relation::LessEqual)
    }

    pub fn ge_scalar(&self, rhs: f64) -> ConstraintExpr {
        self.relate_scalar(rhs, Relation::GreaterEqual)
    }

    pub fn eq_scalar(&self, rhs: f64) -> ConstraintExpr {
        self.relate_scalar(rhs, Relation::Equal)
    }

    pub fn le_expr(&self, rhs: &LinearExpr) -> ConstraintExpr {
        self.relate_expr(rhs, Relation::LessEqual)
    }

    pub fn ge_expr(&self, rhs: &LinearExpr) -> ConstraintExpr {
        self.relate_expr(rhs, Relation::GreaterEqual)
    }
}

// ── Operator overloads ──────────────────────────────────────

impl std::ops::Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> Self::Output {
        self.constant += rhs.constant;
        self.terms.extend(rhs.terms);
        self
    }
}

impl std::ops::Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: LinearExpr) -> Self::Output {
        self + rhs.scale(-1.0)
    }
}

impl std::ops::Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl std::ops::Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> Self::Output {
        self.scale(-1.0)
    }
}

impl std::iter::Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}

impl FromIterator<(VariableId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VariableId, f64)>>(iter: I) -> Self {
        Self::from_terms(iter)
    }
}
