//! Linear model store shared by the dagflow solver layers.
//!
//! A [`Model`] collects variables, constraint rows and one linear objective.
//! Backends read it through [`Model::columns`] and report back a
//! solver-agnostic [`Solution`].

pub mod expr;
pub mod ids;
pub mod model;
pub mod solver;
pub mod types;

pub use expr::{ConstraintExpr, LinearExpr, Relation};
pub use ids::{ConstraintId, VariableId};
pub use model::{Model, ModelError};
pub use solver::{Solution, SolverError, SolverStatus};
pub use types::{Bounds, Constraint, Objective, Sense, VarKind, Variable};
