//! Linear expressions and the constraints built from them.
//!
//! - `linear`: LinearExpr: weighted variable terms plus a constant
//! - `constraint`: ConstraintExpr: expression, relation and right-hand side

pub mod constraint;
pub mod linear;

pub use constraint::{ConstraintExpr, Relation};
pub use linear::LinearExpr;
