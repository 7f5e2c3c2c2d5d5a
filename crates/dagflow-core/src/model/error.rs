//! Model error types.

use crate::ids::{ConstraintId, VariableId};

/// Errors that can occur during model operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model has no variables
    EmptyModel,
    /// Invalid variable ID
    InvalidVariableId(VariableId),
    /// Invalid variable bounds
    InvalidVariableBounds { lower: f64, upper: f64 },
    /// Invalid constraint ID
    InvalidConstraintId(ConstraintId),
    /// Invalid constraint bounds
    InvalidConstraintBounds { lower: f64, upper: f64 },
    /// Coefficient is NaN or infinite
    InvalidCoefficient { coefficient: f64 },
    /// No objective set
    NoObjective,
    /// Product linearization needs a finite, non-negative big-M bound
    InvalidProductBound { upper: f64 },
    /// Product linearization needs a binary factor
    NonBinaryFactor(VariableId),
}

impl ModelError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::EmptyModel => "MODEL_EMPTY",
            ModelError::InvalidVariableId(_) => "VARIABLE_INVALID_ID",
            ModelError::InvalidVariableBounds { .. } => "VARIABLE_INVALID_BOUNDS",
            ModelError::InvalidConstraintId(_) => "CONSTRAINT_INVALID_ID",
            ModelError::InvalidConstraintBounds { .. } => "CONSTRAINT_INVALID_BOUNDS",
            ModelError::InvalidCoefficient { .. } => "COEFFICIENT_INVALID",
            ModelError::NoObjective => "OBJECTIVE_MISSING",
            ModelError::InvalidProductBound { .. } => "PRODUCT_INVALID_BOUND",
            ModelError::NonBinaryFactor(_) => "PRODUCT_NON_BINARY_FACTOR",
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::EmptyModel => write!(f, "[{}] Model has no variables", self.code()),
            ModelError::InvalidVariableId(id) => write!(
                f,
                "[{}] Variable ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::InvalidVariableBounds { lower, upper } => write!(
                f,
                "[{}] Variable bounds invalid: lower ({}) > upper ({})",
                self.code(),
                lower,
                upper
            ),
            ModelError::InvalidConstraintId(id) => write!(
                f,
                "[{}] Constraint ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::InvalidConstraintBounds { lower, upper } => write!(
                f,
                "[{}] Constraint bounds invalid: lower ({}) > upper ({})",
                self.code(),
                lower,
                upper
            ),
            ModelError::InvalidCoefficient { coefficient } => write!(
                f,
                "[{}] Coefficient must be finite (got {})",
                self.code(),
                coefficient
            ),
            ModelError::NoObjective => {
                write!(f, "[{}] Model has no objective defined", self.code())
            }
            ModelError::InvalidProductBound { upper } => write!(
                f,
                "[{}] Product bound must be finite and non-negative (got {})",
                self.code(),
                upper
            ),
            ModelError::NonBinaryFactor(id) => write!(
                f,
                "[{}] Variable ID {} is not binary and cannot gate a product",
                self.code(),
                id.inner()
            ),
        }
    }
}

impl std::error::Error for ModelError {}
