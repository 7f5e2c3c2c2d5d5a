use crate::ids::VariableId;

/// Optimization sense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

impl Sense {
    pub fn as_str(self) -> &'static str {
        match self {
            Sense::Minimize => "minimize",
            Sense::Maximize => "maximize",
        }
    }
}

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
    Continuous,
}

impl VarKind {
    pub fn is_integer(self) -> bool {
        !matches!(self, VarKind::Continuous)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Binary => "binary",
            VarKind::Integer => "integer",
            VarKind::Continuous => "continuous",
        }
    }
}

/// Bounds for a variable or constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Both bounds equal to `value`.
    pub fn fixed(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.lower.is_nan() && !self.upper.is_nan() && self.lower <= self.upper
    }
}

/// A decision variable with bounds and a domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    pub bounds: Bounds,
    pub kind: VarKind,
}

impl Variable {
    /// Create a binary variable with bounds [0, 1].
    pub fn binary() -> Self {
        Self {
            bounds: Bounds::new(0.0, 1.0),
            kind: VarKind::Binary,
        }
    }

    /// Create a continuous variable with specified bounds.
    pub fn continuous(bounds: Bounds) -> Self {
        Self {
            bounds,
            kind: VarKind::Continuous,
        }
    }

    /// Create an integer variable with specified bounds.
    pub fn integer(bounds: Bounds) -> Self {
        Self {
            bounds,
            kind: VarKind::Integer,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.kind.is_integer()
    }
}

/// A constraint row with lower and upper bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub bounds: Bounds,
}

/// Objective function with a sense and linear terms
#[derive(Debug, Clone, Default)]
pub struct Objective {
    pub sense: Option<Sense>,
    pub terms: Vec<(VariableId, f64)>,
}
