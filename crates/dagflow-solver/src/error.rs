//! Configuration errors.

/// Rejected solver configuration values.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverConfigError {
    /// Thread count must be at least one.
    InvalidThreads { threads: u32 },
    /// Time limit must be finite and positive.
    InvalidTimeLimit { seconds: f64 },
    /// Tolerance must lie in `[1e-9, 1)`.
    InvalidTolerance { tolerance: f64 },
    /// Unrecognized presolve mode name.
    UnknownPresolve(String),
    /// Unrecognized external solver name.
    UnknownSolver(String),
}

impl SolverConfigError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            SolverConfigError::InvalidThreads { .. } => "CONFIG_INVALID_THREADS",
            SolverConfigError::InvalidTimeLimit { .. } => "CONFIG_INVALID_TIME_LIMIT",
            SolverConfigError::InvalidTolerance { .. } => "CONFIG_INVALID_TOLERANCE",
            SolverConfigError::UnknownPresolve(_) => "CONFIG_UNKNOWN_PRESOLVE",
            SolverConfigError::UnknownSolver(_) => "CONFIG_UNKNOWN_SOLVER",
        }
    }
}

impl std::fmt::Display for SolverConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverConfigError::InvalidThreads { threads } => write!(
                f,
                "[{}] threads must be at least 1 (got {})",
                self.code(),
                threads
            ),
            SolverConfigError::InvalidTimeLimit { seconds } => write!(
                f,
                "[{}] time limit must be finite and positive (got {})",
                self.code(),
                seconds
            ),
            SolverConfigError::InvalidTolerance { tolerance } => write!(
                f,
                "[{}] tolerance must be at least 1e-9 and below 1 (got {})",
                self.code(),
                tolerance
            ),
            SolverConfigError::UnknownPresolve(name) => write!(
                f,
                "[{}] presolve must be one of choose, on, off (got '{}')",
                self.code(),
                name
            ),
            SolverConfigError::UnknownSolver(name) => {
                write!(f, "[{}] unsupported external solver '{}'", self.code(), name)
            }
        }
    }
}

impl std::error::Error for SolverConfigError {}
