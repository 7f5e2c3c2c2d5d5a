//! Solver configuration types.

use std::str::FromStr;

use crate::error::SolverConfigError;

const DEFAULT_THREADS: u32 = 4;
const DEFAULT_TIME_LIMIT_SECONDS: f64 = 300.0;
const MIN_TOLERANCE: f64 = 1e-9;

/// Presolve mode forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presolve {
    /// Let the solver decide.
    #[default]
    Choose,
    On,
    Off,
}

impl Presolve {
    pub fn as_str(self) -> &'static str {
        match self {
            Presolve::Choose => "choose",
            Presolve::On => "on",
            Presolve::Off => "off",
        }
    }
}

impl FromStr for Presolve {
    type Err = SolverConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "choose" => Ok(Presolve::Choose),
            "on" => Ok(Presolve::On),
            "off" => Ok(Presolve::Off),
            _ => Err(SolverConfigError::UnknownPresolve(s.to_string())),
        }
    }
}

/// MILP solver that backs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExternalSolver {
    #[default]
    Highs,
}

impl ExternalSolver {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalSolver::Highs => "highs",
        }
    }
}

impl FromStr for ExternalSolver {
    type Err = SolverConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "highs" => Ok(ExternalSolver::Highs),
            _ => Err(SolverConfigError::UnknownSolver(s.to_string())),
        }
    }
}

/// Validated solve parameters.
///
/// Built once through [`SolverConfig::builder`] and never mutated afterwards;
/// every session created from it sees the same values.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    threads: u32,
    time_limit: f64,
    presolve: Presolve,
    log_to_console: bool,
    tolerance: f64,
    external_solver: ExternalSolver,
}

impl SolverConfig {
    /// Start from the defaults.
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder::default()
    }

    /// Number of solver threads.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Time limit in seconds for one solve.
    pub fn time_limit(&self) -> f64 {
        self.time_limit
    }

    pub fn presolve(&self) -> Presolve {
        self.presolve
    }

    pub fn log_to_console(&self) -> bool {
        self.log_to_console
    }

    /// Tolerance applied to MIP gaps and feasibility checks.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn external_solver(&self) -> ExternalSolver {
        self.external_solver
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            time_limit: DEFAULT_TIME_LIMIT_SECONDS,
            presolve: Presolve::default(),
            log_to_console: false,
            tolerance: MIN_TOLERANCE,
            external_solver: ExternalSolver::default(),
        }
    }
}

/// Builder for [`SolverConfig`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct SolverConfigBuilder {
    config: SolverConfig,
}

impl SolverConfigBuilder {
    /// Set the number of threads.
    pub fn with_threads(mut self, count: u32) -> Self {
        self.config.threads = count;
        self
    }

    /// Set the time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.config.time_limit = seconds;
        self
    }

    /// Set the presolve mode.
    pub fn with_presolve(mut self, presolve: Presolve) -> Self {
        self.config.presolve = presolve;
        self
    }

    /// Enable or disable console logging.
    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.config.log_to_console = enabled;
        self
    }

    /// Set the gap and feasibility tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Select the MILP solver.
    pub fn with_external_solver(mut self, solver: ExternalSolver) -> Self {
        self.config.external_solver = solver;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<SolverConfig, SolverConfigError> {
        let config = self.config;
        if config.threads == 0 {
            return Err(SolverConfigError::InvalidThreads {
                threads: config.threads,
            });
        }
        if !config.time_limit.is_finite() || config.time_limit <= 0.0 {
            return Err(SolverConfigError::InvalidTimeLimit {
                seconds: config.time_limit,
            });
        }
        if config.tolerance.is_nan() || config.tolerance < MIN_TOLERANCE || config.tolerance >= 1.0
        {
            return Err(SolverConfigError::InvalidTolerance {
                tolerance: config.tolerance,
            });
        }
        tracing::debug!(
            component = "config",
            operation = "build",
            status = "success",
            threads = config.threads,
            time_limit = config.time_limit,
            presolve = config.presolve.as_str(),
            tolerance = config.tolerance,
            solver = config.external_solver.as_str(),
            "Validated solver configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.threads(), 4);
        assert_eq!(config.time_limit(), 300.0);
        assert_eq!(config.presolve(), Presolve::Choose);
        assert!(!config.log_to_console());
        assert_eq!(config.tolerance(), 1e-9);
        assert_eq!(config.external_solver(), ExternalSolver::Highs);
        assert_eq!(SolverConfig::builder().build().unwrap(), config);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SolverConfig::builder()
            .with_threads(2)
            .with_time_limit(60.0)
            .with_presolve(Presolve::Off)
            .with_log_to_console(true)
            .with_tolerance(1e-6)
            .build()
            .unwrap();

        assert_eq!(config.threads(), 2);
        assert_eq!(config.time_limit(), 60.0);
        assert_eq!(config.presolve(), Presolve::Off);
        assert!(config.log_to_console());
        assert_eq!(config.tolerance(), 1e-6);
    }

    #[test]
    fn test_rejects_zero_threads() {
        let err = SolverConfig::builder().with_threads(0).build().unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID_THREADS");
    }

    #[test]
    fn test_rejects_bad_time_limit() {
        for seconds in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            let err = SolverConfig::builder()
                .with_time_limit(seconds)
                .build()
                .unwrap_err();
            assert_eq!(err.code(), "CONFIG_INVALID_TIME_LIMIT");
        }
    }

    #[test]
    fn test_rejects_tolerance_below_floor() {
        let err = SolverConfig::builder()
            .with_tolerance(1e-12)
            .build()
            .unwrap_err();
        assert!(err.to_string().starts_with("[CONFIG_INVALID_TOLERANCE]"));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("ON".parse::<Presolve>().unwrap(), Presolve::On);
        assert_eq!(
            "highs".parse::<ExternalSolver>().unwrap(),
            ExternalSolver::Highs
        );
        assert_eq!(
            "gurobi".parse::<ExternalSolver>().unwrap_err(),
            SolverConfigError::UnknownSolver("gurobi".to_string())
        );
    }
}
