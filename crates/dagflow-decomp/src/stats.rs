//! Timing and size records of a decomposition run.

use serde::Serialize;

use crate::options::SafetyMode;

/// One model built and solved for a fixed number of paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub num_paths: usize,
    /// Solver status as reported by [`SolverStatus::as_str`](dagflow_core::SolverStatus::as_str).
    pub status: &'static str,
    pub variables: usize,
    pub constraints: usize,
    pub fixed_variables: usize,
    pub build_ms: f64,
    pub solve_ms: f64,
}

/// Everything measured while solving one problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveStatistics {
    pub graph_id: Option<String>,
    /// Safety mode applied, once the analysis ran.
    pub safety_mode: Option<SafetyMode>,
    pub safe_lists: usize,
    pub pinned_lists: usize,
    pub antichain_weight: u64,
    pub safety_ms: f64,
    /// Lower bound on the number of paths, when one was computed.
    pub lower_bound: Option<usize>,
    /// Paths in the greedy decomposition, when the greedy ran.
    pub greedy_paths: Option<usize>,
    pub greedy_ms: f64,
    /// Set when the greedy result was returned without solving a model.
    pub greedy_accepted: bool,
    pub attempts: Vec<Attempt>,
    pub total_ms: f64,
}

impl SolveStatistics {
    pub(crate) fn new(graph_id: Option<&str>) -> Self {
        Self {
            graph_id: graph_id.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn solve_ms(&self) -> f64 {
        self.attempts.iter().map(|a| a.solve_ms).sum()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_time_sums_attempts() {
        let mut stats = SolveStatistics::new(Some("g1"));
        for (k, solve_ms) in [(1, 2.0), (2, 3.5)] {
            stats.attempts.push(Attempt {
                num_paths: k,
                status: "infeasible",
                variables: 0,
                constraints: 0,
                fixed_variables: 0,
                build_ms: 0.0,
                solve_ms,
            });
        }
        assert_eq!(stats.solve_ms(), 5.5);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["graph_id"], "g1");
        assert!(json["safety_mode"].is_null());
        assert_eq!(json["attempts"][1]["num_paths"], 2);
    }
}
