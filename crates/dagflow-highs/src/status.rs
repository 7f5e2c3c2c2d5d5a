//! Status conversions for the HiGHS integration.

use crate::ffi::HighsStatus;
use dagflow_core::SolverStatus;

pub(crate) fn highs_to_core_status(status: HighsStatus) -> SolverStatus {
    match status {
        HighsStatus::Optimal => SolverStatus::Optimal,
        HighsStatus::Infeasible => SolverStatus::Infeasible,
        HighsStatus::ReachedTimeLimit => SolverStatus::TimeLimitReached,
        HighsStatus::Unbounded
        | HighsStatus::UnboundedOrInfeasible
        | HighsStatus::ReachedIterationLimit
        | HighsStatus::Unknown => SolverStatus::Other,
    }
}

pub(crate) fn highs_status_string(status: HighsStatus) -> &'static str {
    match status {
        HighsStatus::Optimal => "optimal",
        HighsStatus::Infeasible => "infeasible",
        HighsStatus::Unbounded => "unbounded",
        HighsStatus::UnboundedOrInfeasible => "unbounded_or_infeasible",
        HighsStatus::ReachedTimeLimit => "time_limit",
        HighsStatus::ReachedIterationLimit => "iteration_limit",
        HighsStatus::Unknown => "unknown",
    }
}
