//! Minimum flow decomposition: the fewest weighted paths reproducing a flow.
//!
//! Starts at the width of the positive-flow edges, which no decomposition
//! can beat, and solves a k-flow decomposition model for increasing `k`.
//! The greedy decomposition and the safety analysis are computed once and
//! reused by every attempt.

use std::time::Instant;

use dagflow_graph::FlowGraph;
use tracing::{debug, info};

use crate::error::DecompError;
use crate::instance::Instance;
use crate::objectives::{
    FlowObjective, Outcome, analyze_safety, greedy_decomposition, prepare_flow, solve_with_paths,
};
use crate::options::DecompositionConfig;
use crate::solution::Decomposition;
use crate::stats::SolveStatistics;

/// Decompose a flow into the minimum number of weighted paths.
#[derive(Debug)]
pub struct MinFlowDecomp {
    instance: Instance,
    flows: Vec<f64>,
    config: DecompositionConfig,
    lower_bound: usize,
    stats: SolveStatistics,
}

impl MinFlowDecomp {
    pub fn new(graph: &FlowGraph, config: DecompositionConfig) -> Result<Self, DecompError> {
        let (instance, flows) = prepare_flow(graph, &config)?;
        let positive = instance.positive_flow_edges(&flows);
        let width = instance.st_graph().width(&positive);
        let lower_bound = usize::try_from(width).unwrap_or(usize::MAX).max(1);
        let stats = SolveStatistics::new(instance.graph_id());
        Ok(Self {
            instance,
            flows,
            config,
            lower_bound,
            stats,
        })
    }

    /// Width of the positive-flow edges, at least 1.
    pub fn lower_bound(&self) -> usize {
        self.lower_bound
    }

    pub fn solve(&mut self) -> Result<Outcome<Decomposition>, DecompError> {
        let started = Instant::now();
        self.stats = SolveStatistics::new(self.instance.graph_id());
        self.stats.lower_bound = Some(self.lower_bound);

        let positive = self.instance.positive_flow_edges(&self.flows);
        if positive.is_empty() && self.instance.subpaths.is_empty() {
            let empty = Outcome::Solved(Decomposition {
                paths: Vec::new(),
                weights: Vec::new(),
            });
            return Ok(finish(
                &mut self.stats,
                &self.instance,
                self.lower_bound,
                started,
                empty,
                "empty",
            ));
        }

        let mut greedy =
            greedy_decomposition(&self.instance, &self.flows, &self.config, &mut self.stats)?;
        let objective = FlowObjective {
            instance: &self.instance,
            flows: &self.flows,
            weight_type: self.config.weight_type,
        };
        let mut safety = None;
        let upper_bound = self
            .lower_bound
            .max(positive.len() + self.instance.subpaths.len());

        for k in self.lower_bound..=upper_bound {
            if let Some(accepted) = greedy.take_if(|g| g.len() <= k) {
                self.stats.greedy_accepted = true;
                return Ok(finish(
                    &mut self.stats,
                    &self.instance,
                    self.lower_bound,
                    started,
                    Outcome::Solved(accepted),
                    "greedy",
                ));
            }
            let analysis = safety
                .get_or_insert_with(|| analyze_safety(&objective, &self.config, &mut self.stats));
            let outcome =
                solve_with_paths(&objective, k, analysis, &self.config, &mut self.stats)?;
            match outcome {
                Outcome::Infeasible => {
                    debug!(
                        component = "decomp",
                        operation = "min_flow_decomp",
                        status = "infeasible",
                        num_paths = k,
                        "No decomposition with this many paths"
                    );
                }
                outcome => {
                    return Ok(finish(
                        &mut self.stats,
                        &self.instance,
                        self.lower_bound,
                        started,
                        outcome,
                        "milp",
                    ));
                }
            }
        }
        Ok(finish(
            &mut self.stats,
            &self.instance,
            self.lower_bound,
            started,
            Outcome::Infeasible,
            "milp",
        ))
    }

    /// Statistics of the last [`solve`](Self::solve).
    pub fn statistics(&self) -> &SolveStatistics {
        &self.stats
    }
}

/// Record the total time and log the final outcome.
fn finish(
    stats: &mut SolveStatistics,
    instance: &Instance,
    lower_bound: usize,
    started: Instant,
    outcome: Outcome<Decomposition>,
    source: &'static str,
) -> Outcome<Decomposition> {
    stats.total_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(
        component = "decomp",
        operation = "min_flow_decomp",
        status = outcome.status_str(),
        graph_id = instance.graph_id().unwrap_or(""),
        lower_bound,
        num_paths = outcome.solution().map(Decomposition::len),
        attempts = stats.attempts.len(),
        source,
        duration_ms = stats.total_ms,
        "Minimum flow decomposition finished"
    );
    outcome
}
