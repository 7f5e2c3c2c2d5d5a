//! `k` weighted paths where every path carries a slack, minimizing total slack.
//!
//! On each counted edge the gap between the flow value and the weights of
//! the paths through it, scaled by the edge's error factor, is at most the
//! summed slack of those paths.

use std::collections::BTreeMap;
use std::time::Instant;

use dagflow_core::{LinearExpr, Sense, VarKind, VariableId};
use dagflow_graph::{EdgeIx, FlowGraph, NodeIx};
use tracing::info;

use crate::error::DecompError;
use crate::instance::Instance;
use crate::model::PathModel;
use crate::objectives::{Outcome, PathObjective, analyze_safety, solve_with_paths};
use crate::options::{DecompositionConfig, WeightType};
use crate::solution::{SlackDecomposition, round_weights};
use crate::stats::SolveStatistics;
use crate::verify::{SOLUTION_TOLERANCE, check_slack};

#[derive(Debug)]
struct SlackEncoding {
    weights: Vec<VariableId>,
    slacks: Vec<VariableId>,
}

#[derive(Debug)]
struct MinPathErrorObjective<'p> {
    instance: &'p Instance,
    flows: &'p [f64],
    /// Error factor per base edge; 0 leaves the edge unconstrained.
    scaling: &'p [f64],
    weight_type: WeightType,
}

impl MinPathErrorObjective<'_> {
    fn constrained_edges(&self) -> impl Iterator<Item = EdgeIx> + '_ {
        self.instance
            .counted_edges()
            .filter(|&e| self.scaling[e] > 0.0)
    }
}

impl PathObjective for MinPathErrorObjective<'_> {
    type Encoding = SlackEncoding;
    type Solution = SlackDecomposition;

    fn name(&self) -> &'static str {
        "k_min_path_error"
    }

    fn instance(&self) -> &Instance {
        self.instance
    }

    /// An uncovered edge with positive flow and a positive error factor would
    /// need slack from paths that do not use it, which is impossible.
    fn trusted_edges(&self) -> Vec<EdgeIx> {
        self.constrained_edges()
            .filter(|&e| self.flows[e] > 0.0)
            .collect()
    }

    fn encode(&self, model: &mut PathModel<'_>) -> Result<Self::Encoding, DecompError> {
        let k = model.k();
        let max_flow = self
            .instance
            .counted_edges()
            .map(|e| self.flows[e])
            .fold(0.0, f64::max);
        let upper = k as f64 * max_flow;
        let kind = match self.weight_type {
            WeightType::Integer => VarKind::Integer,
            WeightType::Continuous => VarKind::Continuous,
        };
        let weights = (0..k)
            .map(|_| model.session_mut().create_variable(kind, 0.0, upper))
            .collect::<Result<Vec<_>, _>>()?;
        let slacks = (0..k)
            .map(|_| model.session_mut().create_variable(kind, 0.0, upper))
            .collect::<Result<Vec<_>, _>>()?;

        let edges = self.constrained_edges().collect::<Vec<_>>();
        for e in edges {
            let scale = self.scaling[e];
            let mut carried = LinearExpr::new();
            let mut slack = LinearExpr::new();
            for (i, (&w, &rho)) in weights.iter().zip(&slacks).enumerate() {
                let x = model.edge_var(e, i);
                let pi = model.add_product(x, w, upper)?;
                let gamma = model.add_product(x, rho, upper)?;
                carried.push_term(pi, scale);
                slack.push_term(gamma, 1.0);
            }
            let target = scale * self.flows[e];
            let session = model.session_mut();
            session.add_linear_constraint((carried.clone() + slack.clone()).ge_scalar(target))?;
            session.add_linear_constraint((carried - slack).le_scalar(target))?;
        }

        model
            .session_mut()
            .set_objective(LinearExpr::sum_of(slacks.iter().copied()), Sense::Minimize)?;
        Ok(SlackEncoding { weights, slacks })
    }

    fn extract(
        &self,
        model: &PathModel<'_>,
        encoding: &Self::Encoding,
        paths: Vec<Vec<String>>,
    ) -> Result<Self::Solution, DecompError> {
        let read = |vars: &[VariableId]| {
            vars.iter()
                .map(|&v| model.value(v))
                .collect::<Result<Vec<_>, _>>()
        };
        let mut weights = read(&encoding.weights)?;
        let mut slacks = read(&encoding.slacks)?;
        if self.weight_type == WeightType::Integer {
            round_weights(&mut weights);
            round_weights(&mut slacks);
        }
        Ok(SlackDecomposition {
            paths,
            weights,
            slacks,
        })
    }

    fn verify(&self, nodes: &[Vec<NodeIx>], solution: &Self::Solution) -> Result<(), DecompError> {
        check_slack(
            self.instance,
            self.flows,
            self.scaling,
            nodes,
            &solution.weights,
            &solution.slacks,
            SOLUTION_TOLERANCE,
        )
    }
}

/// Fit weighted paths to an inexact flow, giving each path a slack and
/// minimizing the sum of slacks.
#[derive(Debug)]
pub struct KMinPathError {
    instance: Instance,
    flows: Vec<f64>,
    scaling: Vec<f64>,
    k: usize,
    config: DecompositionConfig,
    stats: SolveStatistics,
}

impl KMinPathError {
    /// Without `k`, the number of paths is the width of the graph restricted
    /// to non-ignored edges.
    pub fn new(
        graph: &FlowGraph,
        k: Option<usize>,
        config: DecompositionConfig,
    ) -> Result<Self, DecompError> {
        let instance = Instance::new(graph, &config)?;
        let flows = instance.checked_flows()?;
        let k = match k {
            Some(0) => return Err(DecompError::InvalidPathCount(0)),
            Some(k) => k,
            None => {
                let counted = instance.counted_edges().collect::<Vec<_>>();
                let width = instance.st_graph().width(&counted);
                usize::try_from(width).unwrap_or(usize::MAX).max(1)
            }
        };
        let scaling = vec![1.0; instance.st_graph().num_base_edges()];
        let stats = SolveStatistics::new(instance.graph_id());
        Ok(Self {
            instance,
            flows,
            scaling,
            k,
            config,
            stats,
        })
    }

    /// Per-edge error factors in `[0, 1]` keyed by `(tail, head)` of the input
    /// graph. Missing edges keep factor 1; factor 0 drops the edge's constraint.
    pub fn with_error_scaling(
        mut self,
        scaling: &BTreeMap<(String, String), f64>,
    ) -> Result<Self, DecompError> {
        for ((tail, head), &value) in scaling {
            if !(0.0..=1.0).contains(&value) {
                return Err(DecompError::InvalidErrorScaling {
                    tail: tail.clone(),
                    head: head.clone(),
                    value,
                });
            }
            let e = self.instance.resolve_edge(tail, head)?;
            self.scaling[e] = value;
        }
        Ok(self)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn solve(&mut self) -> Result<Outcome<SlackDecomposition>, DecompError> {
        let started = Instant::now();
        self.stats = SolveStatistics::new(self.instance.graph_id());
        let objective = MinPathErrorObjective {
            instance: &self.instance,
            flows: &self.flows,
            scaling: &self.scaling,
            weight_type: self.config.weight_type,
        };
        let safety = analyze_safety(&objective, &self.config, &mut self.stats);
        let outcome = solve_with_paths(&objective, self.k, &safety, &self.config, &mut self.stats)?;

        self.stats.total_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            component = "decomp",
            operation = "k_min_path_error",
            status = outcome.status_str(),
            graph_id = self.instance.graph_id().unwrap_or(""),
            num_paths = self.k,
            total_slack = outcome.solution().map(SlackDecomposition::total_slack),
            duration_ms = self.stats.total_ms,
            "Min path error finished"
        );
        Ok(outcome)
    }

    pub fn statistics(&self) -> &SolveStatistics {
        &self.stats
    }
}
