//! `k` weighted paths minimizing the summed absolute error over the edges.

use std::time::Instant;

use dagflow_core::{LinearExpr, Sense, VarKind, VariableId};
use dagflow_graph::{EdgeIx, FlowGraph};
use tracing::info;

use crate::error::DecompError;
use crate::instance::Instance;
use crate::model::PathModel;
use crate::objectives::{Outcome, PathObjective, analyze_safety, solve_with_paths};
use crate::options::{DecompositionConfig, WeightType};
use crate::solution::{EdgeError, EdgeErrorDecomposition, round_weights};
use crate::stats::SolveStatistics;

#[derive(Debug)]
struct EdgeErrorEncoding {
    weights: Vec<VariableId>,
    errors: Vec<(EdgeIx, VariableId)>,
}

#[derive(Debug)]
struct LeastAbsObjective<'p> {
    instance: &'p Instance,
    flows: &'p [f64],
    weight_type: WeightType,
}

impl PathObjective for LeastAbsObjective<'_> {
    type Encoding = EdgeErrorEncoding;
    type Solution = EdgeErrorDecomposition;

    fn name(&self) -> &'static str {
        "k_least_abs_errors"
    }

    fn instance(&self) -> &Instance {
        self.instance
    }

    /// A positive-flow edge may be left to its error term, so no edge is
    /// guaranteed to be covered.
    fn trusted_edges(&self) -> Vec<EdgeIx> {
        Vec::new()
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

        let mut errors = Vec::new();
        let mut total_error = LinearExpr::new();
        for e in self.instance.counted_edges() {
            let mut carried = LinearExpr::new();
            for (i, &w) in weights.iter().enumerate() {
                let pi = model.add_product(model.edge_var(e, i), w, upper)?;
                carried.push_term(pi, 1.0);
            }
            let error = model
                .session_mut()
                .create_variable(VarKind::Continuous, 0.0, upper)?;
            // |f - carried| <= error
            let session = model.session_mut();
            session.add_linear_constraint(
                (carried.clone() + LinearExpr::var(error)).ge_scalar(self.flows[e]),
            )?;
            session.add_linear_constraint(
                (carried - LinearExpr::var(error)).le_scalar(self.flows[e]),
            )?;
            total_error.push_term(error, 1.0);
            errors.push((e, error));
        }

        model
            .session_mut()
            .set_objective(total_error, Sense::Minimize)?;
        Ok(EdgeErrorEncoding { weights, errors })
    }

    fn extract(
        &self,
        model: &PathModel<'_>,
        encoding: &Self::Encoding,
        paths: Vec<Vec<String>>,
    ) -> Result<Self::Solution, DecompError> {
        let mut weights = encoding
            .weights
            .iter()
            .map(|&w| model.value(w))
            .collect::<Result<Vec<_>, _>>()?;
        let mut values = encoding
            .errors
            .iter()
            .map(|&(_, var)| model.value(var))
            .collect::<Result<Vec<_>, _>>()?;
        if self.weight_type == WeightType::Integer {
            round_weights(&mut weights);
            round_weights(&mut values);
        }
        let edge_errors = encoding
            .errors
            .iter()
            .zip(values)
            .map(|(&(e, _), error)| {
                let (tail, head) = self.instance.edge_labels(e);
                EdgeError { tail, head, error }
            })
            .collect();
        Ok(EdgeErrorDecomposition {
            paths,
            weights,
            edge_errors,
        })
    }
}

/// Fit `k` weighted paths to a flow that need not be conserved, minimizing
/// `sum |f(e) - sum of weights of paths through e|` over non-ignored edges.
#[derive(Debug)]
pub struct KLeastAbsErrors {
    instance: Instance,
    flows: Vec<f64>,
    k: usize,
    config: DecompositionConfig,
    stats: SolveStatistics,
}

impl KLeastAbsErrors {
    pub fn new(graph: &FlowGraph, k: usize, config: DecompositionConfig) -> Result<Self, DecompError> {
        if k == 0 {
            return Err(DecompError::InvalidPathCount(k));
        }
        let instance = Instance::new(graph, &config)?;
        let flows = instance.checked_flows()?;
        let stats = SolveStatistics::new(instance.graph_id());
        Ok(Self {
            instance,
            flows,
            k,
            config,
            stats,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn solve(&mut self) -> Result<Outcome<EdgeErrorDecomposition>, DecompError> {
        let started = Instant::now();
        self.stats = SolveStatistics::new(self.instance.graph_id());
        let objective = LeastAbsObjective {
            instance: &self.instance,
            flows: &self.flows,
            weight_type: self.config.weight_type,
        };
        let safety = analyze_safety(&objective, &self.config, &mut self.stats);
        let outcome = solve_with_paths(&objective, self.k, &safety, &self.config, &mut self.stats)?;

        self.stats.total_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            component = "decomp",
            operation = "k_least_abs_errors",
            status = outcome.status_str(),
            graph_id = self.instance.graph_id().unwrap_or(""),
            num_paths = self.k,
            total_error = outcome.solution().map(EdgeErrorDecomposition::total_error),
            duration_ms = self.stats.total_ms,
            "Least absolute errors finished"
        );
        Ok(outcome)
    }

    pub fn statistics(&self) -> &SolveStatistics {
        &self.stats
    }
}
