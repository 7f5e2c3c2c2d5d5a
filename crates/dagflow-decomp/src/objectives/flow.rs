//! k-flow decomposition: `k` weighted paths reproducing the flow exactly.

use std::time::Instant;

use dagflow_core::{LinearExpr, Sense, VarKind, VariableId};
use dagflow_graph::{EdgeIx, FlowGraph, NodeIx};
use tracing::info;

use crate::error::DecompError;
use crate::greedy::max_bottleneck_paths;
use crate::instance::Instance;
use crate::model::PathModel;
use crate::objectives::{Outcome, PathObjective, analyze_safety, solve_with_paths};
use crate::options::{DecompositionConfig, WeightType};
use crate::solution::{Decomposition, round_weights};
use crate::stats::SolveStatistics;
use crate::verify::{SOLUTION_TOLERANCE, check_flow};

/// Allowed gap between inflow and outflow at an interior node.
pub(crate) const CONSERVATION_TOLERANCE: f64 = 1e-6;

/// Residual flow below this counts as decomposed.
const GREEDY_TOLERANCE: f64 = 1e-9;

/// Resolve the graph and check that its flow is non-negative and conserved.
pub(crate) fn prepare_flow(
    graph: &FlowGraph,
    config: &DecompositionConfig,
) -> Result<(Instance, Vec<f64>), DecompError> {
    let instance = Instance::new(graph, config)?;
    let flows = instance.checked_flows()?;
    instance.check_conservation(&flows, CONSERVATION_TOLERANCE)?;
    Ok((instance, flows))
}

/// Greedy decomposition of the whole flow, when the configuration lets the
/// greedy paths stand for a solution.
///
/// Subpath constraints, ignored edges and additional endpoints are not seen
/// by the greedy, so any of them disables it. A greedy result that does not
/// reproduce the flow is an error.
pub(crate) fn greedy_decomposition(
    instance: &Instance,
    flows: &[f64],
    config: &DecompositionConfig,
    stats: &mut SolveStatistics,
) -> Result<Option<Decomposition>, DecompError> {
    let applies = config.optimization.greedy
        && instance.subpaths.is_empty()
        && !instance.ignored.iter().any(|&i| i)
        && !instance.st_graph().has_additional_endpoints();
    if !applies {
        return Ok(None);
    }
    let Some(greedy) = max_bottleneck_paths(instance, flows, GREEDY_TOLERANCE) else {
        return Ok(None);
    };
    stats.greedy_paths = Some(greedy.paths.len());
    stats.greedy_ms = greedy.duration_ms;

    let mut weights = greedy.weights;
    if config.weight_type == WeightType::Integer {
        if weights.iter().any(|w| (w - w.round()).abs() > GREEDY_TOLERANCE) {
            return Ok(None);
        }
        round_weights(&mut weights);
    }
    check_flow(instance, flows, &greedy.paths, &weights, SOLUTION_TOLERANCE)?;
    Ok(Some(Decomposition {
        paths: greedy
            .paths
            .iter()
            .map(|nodes| instance.path_labels(nodes))
            .collect(),
        weights,
    }))
}

/// Weights `w_i` and products `pi[e][i] = x[e][i] * w_i` summing to the flow
/// of every counted edge.
#[derive(Debug)]
pub(crate) struct FlowObjective<'p> {
    pub instance: &'p Instance,
    pub flows: &'p [f64],
    pub weight_type: WeightType,
}

impl FlowObjective<'_> {
    fn max_flow(&self) -> f64 {
        self.instance
            .counted_edges()
            .map(|e| self.flows[e])
            .fold(0.0, f64::max)
    }
}

impl PathObjective for FlowObjective<'_> {
    type Encoding = Vec<VariableId>;
    type Solution = Decomposition;

    fn name(&self) -> &'static str {
        "k_flow_decomp"
    }

    fn instance(&self) -> &Instance {
        self.instance
    }

    fn trusted_edges(&self) -> Vec<EdgeIx> {
        self.instance.positive_flow_edges(self.flows)
    }

    fn encode(&self, model: &mut PathModel<'_>) -> Result<Self::Encoding, DecompError> {
        let upper = self.max_flow();
        let kind = match self.weight_type {
            WeightType::Integer => VarKind::Integer,
            WeightType::Continuous => VarKind::Continuous,
        };
        let weights = (0..model.k())
            .map(|_| model.session_mut().create_variable(kind, 0.0, upper))
            .collect::<Result<Vec<_>, _>>()?;

        for e in self.instance.counted_edges() {
            let mut carried = LinearExpr::new();
            for (i, &w) in weights.iter().enumerate() {
                let pi = model.add_product(model.edge_var(e, i), w, upper)?;
                carried.push_term(pi, 1.0);
            }
            model
                .session_mut()
                .add_linear_constraint(carried.eq_scalar(self.flows[e]))?;
        }

        model
            .session_mut()
            .set_objective(LinearExpr::new(), Sense::Minimize)?;
        Ok(weights)
    }

    fn extract(
        &self,
        model: &PathModel<'_>,
        encoding: &Self::Encoding,
        paths: Vec<Vec<String>>,
    ) -> Result<Self::Solution, DecompError> {
        let mut weights = encoding
            .iter()
            .map(|&w| model.value(w))
            .collect::<Result<Vec<_>, _>>()?;
        if self.weight_type == WeightType::Integer {
            round_weights(&mut weights);
        }
        Ok(Decomposition { paths, weights })
    }

    fn verify(&self, nodes: &[Vec<NodeIx>], solution: &Self::Solution) -> Result<(), DecompError> {
        check_flow(
            self.instance,
            self.flows,
            nodes,
            &solution.weights,
            SOLUTION_TOLERANCE,
        )
    }
}

/// Decompose a flow into exactly `k` weighted paths.
///
/// Every non-ignored edge must carry a non-negative flow value, and inflow
/// must equal outflow at every node with both in- and out-edges.
#[derive(Debug)]
pub struct KFlowDecomp {
    instance: Instance,
    flows: Vec<f64>,
    k: usize,
    config: DecompositionConfig,
    stats: SolveStatistics,
}

impl KFlowDecomp {
    pub fn new(graph: &FlowGraph, k: usize, config: DecompositionConfig) -> Result<Self, DecompError> {
        if k == 0 {
            return Err(DecompError::InvalidPathCount(k));
        }
        let (instance, flows) = prepare_flow(graph, &config)?;
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

    /// Solve, returning the greedy decomposition directly when it needs at
    /// most `k` paths.
    pub fn solve(&mut self) -> Result<Outcome<Decomposition>, DecompError> {
        let started = Instant::now();
        self.stats = SolveStatistics::new(self.instance.graph_id());

        let greedy =
            greedy_decomposition(&self.instance, &self.flows, &self.config, &mut self.stats)?
                .filter(|greedy| greedy.len() <= self.k);
        if let Some(greedy) = greedy {
            self.stats.greedy_accepted = true;
            self.stats.total_ms = started.elapsed().as_secs_f64() * 1000.0;
            info!(
                component = "decomp",
                operation = "k_flow_decomp",
                status = "success",
                graph_id = self.instance.graph_id().unwrap_or(""),
                num_paths = greedy.len(),
                source = "greedy",
                duration_ms = self.stats.total_ms,
                "Flow decomposition solved by greedy"
            );
            return Ok(Outcome::Solved(greedy));
        }

        let objective = FlowObjective {
            instance: &self.instance,
            flows: &self.flows,
            weight_type: self.config.weight_type,
        };
        let safety = analyze_safety(&objective, &self.config, &mut self.stats);
        let outcome = solve_with_paths(&objective, self.k, &safety, &self.config, &mut self.stats)?;

        self.stats.total_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            component = "decomp",
            operation = "k_flow_decomp",
            status = outcome.status_str(),
            graph_id = self.instance.graph_id().unwrap_or(""),
            num_paths = self.k,
            source = "milp",
            duration_ms = self.stats.total_ms,
            "Flow decomposition finished"
        );
        Ok(outcome)
    }

    /// Statistics of the last [`solve`](Self::solve).
    pub fn statistics(&self) -> &SolveStatistics {
        &self.stats
    }
}
