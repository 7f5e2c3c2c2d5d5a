//! Post-solve checks of weighted paths against the edge values they fit.
//!
//! Paths are checked in index space, before they are turned into labels.
//! Each edge may drift by [`SOLUTION_TOLERANCE`] for every path through it.

use dagflow_graph::NodeIx;

use crate::error::DecompError;
use crate::instance::Instance;

/// Allowed drift per path crossing an edge.
pub(crate) const SOLUTION_TOLERANCE: f64 = 1e-3;

/// Weight, slack and path count summed over the paths through each base edge.
#[derive(Debug, Clone, PartialEq)]
struct EdgeLoads {
    weight: Vec<f64>,
    slack: Vec<f64>,
    paths: Vec<usize>,
}

fn edge_loads(
    instance: &Instance,
    paths: &[Vec<NodeIx>],
    weights: &[f64],
    slacks: Option<&[f64]>,
) -> Result<EdgeLoads, DecompError> {
    let graph = instance.st_graph();
    let num_edges = graph.num_base_edges();
    let mut loads = EdgeLoads {
        weight: vec![0.0; num_edges],
        slack: vec![0.0; num_edges],
        paths: vec![0; num_edges],
    };
    for (i, nodes) in paths.iter().enumerate() {
        let weight = weights.get(i).copied().unwrap_or(0.0);
        let slack = slacks.and_then(|s| s.get(i).copied()).unwrap_or(0.0);
        for pair in nodes.windows(2) {
            let Some(e) = graph.edge_between(pair[0], pair[1]) else {
                return Err(DecompError::InconsistentSolution(format!(
                    "path {i} steps from '{}' to '{}' without an edge",
                    graph.label(pair[0]),
                    graph.label(pair[1])
                )));
            };
            if graph.is_base(e) {
                loads.weight[e] += weight;
                loads.slack[e] += slack;
                loads.paths[e] += 1;
            }
        }
    }
    Ok(loads)
}

fn allowance(paths: usize, tolerance: f64) -> f64 {
    tolerance * paths.max(1) as f64
}

/// Path weights reproduce the flow of every counted edge.
pub(crate) fn check_flow(
    instance: &Instance,
    flows: &[f64],
    paths: &[Vec<NodeIx>],
    weights: &[f64],
    tolerance: f64,
) -> Result<(), DecompError> {
    let loads = edge_loads(instance, paths, weights, None)?;
    for e in instance.counted_edges() {
        let gap = (loads.weight[e] - flows[e]).abs();
        if gap > allowance(loads.paths[e], tolerance) {
            let (tail, head) = instance.edge_labels(e);
            return Err(DecompError::InconsistentSolution(format!(
                "paths carry {} on edge ({tail}, {head}) but its flow is {}",
                loads.weight[e], flows[e]
            )));
        }
    }
    Ok(())
}

/// The scaled gap on every constrained edge is within the summed slack of
/// the paths through it.
pub(crate) fn check_slack(
    instance: &Instance,
    flows: &[f64],
    scaling: &[f64],
    paths: &[Vec<NodeIx>],
    weights: &[f64],
    slacks: &[f64],
    tolerance: f64,
) -> Result<(), DecompError> {
    let loads = edge_loads(instance, paths, weights, Some(slacks))?;
    for e in instance.counted_edges().filter(|&e| scaling[e] > 0.0) {
        let gap = scaling[e] * (flows[e] - loads.weight[e]).abs();
        if gap > loads.slack[e] + allowance(loads.paths[e], tolerance) {
            let (tail, head) = instance.edge_labels(e);
            return Err(DecompError::InconsistentSolution(format!(
                "gap {gap} on edge ({tail}, {head}) exceeds the slack {} of its paths",
                loads.slack[e]
            )));
        }
    }
    Ok(())
}
