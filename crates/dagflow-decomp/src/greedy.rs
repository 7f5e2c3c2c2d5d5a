//! Max-bottleneck greedy decomposition.
//!
//! Repeatedly takes the path whose smallest remaining flow is largest and
//! subtracts that value along it. The result is a valid decomposition and
//! gives an upper bound on the minimum number of paths.

use std::time::Instant;

use dagflow_graph::{EdgeIx, NodeIx};
use tracing::debug;

use crate::instance::Instance;

/// Paths as base node sequences with their weights.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GreedyPaths {
    pub paths: Vec<Vec<NodeIx>>,
    pub weights: Vec<f64>,
    pub duration_ms: f64,
}

/// Decompose `flows` over the base graph, or `None` when flow remains that
/// no path can carry.
///
/// A path starts at a node without in-edges and ends at a node without
/// out-edges. Bottlenecks at or below `tolerance` end the loop.
pub(crate) fn max_bottleneck_paths(
    instance: &Instance,
    flows: &[f64],
    tolerance: f64,
) -> Option<GreedyPaths> {
    let started = Instant::now();
    let graph = instance.st_graph();
    let order = graph
        .topological_order()
        .iter()
        .copied()
        .filter(|&v| graph.is_base_node(v))
        .collect::<Vec<_>>();
    let base_in = |v: NodeIx| {
        graph
            .in_edges(v)
            .iter()
            .copied()
            .filter(|&e| graph.is_base(e))
            .collect::<Vec<_>>()
    };
    let has_base_out = |v: NodeIx| graph.out_edges(v).iter().any(|&e| graph.is_base(e));

    let mut residual = flows.to_vec();
    let mut paths = Vec::new();
    let mut weights = Vec::new();

    // Each round drives at least one edge to zero.
    for _ in 0..=residual.len() {
        let mut bottleneck = vec![0.0_f64; graph.num_nodes()];
        let mut via: Vec<Option<EdgeIx>> = vec![None; graph.num_nodes()];
        let mut best: Option<(NodeIx, f64)> = None;

        for &v in &order {
            let ins = base_in(v);
            if ins.is_empty() {
                bottleneck[v] = f64::INFINITY;
                continue;
            }
            for e in ins {
                let through = bottleneck[graph.tail(e)].min(residual[e]);
                if via[v].is_none() || through > bottleneck[v] {
                    bottleneck[v] = through;
                    via[v] = Some(e);
                }
            }
            if !has_base_out(v) && best.is_none_or(|(_, b)| bottleneck[v] > b) {
                best = Some((v, bottleneck[v]));
            }
        }

        let Some((end, value)) = best.filter(|&(_, b)| b > tolerance) else {
            break;
        };

        let mut path = vec![end];
        let mut v = end;
        while let Some(e) = via[v] {
            residual[e] -= value;
            v = graph.tail(e);
            path.push(v);
        }
        path.reverse();
        paths.push(path);
        weights.push(value);
    }

    let remaining = residual.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()));
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        component = "greedy",
        operation = "max_bottleneck",
        status = if remaining <= tolerance { "success" } else { "incomplete" },
        paths = paths.len(),
        remaining,
        duration_ms,
        "Ran greedy decomposition"
    );

    (remaining <= tolerance).then_some(GreedyPaths {
        paths,
        weights,
        duration_ms,
    })
}
