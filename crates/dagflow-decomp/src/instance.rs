//! Input graph and configuration resolved into index space.

use std::collections::HashSet;

use dagflow_graph::{EdgeIx, FlowGraph, NodeExpandedGraph, NodeIx, StGraph};
use tracing::debug;

use crate::error::DecompError;
use crate::options::{Coverage, DecompositionConfig, FlowOrigin, Subpath};

/// A graph ready for path encoding.
///
/// Edge-indexed vectors cover the base edges of [`StGraph`] only.
#[derive(Debug, Clone)]
pub struct Instance {
    pub(crate) graph: FlowGraph,
    pub(crate) st: StGraph,
    pub(crate) expansion: Option<NodeExpandedGraph>,
    /// Raw flow attribute per base edge.
    pub(crate) flow: Vec<Option<f64>>,
    pub(crate) ignored: Vec<bool>,
    /// Edge lengths, present when a length attribute is configured. Missing values count as 1.
    pub(crate) lengths: Option<Vec<f64>>,
    pub(crate) subpaths: Vec<Vec<EdgeIx>>,
    pub(crate) coverage: Coverage,
    pub(crate) flow_attr: String,
}

fn nodes_to_edges(nodes: &[String]) -> Vec<(String, String)> {
    nodes
        .windows(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

fn resolve_edges(
    graph: &FlowGraph,
    edges: &[(String, String)],
) -> Result<Vec<EdgeIx>, DecompError> {
    edges
        .iter()
        .map(|(u, v)| {
            graph
                .edge_between(u, v)
                .ok_or_else(|| DecompError::UnknownSubpathEdge {
                    tail: u.clone(),
                    head: v.clone(),
                })
        })
        .collect()
}

impl Instance {
    /// Resolve a configuration against a graph.
    ///
    /// Node-weighted input is expanded here; all later stages see edges only.
    pub fn new(original: &FlowGraph, config: &DecompositionConfig) -> Result<Self, DecompError> {
        config.validate()?;

        let (graph, expansion, mut ignore_labels, subpath_edges) = match config.flow_origin {
            FlowOrigin::Edge => {
                let subpaths = config
                    .subpaths
                    .iter()
                    .map(|subpath| match subpath {
                        Subpath::Edges(edges) => edges.clone(),
                        Subpath::Nodes(nodes) => nodes_to_edges(nodes),
                    })
                    .collect::<Vec<_>>();
                (
                    original.clone(),
                    None,
                    config.edges_to_ignore.clone(),
                    subpaths,
                )
            }
            FlowOrigin::Node => {
                let expanded = NodeExpandedGraph::new(original)?;
                let subpaths = config
                    .subpaths
                    .iter()
                    .map(|subpath| match subpath {
                        Subpath::Edges(edges) => expanded.expand_edge_subpath(edges),
                        Subpath::Nodes(nodes) => expanded.expand_node_subpath(nodes),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let mut ignore = expanded.edges_to_ignore();
                for (u, v) in &config.edges_to_ignore {
                    ignore.push(expanded.connector_edge(u, v)?);
                }
                (expanded.graph().clone(), Some(expanded), ignore, subpaths)
            }
        };
        ignore_labels.sort();
        ignore_labels.dedup();

        let st = StGraph::with_endpoints(&graph, &config.additional_starts, &config.additional_ends)?;

        let mut ignored = vec![false; graph.num_edges()];
        for (u, v) in &ignore_labels {
            ignored[graph.require_edge(u, v)?] = true;
        }

        let flow = (0..graph.num_edges())
            .map(|e| graph.edge_attr(e, &config.flow_attr))
            .collect::<Vec<_>>();

        let lengths = config.edge_length_attr.as_ref().map(|attr| {
            (0..graph.num_edges())
                .map(|e| graph.edge_attr(e, attr).unwrap_or(1.0))
                .collect::<Vec<_>>()
        });

        let mut subpaths = Vec::with_capacity(subpath_edges.len());
        for (index, edges) in subpath_edges.iter().enumerate() {
            if edges.is_empty() {
                return Err(DecompError::EmptySubpath(index));
            }
            subpaths.push(resolve_edges(&graph, edges)?);
        }

        debug!(
            component = "decomp",
            operation = "prepare_instance",
            status = "success",
            graph_id = graph.id().unwrap_or(""),
            node_mode = expansion.is_some(),
            base_edges = graph.num_edges(),
            ignored_edges = ignored.iter().filter(|&&i| i).count(),
            subpaths = subpaths.len(),
            "Prepared decomposition instance"
        );

        Ok(Self {
            graph,
            st,
            expansion,
            flow,
            ignored,
            lengths,
            subpaths,
            coverage: config.coverage,
            flow_attr: config.flow_attr.clone(),
        })
    }

    pub fn st_graph(&self) -> &StGraph {
        &self.st
    }

    pub fn graph_id(&self) -> Option<&str> {
        self.graph.id()
    }

    pub fn is_ignored(&self, edge: EdgeIx) -> bool {
        self.ignored.get(edge).copied().unwrap_or(true)
    }

    /// Length of an edge; synthetic edges and unset lengths count as 1.
    pub fn length(&self, edge: EdgeIx) -> f64 {
        self.lengths
            .as_ref()
            .and_then(|lengths| lengths.get(edge).copied())
            .unwrap_or(1.0)
    }

    pub fn has_lengths(&self) -> bool {
        self.lengths.is_some()
    }

    /// Base edges that are not ignored.
    pub fn counted_edges(&self) -> impl Iterator<Item = EdgeIx> + '_ {
        (0..self.st.num_base_edges()).filter(|&e| !self.ignored[e])
    }

    /// Base edge for a `(tail, head)` pair of the input graph.
    ///
    /// For node-weighted input `(v, v)` names the edge carrying the weight of
    /// `v`, and any other pair the connector between the two nodes.
    pub(crate) fn resolve_edge(&self, tail: &str, head: &str) -> Result<EdgeIx, DecompError> {
        let edge = match &self.expansion {
            Some(expanded) => {
                let (u, v) = if tail == head {
                    expanded.node_edge(tail)?
                } else {
                    expanded.connector_edge(tail, head)?
                };
                self.graph.require_edge(&u, &v)?
            }
            None => self.graph.require_edge(tail, head)?,
        };
        Ok(edge)
    }

    pub(crate) fn edge_labels(&self, edge: EdgeIx) -> (String, String) {
        let u = self.st.label(self.st.tail(edge)).to_string();
        let v = self.st.label(self.st.head(edge)).to_string();
        (u, v)
    }

    /// Flow of every counted edge, validated present and non-negative.
    ///
    /// Ignored edges get 0.
    pub(crate) fn checked_flows(&self) -> Result<Vec<f64>, DecompError> {
        let mut flows = vec![0.0; self.st.num_base_edges()];
        for e in self.counted_edges() {
            let (tail, head) = self.edge_labels(e);
            let value = self.flow[e].ok_or_else(|| DecompError::MissingFlowAttribute {
                tail: tail.clone(),
                head: head.clone(),
                attr: self.flow_attr.clone(),
            })?;
            if value < 0.0 {
                return Err(DecompError::NegativeFlow { tail, head, value });
            }
            flows[e] = value;
        }
        Ok(flows)
    }

    /// Inflow equals outflow at every node with both in- and out-edges.
    ///
    /// Additional endpoints and nodes touching an ignored edge are exempt.
    pub(crate) fn check_conservation(&self, flows: &[f64], tolerance: f64) -> Result<(), DecompError> {
        let exempt = self
            .st
            .additional_starts()
            .iter()
            .chain(self.st.additional_ends())
            .copied()
            .collect::<HashSet<NodeIx>>();

        for v in 0..self.graph.num_nodes() {
            let ins = self.graph.in_edges(v);
            let outs = self.graph.out_edges(v);
            if ins.is_empty() || outs.is_empty() || exempt.contains(&v) {
                continue;
            }
            if ins.iter().chain(outs).any(|&e| self.ignored[e]) {
                continue;
            }
            let inflow = ins.iter().map(|&e| flows[e]).sum::<f64>();
            let outflow = outs.iter().map(|&e| flows[e]).sum::<f64>();
            if (inflow - outflow).abs() > tolerance {
                return Err(DecompError::FlowConservation {
                    node: self.graph.label(v).to_string(),
                    inflow,
                    outflow,
                });
            }
        }
        Ok(())
    }

    /// Base edges with positive flow that are not ignored.
    pub(crate) fn positive_flow_edges(&self, flows: &[f64]) -> Vec<EdgeIx> {
        self.counted_edges().filter(|&e| flows[e] > 0.0).collect()
    }

    /// Labels of a node path, stripped of the source and sink and condensed
    /// back to original labels for node-weighted input.
    pub fn path_labels(&self, nodes: &[NodeIx]) -> Vec<String> {
        let labels = self.st.path_labels(nodes);
        match &self.expansion {
            Some(expanded) => expanded.condense_path(&labels),
            None => labels,
        }
    }

    /// Upper bound on the length of any source-to-sink path.
    pub(crate) fn length_bound(&self) -> f64 {
        match &self.lengths {
            Some(lengths) => lengths.iter().sum::<f64>() + 2.0,
            None => self.st.num_nodes() as f64,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn chain() -> FlowGraph {
        let mut g = FlowGraph::new();
        g.add_weighted_edge("a", "b", "flow", 3.0).unwrap();
        g.add_weighted_edge("b", "c", "flow", 3.0).unwrap();
        g
    }

    #[test]
    fn test_resolves_node_subpaths() {
        let config = DecompositionConfig::new("flow").with_subpaths(vec![Subpath::Nodes(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ])]);
        let inst = Instance::new(&chain(), &config).unwrap();
        assert_eq!(inst.subpaths, vec![vec![0, 1]]);
    }

    #[test]
    fn test_unknown_subpath_edge() {
        let config = DecompositionConfig::new("flow").with_subpaths(vec![Subpath::Edges(vec![(
            "a".to_string(),
            "c".to_string(),
        )])]);
        assert_eq!(
            Instance::new(&chain(), &config).unwrap_err().code(),
            "DECOMP_UNKNOWN_SUBPATH_EDGE"
        );
    }

    #[test]
    fn test_missing_and_negative_flow() {
        let mut g = chain();
        g.add_edge("c", "d").unwrap();
        let inst = Instance::new(&g, &DecompositionConfig::new("flow")).unwrap();
        assert_eq!(inst.checked_flows().unwrap_err().code(), "DECOMP_MISSING_FLOW");

        let config = DecompositionConfig::new("flow")
            .with_edges_to_ignore(vec![("c".to_string(), "d".to_string())]);
        let inst = Instance::new(&g, &config).unwrap();
        assert_eq!(inst.checked_flows().unwrap(), vec![3.0, 3.0, 0.0]);

        let mut g = chain();
        g.add_weighted_edge("c", "d", "flow", -1.0).unwrap();
        let inst = Instance::new(&g, &DecompositionConfig::new("flow")).unwrap();
        assert_eq!(inst.checked_flows().unwrap_err().code(), "DECOMP_NEGATIVE_FLOW");
    }

    #[test]
    fn test_conservation() {
        let mut g = chain();
        g.add_weighted_edge("b", "d", "flow", 1.0).unwrap();
        let inst = Instance::new(&g, &DecompositionConfig::new("flow")).unwrap();
        let flows = inst.checked_flows().unwrap();
        let err = inst.check_conservation(&flows, 1e-9).unwrap_err();
        assert_eq!(
            err,
            DecompError::FlowConservation {
                node: "b".to_string(),
                inflow: 3.0,
                outflow: 4.0
            }
        );

        let config = DecompositionConfig::new("flow").with_additional_ends(vec!["b".to_string()]);
        let inst = Instance::new(&g, &config).unwrap();
        assert!(inst.check_conservation(&flows, 1e-9).is_ok());
    }

    #[test]
    fn test_node_mode_ignores_connectors() {
        let mut g = chain();
        for v in ["a", "b", "c"] {
            g.set_node_attr(v, "w", 2.0).unwrap();
        }
        let config = DecompositionConfig::new("w").with_flow_origin(FlowOrigin::Node);
        let inst = Instance::new(&g, &config).unwrap();
        assert_eq!(inst.counted_edges().count(), 3);
        let flows = inst.checked_flows().unwrap();
        assert_eq!(flows.iter().sum::<f64>(), 6.0);
        let st = inst.st_graph();
        let path = [st.source(), 0, 1, 2, 3, 4, 5, st.sink()];
        assert_eq!(inst.path_labels(&path), vec!["a", "b", "c"]);
    }
}
