//! Node-weighted graphs rewritten as edge-weighted ones.
//!
//! Every node `v` becomes the edge `v.in -> v.out` carrying the node's
//! attributes. Every edge `(u, v)` becomes the connector `u.out -> v.in`
//! carrying the edge's attributes.

use std::collections::HashMap;

use tracing::debug;

use crate::digraph::FlowGraph;
use crate::error::GraphError;
use crate::{EdgeIx, NodeIx};

/// A [`FlowGraph`] with every node split into an edge.
#[derive(Debug, Clone)]
pub struct NodeExpandedGraph {
    graph: FlowGraph,
    /// Original label of every expanded node, by expanded index.
    origin: Vec<String>,
    /// Expanded edge of every original node, by original index.
    node_edges: Vec<EdgeIx>,
    /// Expanded connector of every original edge, by original index.
    connector_edges: Vec<EdgeIx>,
    lookup: HashMap<String, NodeIx>,
}

fn in_label(label: &str) -> String {
    format!("{label}.in")
}

fn out_label(label: &str) -> String {
    format!("{label}.out")
}

impl NodeExpandedGraph {
    pub fn new(original: &FlowGraph) -> Result<Self, GraphError> {
        let mut graph = match original.id() {
            Some(id) => FlowGraph::new().with_id(id),
            None => FlowGraph::new(),
        };
        let mut origin = Vec::with_capacity(2 * original.num_nodes());
        let mut node_edges = Vec::with_capacity(original.num_nodes());
        let mut lookup = HashMap::with_capacity(original.num_nodes());

        for (ix, label) in original.labels().iter().enumerate() {
            let tail = in_label(label);
            let head = out_label(label);
            let edge = graph.add_edge(&tail, &head)?;
            origin.push(label.clone());
            origin.push(label.clone());
            if let Some(attrs) = original.node_attrs(ix) {
                for (name, &value) in attrs {
                    graph.set_edge_attr(edge, name, value)?;
                }
            }
            node_edges.push(edge);
            lookup.insert(label.clone(), ix);
        }

        let mut connector_edges = Vec::with_capacity(original.num_edges());
        for edge in original.edges() {
            let tail = out_label(original.label(edge.tail));
            let head = in_label(original.label(edge.head));
            let ix = graph.add_edge(&tail, &head)?;
            for (name, &value) in &edge.attrs {
                graph.set_edge_attr(ix, name, value)?;
            }
            connector_edges.push(ix);
        }

        debug!(
            component = "graph",
            operation = "expand_nodes",
            status = "success",
            graph_id = original.id().unwrap_or(""),
            original_nodes = original.num_nodes(),
            expanded_edges = graph.num_edges(),
            "Expanded node-weighted graph"
        );

        Ok(Self {
            graph,
            origin,
            node_edges,
            connector_edges,
            lookup,
        })
    }

    /// The expanded, edge-weighted graph.
    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    /// Connector edges as `(tail, head)` labels; they carry no node weight.
    pub fn edges_to_ignore(&self) -> Vec<(String, String)> {
        self.connector_edges
            .iter()
            .filter_map(|&e| self.graph.edge_labels(e))
            .map(|(u, v)| (u.to_string(), v.to_string()))
            .collect()
    }

    /// Expanded edge standing for an original node.
    pub fn node_edge(&self, label: &str) -> Result<(String, String), GraphError> {
        let (tail, head) = self
            .lookup
            .get(label)
            .and_then(|&ix| self.graph.edge_labels(self.node_edges[ix]))
            .ok_or_else(|| GraphError::UnknownNode(label.to_string()))?;
        Ok((tail.to_string(), head.to_string()))
    }

    /// Expanded connector standing for an original edge.
    pub fn connector_edge(&self, tail: &str, head: &str) -> Result<(String, String), GraphError> {
        let connector = (out_label(tail), in_label(head));
        if self.graph.edge_between(&connector.0, &connector.1).is_none() {
            return Err(GraphError::UnknownEdge {
                tail: tail.to_string(),
                head: head.to_string(),
            });
        }
        Ok(connector)
    }

    /// Map a subpath given as original nodes to the expanded node edges.
    pub fn expand_node_subpath(&self, nodes: &[String]) -> Result<Vec<(String, String)>, GraphError> {
        nodes.iter().map(|v| self.node_edge(v)).collect()
    }

    /// Map a subpath given as original edges to the expanded connectors.
    pub fn expand_edge_subpath(
        &self,
        edges: &[(String, String)],
    ) -> Result<Vec<(String, String)>, GraphError> {
        edges
            .iter()
            .map(|(u, v)| self.connector_edge(u, v))
            .collect()
    }

    /// Collapse a path of expanded labels back to original labels.
    pub fn condense_path(&self, path: &[String]) -> Vec<String> {
        let mut condensed: Vec<String> = Vec::with_capacity(path.len() / 2 + 1);
        for label in path {
            let Some(ix) = self.graph.node_index(label) else {
                continue;
            };
            let original = &self.origin[ix];
            if condensed.last() != Some(original) {
                condensed.push(original.clone());
            }
        }
        condensed
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn weighted_nodes() -> FlowGraph {
        let mut g = FlowGraph::new().with_id("nodes");
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "c").unwrap();
        for (v, w) in [("a", 4.0), ("b", 4.0), ("c", 4.0)] {
            g.set_node_attr(v, "flow", w).unwrap();
        }
        g
    }

    #[test]
    fn test_node_attributes_move_to_node_edges() {
        let expanded = NodeExpandedGraph::new(&weighted_nodes()).unwrap();
        let g = expanded.graph();
        assert_eq!(g.num_nodes(), 6);
        assert_eq!(g.num_edges(), 5);
        let e = g.edge_between("b.in", "b.out").unwrap();
        assert_eq!(g.edge_attr(e, "flow"), Some(4.0));
        let c = g.edge_between("a.out", "b.in").unwrap();
        assert_eq!(g.edge_attr(c, "flow"), None);
        assert_eq!(g.id(), Some("nodes"));
    }

    #[test]
    fn test_connectors_are_ignored() {
        let expanded = NodeExpandedGraph::new(&weighted_nodes()).unwrap();
        assert_eq!(
            expanded.edges_to_ignore(),
            vec![
                ("a.out".to_string(), "b.in".to_string()),
                ("b.out".to_string(), "c.in".to_string())
            ]
        );
    }

    #[test]
    fn test_subpath_expansion() {
        let expanded = NodeExpandedGraph::new(&weighted_nodes()).unwrap();
        let by_nodes = expanded
            .expand_node_subpath(&["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(by_nodes[1], ("b.in".to_string(), "b.out".to_string()));

        let by_edges = expanded
            .expand_edge_subpath(&[("b".to_string(), "c".to_string())])
            .unwrap();
        assert_eq!(by_edges, vec![("b.out".to_string(), "c.in".to_string())]);

        assert!(expanded.expand_node_subpath(&["zz".to_string()]).is_err());
        assert!(
            expanded
                .expand_edge_subpath(&[("a".to_string(), "c".to_string())])
                .is_err()
        );
    }

    #[test]
    fn test_condense_path() {
        let expanded = NodeExpandedGraph::new(&weighted_nodes()).unwrap();
        let path = ["a.in", "a.out", "b.in", "b.out", "c.in", "c.out"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        assert_eq!(expanded.condense_path(&path), vec!["a", "b", "c"]);
    }
}
