//! Labelled directed graph with numeric attributes.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::error::GraphError;
use crate::{EdgeIx, NodeIx};

/// A directed edge and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub tail: NodeIx,
    pub head: NodeIx,
    pub attrs: BTreeMap<String, f64>,
}

/// Directed graph over string labels.
///
/// Nodes and edges keep insertion order; indices are stable. At most one
/// edge exists per ordered pair and self loops are rejected.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    id: Option<String>,
    labels: Vec<String>,
    index: HashMap<String, NodeIx>,
    node_attrs: Vec<BTreeMap<String, f64>>,
    edges: Vec<Edge>,
    out_edges: Vec<Vec<EdgeIx>>,
    in_edges: Vec<Vec<EdgeIx>>,
    lookup: HashMap<(NodeIx, NodeIx), EdgeIx>,
}

fn check_finite(name: &str, value: f64) -> Result<(), GraphError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GraphError::InvalidAttribute {
            name: name.to_string(),
            value,
        })
    }
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identifier carried into logs and statistics.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Add a node, returning the existing index when the label is known.
    pub fn add_node(&mut self, label: impl Into<String>) -> NodeIx {
        let label = label.into();
        if let Some(&ix) = self.index.get(&label) {
            return ix;
        }
        let ix = self.labels.len();
        self.index.insert(label.clone(), ix);
        self.labels.push(label);
        self.node_attrs.push(BTreeMap::new());
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        ix
    }

    /// Add an edge, creating missing endpoints.
    pub fn add_edge(&mut self, tail: &str, head: &str) -> Result<EdgeIx, GraphError> {
        if tail == head {
            return Err(GraphError::SelfLoop(tail.to_string()));
        }
        let u = self.add_node(tail);
        let v = self.add_node(head);
        if self.lookup.contains_key(&(u, v)) {
            return Err(GraphError::DuplicateEdge {
                tail: tail.to_string(),
                head: head.to_string(),
            });
        }
        let ix = self.edges.len();
        self.edges.push(Edge {
            tail: u,
            head: v,
            attrs: BTreeMap::new(),
        });
        self.out_edges[u].push(ix);
        self.in_edges[v].push(ix);
        self.lookup.insert((u, v), ix);
        trace!(
            component = "graph",
            operation = "add_edge",
            status = "success",
            edge = ix,
            tail,
            head,
            "Added edge"
        );
        Ok(ix)
    }

    /// Add an edge carrying one attribute.
    pub fn add_weighted_edge(
        &mut self,
        tail: &str,
        head: &str,
        name: &str,
        value: f64,
    ) -> Result<EdgeIx, GraphError> {
        check_finite(name, value)?;
        let ix = self.add_edge(tail, head)?;
        self.edges[ix].attrs.insert(name.to_string(), value);
        Ok(ix)
    }

    pub fn set_edge_attr(&mut self, edge: EdgeIx, name: &str, value: f64) -> Result<(), GraphError> {
        check_finite(name, value)?;
        let edge = self
            .edges
            .get_mut(edge)
            .ok_or(GraphError::InvalidEdgeIndex(edge))?;
        edge.attrs.insert(name.to_string(), value);
        Ok(())
    }

    pub fn set_node_attr(&mut self, label: &str, name: &str, value: f64) -> Result<(), GraphError> {
        check_finite(name, value)?;
        let ix = self
            .node_index(label)
            .ok_or_else(|| GraphError::UnknownNode(label.to_string()))?;
        self.node_attrs[ix].insert(name.to_string(), value);
        Ok(())
    }

    pub fn num_nodes(&self) -> usize {
        self.labels.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn node_index(&self, label: &str) -> Option<NodeIx> {
        self.index.get(label).copied()
    }

    /// Label of a node index. Panics on an out-of-range index.
    pub fn label(&self, node: NodeIx) -> &str {
        &self.labels[node]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn edge(&self, edge: EdgeIx) -> Option<&Edge> {
        self.edges.get(edge)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edge index between two labels, if both exist and are connected.
    pub fn edge_between(&self, tail: &str, head: &str) -> Option<EdgeIx> {
        let u = self.node_index(tail)?;
        let v = self.node_index(head)?;
        self.lookup.get(&(u, v)).copied()
    }

    /// Like [`edge_between`](Self::edge_between) but reports the missing edge.
    pub fn require_edge(&self, tail: &str, head: &str) -> Result<EdgeIx, GraphError> {
        self.edge_between(tail, head)
            .ok_or_else(|| GraphError::UnknownEdge {
                tail: tail.to_string(),
                head: head.to_string(),
            })
    }

    pub fn edge_attr(&self, edge: EdgeIx, name: &str) -> Option<f64> {
        self.edges.get(edge)?.attrs.get(name).copied()
    }

    pub fn node_attr(&self, node: NodeIx, name: &str) -> Option<f64> {
        self.node_attrs.get(node)?.get(name).copied()
    }

    pub fn node_attrs(&self, node: NodeIx) -> Option<&BTreeMap<String, f64>> {
        self.node_attrs.get(node)
    }

    pub fn out_edges(&self, node: NodeIx) -> &[EdgeIx] {
        &self.out_edges[node]
    }

    pub fn in_edges(&self, node: NodeIx) -> &[EdgeIx] {
        &self.in_edges[node]
    }

    pub fn out_degree(&self, node: NodeIx) -> usize {
        self.out_edges[node].len()
    }

    pub fn in_degree(&self, node: NodeIx) -> usize {
        self.in_edges[node].len()
    }

    /// Edge labels as `(tail, head)` pairs.
    pub fn edge_labels(&self, edge: EdgeIx) -> Option<(&str, &str)> {
        let e = self.edges.get(edge)?;
        Some((&self.labels[e.tail], &self.labels[e.head]))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_add_edge_creates_nodes() {
        let mut g = FlowGraph::new().with_id("g1");
        let e = g.add_weighted_edge("a", "b", "flow", 3.0).unwrap();
        assert_eq!(g.id(), Some("g1"));
        assert_eq!(g.num_nodes(), 2);
        assert_eq!(g.edge_between("a", "b"), Some(e));
        assert_eq!(g.edge_between("b", "a"), None);
        assert_eq!(g.edge_attr(e, "flow"), Some(3.0));
        assert_eq!(g.edge_labels(e), Some(("a", "b")));
        assert_eq!(g.out_degree(0), 1);
        assert_eq!(g.in_degree(1), 1);
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut g = FlowGraph::new();
        let a = g.add_node("a");
        assert_eq!(g.add_node("a"), a);
        assert_eq!(g.num_nodes(), 1);
    }

    #[test]
    fn test_rejects_duplicate_edge() {
        let mut g = FlowGraph::new();
        g.add_edge("a", "b").unwrap();
        let err = g.add_edge("a", "b").unwrap_err();
        assert_eq!(err.code(), "GRAPH_DUPLICATE_EDGE");
    }

    #[test]
    fn test_rejects_self_loop() {
        let mut g = FlowGraph::new();
        assert_eq!(
            g.add_edge("a", "a"),
            Err(GraphError::SelfLoop("a".to_string()))
        );
        assert_eq!(g.num_nodes(), 0);
    }

    #[test]
    fn test_attribute_validation() {
        let mut g = FlowGraph::new();
        g.add_node("a");
        assert!(g.set_node_attr("a", "w", f64::NAN).is_err());
        assert!(g.set_node_attr("z", "w", 1.0).is_err());
        g.set_node_attr("a", "w", 2.5).unwrap();
        assert_eq!(g.node_attr(0, "w"), Some(2.5));
        assert_eq!(g.set_edge_attr(4, "w", 1.0), Err(GraphError::InvalidEdgeIndex(4)));
    }

    #[test]
    fn test_require_edge_reports_labels() {
        let g = FlowGraph::new();
        let err = g.require_edge("x", "y").unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownEdge {
                tail: "x".to_string(),
                head: "y".to_string()
            }
        );
    }
}
