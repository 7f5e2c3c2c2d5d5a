//! Canonical single-source, single-sink view of a DAG.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use tracing::debug;

use crate::digraph::FlowGraph;
use crate::error::GraphError;
use crate::{EdgeIx, NodeIx};

const SOURCE_LABEL: &str = "__source__";
const SINK_LABEL: &str = "__sink__";

/// Origin of an [`StGraph`] edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Edge of the wrapped graph, with its index there.
    Base(EdgeIx),
    /// Synthetic edge leaving the global source.
    Source,
    /// Synthetic edge entering the global sink.
    Sink,
}

/// A DAG with one global source and one global sink.
///
/// Base nodes keep their indices, the source is node `n` and the sink node
/// `n + 1`. Base edges keep indices `0..m`; synthetic edges follow. The
/// view is immutable once built.
#[derive(Debug, Clone)]
pub struct StGraph {
    id: Option<String>,
    labels: Vec<String>,
    num_base_nodes: usize,
    num_base_edges: usize,
    tails: Vec<NodeIx>,
    heads: Vec<NodeIx>,
    kinds: Vec<EdgeKind>,
    out_edges: Vec<Vec<EdgeIx>>,
    in_edges: Vec<Vec<EdgeIx>>,
    topo_order: Vec<NodeIx>,
    additional_starts: Vec<NodeIx>,
    additional_ends: Vec<NodeIx>,
}

/// Kahn ordering of the base graph; `CycleDetected` if some node is never freed.
fn topological_order(graph: &FlowGraph) -> Result<Vec<NodeIx>, GraphError> {
    let n = graph.num_nodes();
    let mut indegree = (0..n).map(|v| graph.in_degree(v)).collect::<Vec<_>>();
    let mut order = Vec::with_capacity(n);
    let mut current = (0..n).filter(|&v| indegree[v] == 0).collect::<Vec<_>>();

    while !current.is_empty() {
        let mut next = Vec::new();
        for &node in &current {
            for &e in graph.out_edges(node) {
                let head = graph.edges()[e].head;
                indegree[head] -= 1;
                if indegree[head] == 0 {
                    next.push(head);
                }
            }
        }
        order.extend(current);
        current = next;
    }

    if order.len() != n {
        return Err(GraphError::CycleDetected(format!(
            "only {} of {} nodes could be ordered",
            order.len(),
            n
        )));
    }
    Ok(order)
}

fn resolve_labels(graph: &FlowGraph, labels: &[String]) -> Result<Vec<NodeIx>, GraphError> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(labels.len());
    for label in labels {
        let ix = graph
            .node_index(label)
            .ok_or_else(|| GraphError::UnknownNode(label.clone()))?;
        if seen.insert(ix) {
            nodes.push(ix);
        }
    }
    Ok(nodes)
}

impl StGraph {
    /// Wrap a graph, connecting the source to every node without in-edges
    /// and every node without out-edges to the sink.
    pub fn new(graph: &FlowGraph) -> Result<Self, GraphError> {
        Self::with_endpoints(graph, &[], &[])
    }

    /// Like [`new`](Self::new), also connecting the source to each
    /// additional start and each additional end to the sink.
    pub fn with_endpoints(
        graph: &FlowGraph,
        additional_starts: &[String],
        additional_ends: &[String],
    ) -> Result<Self, GraphError> {
        let started = Instant::now();
        let base_order = topological_order(graph)?;
        let starts = resolve_labels(graph, additional_starts)?;
        let ends = resolve_labels(graph, additional_ends)?;

        let n = graph.num_nodes();
        let source = n;
        let sink = n + 1;

        let mut labels = graph.labels().to_vec();
        labels.push(SOURCE_LABEL.to_string());
        labels.push(SINK_LABEL.to_string());

        let mut st = StGraph {
            id: graph.id().map(str::to_string),
            labels,
            num_base_nodes: n,
            num_base_edges: graph.num_edges(),
            tails: Vec::new(),
            heads: Vec::new(),
            kinds: Vec::new(),
            out_edges: vec![Vec::new(); n + 2],
            in_edges: vec![Vec::new(); n + 2],
            topo_order: Vec::with_capacity(n + 2),
            additional_starts: starts.clone(),
            additional_ends: ends.clone(),
        };

        for (ix, edge) in graph.edges().iter().enumerate() {
            st.push_edge(edge.tail, edge.head, EdgeKind::Base(ix));
        }
        for v in 0..n {
            if graph.in_degree(v) == 0 || starts.contains(&v) {
                st.push_edge(source, v, EdgeKind::Source);
            }
        }
        for v in 0..n {
            if graph.out_degree(v) == 0 || ends.contains(&v) {
                st.push_edge(v, sink, EdgeKind::Sink);
            }
        }

        st.topo_order.push(source);
        st.topo_order.extend(base_order);
        st.topo_order.push(sink);

        debug!(
            component = "graph",
            operation = "build_st_graph",
            status = "success",
            graph_id = st.id.as_deref().unwrap_or(""),
            nodes = st.num_nodes(),
            edges = st.num_edges(),
            base_edges = st.num_base_edges,
            additional_starts = st.additional_starts.len(),
            additional_ends = st.additional_ends.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Built source/sink view"
        );

        Ok(st)
    }

    fn push_edge(&mut self, tail: NodeIx, head: NodeIx, kind: EdgeKind) {
        let ix = self.tails.len();
        self.tails.push(tail);
        self.heads.push(head);
        self.kinds.push(kind);
        self.out_edges[tail].push(ix);
        self.in_edges[head].push(ix);
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn source(&self) -> NodeIx {
        self.num_base_nodes
    }

    pub fn sink(&self) -> NodeIx {
        self.num_base_nodes + 1
    }

    pub fn num_nodes(&self) -> usize {
        self.labels.len()
    }

    pub fn num_edges(&self) -> usize {
        self.tails.len()
    }

    pub fn num_base_nodes(&self) -> usize {
        self.num_base_nodes
    }

    pub fn num_base_edges(&self) -> usize {
        self.num_base_edges
    }

    pub fn tail(&self, edge: EdgeIx) -> NodeIx {
        self.tails[edge]
    }

    pub fn head(&self, edge: EdgeIx) -> NodeIx {
        self.heads[edge]
    }

    pub fn kind(&self, edge: EdgeIx) -> EdgeKind {
        self.kinds[edge]
    }

    pub fn is_base(&self, edge: EdgeIx) -> bool {
        edge < self.num_base_edges
    }

    pub fn is_base_node(&self, node: NodeIx) -> bool {
        node < self.num_base_nodes
    }

    pub fn label(&self, node: NodeIx) -> &str {
        &self.labels[node]
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

    /// Nodes in topological order, source first and sink last.
    pub fn topological_order(&self) -> &[NodeIx] {
        &self.topo_order
    }

    pub fn additional_starts(&self) -> &[NodeIx] {
        &self.additional_starts
    }

    pub fn additional_ends(&self) -> &[NodeIx] {
        &self.additional_ends
    }

    pub fn has_additional_endpoints(&self) -> bool {
        !self.additional_starts.is_empty() || !self.additional_ends.is_empty()
    }

    /// Index of the edge `tail -> head`, if any.
    pub fn edge_between(&self, tail: NodeIx, head: NodeIx) -> Option<EdgeIx> {
        self.out_edges
            .get(tail)?
            .iter()
            .copied()
            .find(|&e| self.heads[e] == head)
    }

    /// Nodes reachable from `node` along edges, `node` included.
    pub fn reachable_from(&self, node: NodeIx) -> Vec<bool> {
        self.search(node, true)
    }

    /// Nodes that can reach `node`, `node` included.
    pub fn reachable_rev_from(&self, node: NodeIx) -> Vec<bool> {
        self.search(node, false)
    }

    fn search(&self, start: NodeIx, forward: bool) -> Vec<bool> {
        let mut seen = vec![false; self.num_nodes()];
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            let incident = if forward {
                &self.out_edges[v]
            } else {
                &self.in_edges[v]
            };
            for &e in incident {
                let w = if forward { self.heads[e] } else { self.tails[e] };
                if !seen[w] {
                    seen[w] = true;
                    queue.push_back(w);
                }
            }
        }
        seen
    }

    /// Convert a node sequence to labels, dropping the source and sink.
    pub fn path_labels(&self, nodes: &[NodeIx]) -> Vec<String> {
        nodes
            .iter()
            .filter(|&&v| self.is_base_node(v))
            .map(|&v| self.labels[v].clone())
            .collect()
    }
}
