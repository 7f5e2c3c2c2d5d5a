//! Width and maximum edge antichain via minimum flow with lower bounds.
//!
//! Every edge `e` gets a demand `d[e]`; a source-to-sink flow with
//! `f[e] >= d[e]` on every edge is started from fixed routes and lowered
//! along decrease paths until none is left. The final flow value equals the
//! maximum total demand over edges no single path can contain two of.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::debug;

use crate::stgraph::StGraph;
use crate::{EdgeIx, NodeIx};

/// One step of a decrease path.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Edge traversed tail to head; its flow drops.
    Forward(EdgeIx),
    /// Edge traversed head to tail; its flow grows.
    Backward(EdgeIx),
}

impl StGraph {
    /// Minimum number of source-to-sink paths covering every `trusted` edge.
    pub fn width(&self, trusted: &[EdgeIx]) -> u64 {
        let mut demand = vec![0u64; self.num_edges()];
        for &e in trusted {
            if e < demand.len() {
                demand[e] = 1;
            }
        }
        self.max_edge_antichain(&demand).0
    }

    /// Maximum-demand edge antichain.
    ///
    /// `demand` is indexed by edge; missing entries count as 0. Returns the
    /// antichain weight and its edges in increasing index order. Only edges
    /// with positive demand are listed.
    pub fn max_edge_antichain(&self, demand: &[u64]) -> (u64, Vec<EdgeIx>) {
        let started = Instant::now();
        let demand = (0..self.num_edges())
            .map(|e| demand.get(e).copied().unwrap_or(0))
            .collect::<Vec<_>>();

        let mut flow = self.initial_flow(&demand);
        let mut augmentations = 0usize;
        let reached = loop {
            let (reached, parent) = self.decrease_search(&flow, &demand);
            if !reached[self.sink()] {
                break reached;
            }
            self.decrease_along(&parent, &mut flow, &demand);
            augmentations += 1;
        };

        let value = self
            .out_edges(self.source())
            .iter()
            .map(|&e| flow[e])
            .sum::<u64>();
        let antichain = (0..self.num_edges())
            .filter(|&e| reached[self.tail(e)] && !reached[self.head(e)] && demand[e] > 0)
            .collect::<Vec<_>>();

        debug!(
            component = "graph",
            operation = "max_edge_antichain",
            status = "success",
            graph_id = self.id().unwrap_or(""),
            weight = value,
            antichain_edges = antichain.len(),
            augmentations,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Computed maximum edge antichain"
        );

        (value, antichain)
    }

    /// Feasible flow: each demand routed along a fixed source route to the
    /// edge tail and a fixed sink route from the edge head.
    fn initial_flow(&self, demand: &[u64]) -> Vec<u64> {
        let mut flow = vec![0u64; self.num_edges()];
        for (e, &d) in demand.iter().enumerate() {
            if d == 0 {
                continue;
            }
            flow[e] += d;
            let mut v = self.tail(e);
            while v != self.source() {
                let Some(&up) = self.in_edges(v).first() else {
                    break;
                };
                flow[up] += d;
                v = self.tail(up);
            }
            let mut v = self.head(e);
            while v != self.sink() {
                let Some(&down) = self.out_edges(v).first() else {
                    break;
                };
                flow[down] += d;
                v = self.head(down);
            }
        }
        flow
    }

    /// BFS from the source over forward edges with slack and any edge backwards.
    fn decrease_search(
        &self,
        flow: &[u64],
        demand: &[u64],
    ) -> (Vec<bool>, Vec<Option<(NodeIx, Step)>>) {
        let n = self.num_nodes();
        let mut reached = vec![false; n];
        let mut parent = vec![None; n];
        let source = self.source();
        reached[source] = true;
        let mut queue = VecDeque::from([source]);

        while let Some(v) = queue.pop_front() {
            for &e in self.out_edges(v) {
                let w = self.head(e);
                if !reached[w] && flow[e] > demand[e] {
                    reached[w] = true;
                    parent[w] = Some((v, Step::Forward(e)));
                    queue.push_back(w);
                }
            }
            for &e in self.in_edges(v) {
                let w = self.tail(e);
                if !reached[w] {
                    reached[w] = true;
                    parent[w] = Some((v, Step::Backward(e)));
                    queue.push_back(w);
                }
            }
        }
        (reached, parent)
    }

    fn decrease_along(
        &self,
        parent: &[Option<(NodeIx, Step)>],
        flow: &mut [u64],
        demand: &[u64],
    ) {
        let mut steps = Vec::new();
        let mut v = self.sink();
        while let Some((prev, step)) = parent[v] {
            steps.push(step);
            v = prev;
        }
        let delta = steps
            .iter()
            .filter_map(|step| match *step {
                Step::Forward(e) => Some(flow[e] - demand[e]),
                Step::Backward(_) => None,
            })
            .min()
            .unwrap_or(0);
        for step in steps {
            match step {
                Step::Forward(e) => flow[e] -= delta,
                Step::Backward(e) => flow[e] += delta,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{FlowGraph, StGraph};

    fn graph(edges: &[(&str, &str)]) -> FlowGraph {
        let mut g = FlowGraph::new();
        for (u, v) in edges {
            g.add_edge(u, v).unwrap();
        }
        g
    }

    fn all_base(st: &StGraph) -> Vec<usize> {
        (0..st.num_base_edges()).collect()
    }

    #[test]
    fn test_chain_has_width_one() {
        let st = StGraph::new(&graph(&[("a", "b"), ("b", "c"), ("c", "d")])).unwrap();
        assert_eq!(st.width(&all_base(&st)), 1);
    }

    #[test]
    fn test_diamond_has_width_two() {
        let st =
            StGraph::new(&graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")])).unwrap();
        assert_eq!(st.width(&all_base(&st)), 2);
    }

    #[test]
    fn test_width_of_empty_selection_is_zero() {
        let st = StGraph::new(&graph(&[("a", "b")])).unwrap();
        assert_eq!(st.width(&[]), 0);
    }

    #[test]
    fn test_width_counts_only_trusted_edges() {
        let g = graph(&[("s", "a"), ("s", "b"), ("a", "t"), ("b", "t"), ("s", "t")]);
        let st = StGraph::new(&g).unwrap();
        assert_eq!(st.width(&all_base(&st)), 3);
        let sa = g.edge_between("s", "a").unwrap();
        let at = g.edge_between("a", "t").unwrap();
        assert_eq!(st.width(&[sa, at]), 1);
    }

    #[test]
    fn test_width_of_flow_example() {
        let g = graph(&[
            ("s", "a"),
            ("s", "b"),
            ("a", "b"),
            ("a", "c"),
            ("b", "c"),
            ("c", "d"),
            ("c", "t"),
            ("d", "t"),
        ]);
        let st = StGraph::new(&g).unwrap();
        assert_eq!(st.width(&all_base(&st)), 3);
    }

    #[test]
    fn test_weighted_antichain() {
        // Two parallel branches; the heavier edge of each branch wins.
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "d"), ("d", "c")]);
        let st = StGraph::new(&g).unwrap();
        let mut demand = vec![0; st.num_edges()];
        demand[0] = 3;
        demand[1] = 1;
        demand[2] = 2;
        demand[3] = 5;
        let (weight, edges) = st.max_edge_antichain(&demand);
        assert_eq!(weight, 8);
        assert_eq!(edges, vec![0, 3]);
    }

    #[test]
    fn test_antichain_edges_are_pairwise_unreachable() {
        let g = graph(&[
            ("a", "b"),
            ("a", "c"),
            ("b", "d"),
            ("c", "d"),
            ("b", "c"),
            ("d", "e"),
        ]);
        let st = StGraph::new(&g).unwrap();
        let demand = vec![1; st.num_base_edges()];
        let (weight, edges) = st.max_edge_antichain(&demand);
        assert_eq!(weight as usize, edges.len());
        for &e in &edges {
            let reach = st.reachable_from(st.head(e));
            for &f in &edges {
                if e != f {
                    assert!(!reach[st.tail(f)], "edges {e} and {f} share a path");
                }
            }
        }
    }
}
