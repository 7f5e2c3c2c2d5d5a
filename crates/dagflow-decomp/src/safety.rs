//! Safety analysis: edge lists every decomposition must route through one path.
//!
//! A list is safe for a trusted edge when every source-to-sink path using
//! that edge also uses all edges of the list. Safe paths are contiguous
//! chains found from degree-one nodes. Safe sequences are ordered and may
//! have gaps; they come from the edges every path to the source and to the
//! sink cannot avoid.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use dagflow_graph::{EdgeIx, NodeIx, StGraph};
use tracing::debug;

use crate::options::SafetyMode;

/// Ordered edges of the [`StGraph`].
pub type SafeList = Vec<EdgeIx>;

/// Contiguous chain around each edge: extended backwards through nodes with
/// a single in-edge and forwards through nodes with a single out-edge.
pub fn safe_paths(graph: &StGraph, trusted: &[EdgeIx], threads: usize) -> Vec<SafeList> {
    map_edges(trusted, threads, |e| safe_path_of(graph, e))
}

/// Bridges on the way from the source, the edge, then bridges on the way to
/// the sink.
pub fn safe_sequences(graph: &StGraph, trusted: &[EdgeIx], threads: usize) -> Vec<SafeList> {
    map_edges(trusted, threads, |e| safe_sequence_of(graph, e))
}

fn safe_path_of(graph: &StGraph, edge: EdgeIx) -> SafeList {
    let mut list = Vec::new();
    let mut u = graph.tail(edge);
    while let [up] = graph.in_edges(u) {
        list.push(*up);
        u = graph.tail(*up);
    }
    list.reverse();
    list.push(edge);
    let mut v = graph.head(edge);
    while let [down] = graph.out_edges(v) {
        list.push(*down);
        v = graph.head(*down);
    }
    list
}

fn safe_sequence_of(graph: &StGraph, edge: EdgeIx) -> SafeList {
    let mut list = find_all_bridges(graph, graph.tail(edge), graph.source(), false);
    list.reverse();
    list.push(edge);
    list.extend(find_all_bridges(graph, graph.head(edge), graph.sink(), true));
    list
}

/// Edges every path from `from` to `to` must use, in traversal order.
///
/// With `forward == false` paths follow edges backwards, so `to` must be
/// able to reach `from`. A unit flow is pushed along an arbitrary path;
/// each bridge is the single path edge leaving the closure of the nodes
/// reached so far in the residual graph.
pub fn find_all_bridges(graph: &StGraph, from: NodeIx, to: NodeIx, forward: bool) -> Vec<EdgeIx> {
    let incident = |v: NodeIx| {
        if forward {
            graph.out_edges(v)
        } else {
            graph.in_edges(v)
        }
    };
    let across = |e: EdgeIx| {
        if forward {
            graph.head(e)
        } else {
            graph.tail(e)
        }
    };

    let mut path_nodes = vec![from];
    let mut path_edges = Vec::new();
    let mut on_path = vec![false; graph.num_edges()];
    let mut position = vec![None; graph.num_nodes()];
    position[from] = Some(0);
    let mut v = from;
    while v != to {
        let Some(&e) = incident(v).first() else {
            return Vec::new();
        };
        on_path[e] = true;
        path_edges.push(e);
        v = across(e);
        position[v] = Some(path_nodes.len());
        path_nodes.push(v);
    }

    let mut component = vec![0usize; graph.num_nodes()];
    let mut queue = VecDeque::from([from]);
    component[from] = 1;
    let mut label = 1usize;
    let mut first = 0usize;
    let mut bridges = Vec::new();

    while component[to] == 0 {
        if label != 1 {
            while component[path_nodes[first]] != 0 {
                first += 1;
            }
            bridges.push(path_edges[first - 1]);
            component[path_nodes[first]] = label;
            queue.push_back(path_nodes[first]);
        }
        while let Some(x) = queue.pop_front() {
            let back = position[x]
                .filter(|&j| j > 0)
                .map(|j| path_nodes[j - 1]);
            let ahead = incident(x)
                .iter()
                .filter(|&&e| !on_path[e])
                .map(|&e| across(e));
            for y in ahead.chain(back) {
                if component[y] == 0 {
                    component[y] = label;
                    queue.push_back(y);
                }
            }
        }
        label += 1;
    }

    bridges
}

/// Tail of the first edge and head of the last edge of the longest
/// contiguous run inside a list.
pub fn longest_run_endpoints(graph: &StGraph, list: &[EdgeIx]) -> Option<(NodeIx, NodeIx)> {
    let (&first, rest) = list.split_first()?;
    let mut best = (graph.tail(first), graph.head(first), 1usize);
    let mut current = best;
    let mut previous = first;
    for &e in rest {
        if graph.head(previous) == graph.tail(e) {
            current = (current.0, graph.head(e), current.2 + 1);
        } else {
            current = (graph.tail(e), graph.head(e), 1);
        }
        if current.2 > best.2 {
            best = current;
        }
        previous = e;
    }
    Some((best.0, best.1))
}

#[cfg(feature = "parallel")]
fn map_edges<F>(edges: &[EdgeIx], threads: usize, f: F) -> Vec<SafeList>
where
    F: Fn(EdgeIx) -> SafeList + Sync + Send,
{
    use rayon::prelude::*;

    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| edges.par_iter().map(|&e| f(e)).collect()),
        Err(err) => {
            tracing::warn!(
                component = "safety",
                operation = "thread_pool",
                status = "warn",
                threads,
                error = %err,
                "Could not build thread pool; computing safe lists sequentially"
            );
            edges.iter().map(|&e| f(e)).collect()
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn map_edges<F>(edges: &[EdgeIx], _threads: usize, f: F) -> Vec<SafeList>
where
    F: Fn(EdgeIx) -> SafeList,
{
    edges.iter().map(|&e| f(e)).collect()
}

/// Safe lists chosen for fixing, computed once per problem and shared by
/// every model built for it.
#[derive(Debug, Clone, Default)]
pub struct SafetyAnalysis {
    mode: SafetyMode,
    /// One list per edge of a maximum-weight antichain; list `i` is pinned to path `i`.
    lists: Vec<SafeList>,
    /// Per pinned list, base edges its path cannot use.
    zero_edges: Vec<Vec<EdgeIx>>,
    num_safe_lists: usize,
    antichain_weight: u64,
    duration_ms: f64,
}

impl SafetyAnalysis {
    /// Analysis that pins nothing.
    pub fn disabled() -> Self {
        Self {
            mode: SafetyMode::None,
            ..Self::default()
        }
    }

    pub fn compute(graph: &StGraph, trusted: &[EdgeIx], mode: SafetyMode, threads: usize) -> Self {
        if !mode.is_enabled() || trusted.is_empty() {
            return Self {
                mode,
                ..Self::default()
            };
        }
        let started = Instant::now();

        let safe_lists = if mode.uses_sequences() {
            safe_sequences(graph, trusted, threads)
        } else {
            safe_paths(graph, trusted, threads)
        };

        let mut longest: Vec<Option<usize>> = vec![None; graph.num_edges()];
        for (i, list) in safe_lists.iter().enumerate() {
            for &e in list {
                match longest[e] {
                    Some(j) if safe_lists[j].len() >= list.len() => {}
                    _ => longest[e] = Some(i),
                }
            }
        }
        let demand = longest
            .iter()
            .map(|slot| slot.map_or(0, |i| safe_lists[i].len() as u64))
            .collect::<Vec<_>>();
        let (antichain_weight, antichain) = graph.max_edge_antichain(&demand);

        let lists = antichain
            .iter()
            .filter_map(|&e| longest[e].map(|i| safe_lists[i].clone()))
            .collect::<Vec<_>>();

        let zero_edges = if mode.uses_zero_edges() {
            lists
                .iter()
                .map(|list| zero_edges_of(graph, list))
                .collect()
        } else {
            Vec::new()
        };

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            component = "safety",
            operation = "compute",
            status = "success",
            mode = mode.as_str(),
            trusted = trusted.len(),
            safe_lists = safe_lists.len(),
            pinned = lists.len(),
            antichain_weight,
            zero_edges = zero_edges.iter().map(Vec::len).sum::<usize>(),
            duration_ms,
            "Computed safety analysis"
        );

        Self {
            mode,
            lists,
            zero_edges,
            num_safe_lists: safe_lists.len(),
            antichain_weight,
            duration_ms,
        }
    }

    pub fn mode(&self) -> SafetyMode {
        self.mode
    }

    /// Lists pinned to paths `0..lists().len()`.
    pub fn lists(&self) -> &[SafeList] {
        &self.lists
    }

    /// Base edges path `i` cannot use; empty without zero-edge pruning.
    pub fn zero_edges(&self, i: usize) -> &[EdgeIx] {
        self.zero_edges.get(i).map_or(&[], Vec::as_slice)
    }

    /// Number of safe lists before antichain selection.
    pub fn num_safe_lists(&self) -> usize {
        self.num_safe_lists
    }

    pub fn antichain_weight(&self) -> u64 {
        self.antichain_weight
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }
}

fn zero_edges_of(graph: &StGraph, list: &[EdgeIx]) -> Vec<EdgeIx> {
    let Some((first, last)) = longest_run_endpoints(graph, list) else {
        return Vec::new();
    };
    let after = graph.reachable_from(last);
    let before = graph.reachable_rev_from(first);
    let in_list = list.iter().copied().collect::<HashSet<_>>();
    (0..graph.num_base_edges())
        .filter(|e| !in_list.contains(e))
        .filter(|&e| !after[graph.tail(e)] && !before[graph.head(e)])
        .collect()
}
