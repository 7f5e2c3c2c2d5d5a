//! Decomposition results.

use std::collections::BTreeMap;

use serde::Serialize;

/// Weighted paths given as node labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decomposition {
    pub paths: Vec<Vec<String>>,
    pub weights: Vec<f64>,
}

/// Residual of one edge in a least-absolute-errors decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeError {
    pub tail: String,
    pub head: String,
    pub error: f64,
}

/// Weighted paths plus the absolute error left on each counted edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeErrorDecomposition {
    pub paths: Vec<Vec<String>>,
    pub weights: Vec<f64>,
    pub edge_errors: Vec<EdgeError>,
}

impl EdgeErrorDecomposition {
    pub fn total_error(&self) -> f64 {
        self.edge_errors.iter().map(|e| e.error).sum()
    }
}

/// Weighted paths with a per-path slack bounding the error on its edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackDecomposition {
    pub paths: Vec<Vec<String>>,
    pub weights: Vec<f64>,
    pub slacks: Vec<f64>,
}

impl SlackDecomposition {
    pub fn total_slack(&self) -> f64 {
        self.slacks.iter().sum()
    }
}

fn edge_sums<'a>(
    paths: impl IntoIterator<Item = (&'a Vec<String>, f64)>,
) -> BTreeMap<(String, String), f64> {
    let mut sums = BTreeMap::new();
    for (path, weight) in paths {
        for pair in path.windows(2) {
            *sums
                .entry((pair[0].clone(), pair[1].clone()))
                .or_insert(0.0) += weight;
        }
    }
    sums
}

fn node_sums<'a>(
    paths: impl IntoIterator<Item = (&'a Vec<String>, f64)>,
) -> BTreeMap<String, f64> {
    let mut sums = BTreeMap::new();
    for (path, weight) in paths {
        for node in path {
            *sums.entry(node.clone()).or_insert(0.0) += weight;
        }
    }
    sums
}

impl Decomposition {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Sum of path weights over each `(tail, head)` pair the paths traverse.
    pub fn edge_flows(&self) -> BTreeMap<(String, String), f64> {
        edge_sums(self.paths.iter().zip(self.weights.iter().copied()))
    }

    /// Sum of path weights through each node.
    pub fn node_flows(&self) -> BTreeMap<String, f64> {
        node_sums(self.paths.iter().zip(self.weights.iter().copied()))
    }
}

impl EdgeErrorDecomposition {
    pub fn edge_flows(&self) -> BTreeMap<(String, String), f64> {
        edge_sums(self.paths.iter().zip(self.weights.iter().copied()))
    }
}

impl SlackDecomposition {
    pub fn edge_flows(&self) -> BTreeMap<(String, String), f64> {
        edge_sums(self.paths.iter().zip(self.weights.iter().copied()))
    }

    /// Sum of slacks of the paths through each `(tail, head)` pair.
    pub fn edge_slacks(&self) -> BTreeMap<(String, String), f64> {
        edge_sums(self.paths.iter().zip(self.slacks.iter().copied()))
    }
}

/// Snap integer weights read back from the solver.
pub(crate) fn round_weights(weights: &mut [f64]) {
    for w in weights {
        *w = w.round();
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn path(nodes: &[&str]) -> Vec<String> {
        nodes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_edge_and_node_flows() {
        let decomposition = Decomposition {
            paths: vec![path(&["s", "a", "t"]), path(&["s", "b", "t"]), path(&["s", "a", "t"])],
            weights: vec![2.0, 3.0, 1.0],
        };
        let flows = decomposition.edge_flows();
        assert_eq!(flows[&("s".to_string(), "a".to_string())], 3.0);
        assert_eq!(flows[&("b".to_string(), "t".to_string())], 3.0);
        assert_eq!(decomposition.node_flows()["t"], 6.0);
        assert_eq!(decomposition.len(), 3);
    }

    #[test]
    fn test_slack_sums() {
        let decomposition = SlackDecomposition {
            paths: vec![path(&["s", "a"]), path(&["s", "a", "t"])],
            weights: vec![1.0, 1.0],
            slacks: vec![0.5, 0.25],
        };
        assert_eq!(decomposition.total_slack(), 0.75);
        assert_eq!(
            decomposition.edge_slacks()[&("s".to_string(), "a".to_string())],
            0.75
        );
    }

    #[test]
    fn test_round_weights() {
        let mut weights = vec![2.999_999_9, 4.000_000_1, 0.0];
        round_weights(&mut weights);
        assert_eq!(weights, vec![3.0, 4.0, 0.0]);
    }

    #[test]
    fn test_serializes_paths_and_weights() {
        let decomposition = Decomposition {
            paths: vec![path(&["s", "t"])],
            weights: vec![5.0],
        };
        let json = serde_json::to_value(&decomposition).unwrap();
        assert_eq!(json["paths"][0][1], "t");
        assert_eq!(json["weights"][0], 5.0);
    }
}
