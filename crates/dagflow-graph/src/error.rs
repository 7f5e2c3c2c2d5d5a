//! Error types for graph construction.

/// Error type for graph operations.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Node label not present in the graph.
    UnknownNode(String),
    /// No edge between the two labels.
    UnknownEdge { tail: String, head: String },
    /// Edge index out of range.
    InvalidEdgeIndex(usize),
    /// An edge between the two labels already exists.
    DuplicateEdge { tail: String, head: String },
    /// Edge from a node to itself.
    SelfLoop(String),
    /// The graph is not acyclic.
    CycleDetected(String),
    /// Attribute value is NaN or infinite.
    InvalidAttribute { name: String, value: f64 },
}

impl GraphError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::UnknownNode(_) => "GRAPH_UNKNOWN_NODE",
            GraphError::UnknownEdge { .. } => "GRAPH_UNKNOWN_EDGE",
            GraphError::InvalidEdgeIndex(_) => "GRAPH_INVALID_EDGE_INDEX",
            GraphError::DuplicateEdge { .. } => "GRAPH_DUPLICATE_EDGE",
            GraphError::SelfLoop(_) => "GRAPH_SELF_LOOP",
            GraphError::CycleDetected(_) => "GRAPH_CYCLE_DETECTED",
            GraphError::InvalidAttribute { .. } => "GRAPH_INVALID_ATTRIBUTE",
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::UnknownNode(label) => {
                write!(f, "[{}] node '{}' not found", self.code(), label)
            }
            GraphError::UnknownEdge { tail, head } => {
                write!(f, "[{}] edge ({}, {}) not found", self.code(), tail, head)
            }
            GraphError::InvalidEdgeIndex(index) => {
                write!(f, "[{}] edge index {} out of range", self.code(), index)
            }
            GraphError::DuplicateEdge { tail, head } => write!(
                f,
                "[{}] edge ({}, {}) already exists",
                self.code(),
                tail,
                head
            ),
            GraphError::SelfLoop(label) => {
                write!(f, "[{}] self loop on node '{}'", self.code(), label)
            }
            GraphError::CycleDetected(msg) => {
                write!(f, "[{}] cycle detected: {}", self.code(), msg)
            }
            GraphError::InvalidAttribute { name, value } => write!(
                f,
                "[{}] attribute '{}' must be finite (got {})",
                self.code(),
                name,
                value
            ),
        }
    }
}

impl std::error::Error for GraphError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::DuplicateEdge {
            tail: "a".to_string(),
            head: "b".to_string(),
        };
        assert!(err.to_string().starts_with("[GRAPH_DUPLICATE_EDGE]"));
        assert!(err.to_string().contains("(a, b)"));

        let err = GraphError::CycleDetected("3 of 4 nodes ordered".to_string());
        assert_eq!(err.code(), "GRAPH_CYCLE_DETECTED");
        assert!(err.to_string().contains("3 of 4"));
    }
}
