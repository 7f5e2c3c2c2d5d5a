//! Error type for decomposition problems.

use dagflow_core::{ModelError, SolverError};
use dagflow_graph::GraphError;
use dagflow_solver::SolverConfigError;

/// Rejected input, rejected configuration, or a failure below the
/// decomposition layer.
///
/// Infeasibility and time limits are not errors; they are reported through
/// [`Outcome`](crate::Outcome).
#[derive(Debug, Clone, PartialEq)]
pub enum DecompError {
    Graph(GraphError),
    Model(ModelError),
    Solver(SolverError),
    SolverConfig(SolverConfigError),
    /// A non-ignored edge has no value for the flow attribute.
    MissingFlowAttribute {
        tail: String,
        head: String,
        attr: String,
    },
    /// A non-ignored edge has a negative flow value.
    NegativeFlow {
        tail: String,
        head: String,
        value: f64,
    },
    /// Inflow and outflow differ at an interior node.
    FlowConservation {
        node: String,
        inflow: f64,
        outflow: f64,
    },
    /// Coverage fraction outside `(0, 1]`.
    InvalidCoverage(f64),
    /// Coverage by length requested without an edge length attribute.
    CoverageLengthWithoutLengthAttr,
    /// A subpath refers to an edge the graph does not have.
    UnknownSubpathEdge { tail: String, head: String },
    /// A subpath with no edges.
    EmptySubpath(usize),
    /// The number of paths must be at least one.
    InvalidPathCount(usize),
    /// Safe paths and safe sequences together, or zero edges alone.
    InvalidSafetyCombination {
        paths: bool,
        sequences: bool,
        zero_edges: bool,
    },
    /// Additional starts or ends combined with node-weighted input.
    AdditionalEndpointsInNodeMode,
    /// Error scaling factor outside `[0, 1]`.
    InvalidErrorScaling {
        tail: String,
        head: String,
        value: f64,
    },
    /// Solver values do not describe a set of source-to-sink paths.
    InconsistentSolution(String),
}

impl DecompError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            DecompError::Graph(err) => err.code(),
            DecompError::Model(err) => err.code(),
            DecompError::Solver(err) => err.code(),
            DecompError::SolverConfig(err) => err.code(),
            DecompError::MissingFlowAttribute { .. } => "DECOMP_MISSING_FLOW",
            DecompError::NegativeFlow { .. } => "DECOMP_NEGATIVE_FLOW",
            DecompError::FlowConservation { .. } => "DECOMP_FLOW_CONSERVATION",
            DecompError::InvalidCoverage(_) => "DECOMP_INVALID_COVERAGE",
            DecompError::CoverageLengthWithoutLengthAttr => "DECOMP_COVERAGE_LENGTH_ATTR",
            DecompError::UnknownSubpathEdge { .. } => "DECOMP_UNKNOWN_SUBPATH_EDGE",
            DecompError::EmptySubpath(_) => "DECOMP_EMPTY_SUBPATH",
            DecompError::InvalidPathCount(_) => "DECOMP_INVALID_PATH_COUNT",
            DecompError::InvalidSafetyCombination { .. } => "DECOMP_INVALID_SAFETY",
            DecompError::AdditionalEndpointsInNodeMode => "DECOMP_ENDPOINTS_NODE_MODE",
            DecompError::InvalidErrorScaling { .. } => "DECOMP_INVALID_ERROR_SCALING",
            DecompError::InconsistentSolution(_) => "DECOMP_INCONSISTENT_SOLUTION",
        }
    }
}

impl std::fmt::Display for DecompError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecompError::Graph(err) => write!(f, "{err}"),
            DecompError::Model(err) => write!(f, "{err}"),
            DecompError::Solver(err) => write!(f, "{err}"),
            DecompError::SolverConfig(err) => write!(f, "{err}"),
            DecompError::MissingFlowAttribute { tail, head, attr } => write!(
                f,
                "[{}] edge ({}, {}) has no '{}' value",
                self.code(),
                tail,
                head,
                attr
            ),
            DecompError::NegativeFlow { tail, head, value } => write!(
                f,
                "[{}] edge ({}, {}) has negative flow {}",
                self.code(),
                tail,
                head,
                value
            ),
            DecompError::FlowConservation {
                node,
                inflow,
                outflow,
            } => write!(
                f,
                "[{}] node '{}' has inflow {} but outflow {}",
                self.code(),
                node,
                inflow,
                outflow
            ),
            DecompError::InvalidCoverage(c) => write!(
                f,
                "[{}] coverage must lie in (0, 1] (got {})",
                self.code(),
                c
            ),
            DecompError::CoverageLengthWithoutLengthAttr => write!(
                f,
                "[{}] coverage by length needs an edge length attribute",
                self.code()
            ),
            DecompError::UnknownSubpathEdge { tail, head } => write!(
                f,
                "[{}] subpath edge ({}, {}) is not in the graph",
                self.code(),
                tail,
                head
            ),
            DecompError::EmptySubpath(index) => {
                write!(f, "[{}] subpath {} has no edges", self.code(), index)
            }
            DecompError::InvalidPathCount(k) => write!(
                f,
                "[{}] number of paths must be at least 1 (got {})",
                self.code(),
                k
            ),
            DecompError::InvalidSafetyCombination {
                paths,
                sequences,
                zero_edges,
            } => write!(
                f,
                "[{}] unsupported safety combination (paths={}, sequences={}, zero_edges={})",
                self.code(),
                paths,
                sequences,
                zero_edges
            ),
            DecompError::AdditionalEndpointsInNodeMode => write!(
                f,
                "[{}] additional starts and ends need edge-weighted input",
                self.code()
            ),
            DecompError::InvalidErrorScaling { tail, head, value } => write!(
                f,
                "[{}] error scaling of edge ({}, {}) must lie in [0, 1] (got {})",
                self.code(),
                tail,
                head,
                value
            ),
            DecompError::InconsistentSolution(msg) => {
                write!(f, "[{}] inconsistent solver solution: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for DecompError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecompError::Graph(err) => Some(err),
            DecompError::Model(err) => Some(err),
            DecompError::Solver(err) => Some(err),
            DecompError::SolverConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphError> for DecompError {
    fn from(err: GraphError) -> Self {
        DecompError::Graph(err)
    }
}

impl From<ModelError> for DecompError {
    fn from(err: ModelError) -> Self {
        DecompError::Model(err)
    }
}

impl From<SolverError> for DecompError {
    fn from(err: SolverError) -> Self {
        DecompError::Solver(err)
    }
}

impl From<SolverConfigError> for DecompError {
    fn from(err: SolverConfigError) -> Self {
        DecompError::SolverConfig(err)
    }
}
