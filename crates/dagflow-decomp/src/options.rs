//! Decomposition configuration.

use std::str::FromStr;

use dagflow_solver::SolverConfig;
use serde::Serialize;

use crate::backend::BackendFactory;
use crate::error::DecompError;

/// Which safety pruning is applied before building a model.
///
/// Safe paths and safe sequences are mutually exclusive, and zero edges
/// always ride on one of them; the enum leaves no other combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyMode {
    None,
    SafePaths,
    #[default]
    SafePathsWithZeroEdges,
    SafeSequences,
    SafeSequencesWithZeroEdges,
}

impl SafetyMode {
    /// Build from independent switches, rejecting unsupported combinations.
    pub fn from_flags(paths: bool, sequences: bool, zero_edges: bool) -> Result<Self, DecompError> {
        match (paths, sequences, zero_edges) {
            (false, false, false) => Ok(SafetyMode::None),
            (true, false, false) => Ok(SafetyMode::SafePaths),
            (true, false, true) => Ok(SafetyMode::SafePathsWithZeroEdges),
            (false, true, false) => Ok(SafetyMode::SafeSequences),
            (false, true, true) => Ok(SafetyMode::SafeSequencesWithZeroEdges),
            _ => Err(DecompError::InvalidSafetyCombination {
                paths,
                sequences,
                zero_edges,
            }),
        }
    }

    pub fn is_enabled(self) -> bool {
        self != SafetyMode::None
    }

    pub fn uses_sequences(self) -> bool {
        matches!(
            self,
            SafetyMode::SafeSequences | SafetyMode::SafeSequencesWithZeroEdges
        )
    }

    pub fn uses_zero_edges(self) -> bool {
        matches!(
            self,
            SafetyMode::SafePathsWithZeroEdges | SafetyMode::SafeSequencesWithZeroEdges
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SafetyMode::None => "none",
            SafetyMode::SafePaths => "paths",
            SafetyMode::SafePathsWithZeroEdges => "paths-zero",
            SafetyMode::SafeSequences => "sequences",
            SafetyMode::SafeSequencesWithZeroEdges => "sequences-zero",
        }
    }
}

impl FromStr for SafetyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SafetyMode::None),
            "paths" => Ok(SafetyMode::SafePaths),
            "paths-zero" => Ok(SafetyMode::SafePathsWithZeroEdges),
            "sequences" => Ok(SafetyMode::SafeSequences),
            "sequences-zero" => Ok(SafetyMode::SafeSequencesWithZeroEdges),
            other => Err(format!(
                "unknown safety mode '{other}' (expected none, paths, paths-zero, sequences, sequences-zero)"
            )),
        }
    }
}

/// Search-space reductions applied before the solver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizationOptions {
    pub safety: SafetyMode,
    /// Accept the max-bottleneck greedy decomposition when it is small enough.
    pub greedy: bool,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            safety: SafetyMode::default(),
            greedy: true,
        }
    }
}

/// Fraction of each subpath some solution path must cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coverage {
    /// Fraction of the subpath's edges.
    Edges(f64),
    /// Fraction of the subpath's total edge length.
    Length(f64),
}

impl Coverage {
    pub fn fraction(self) -> f64 {
        match self {
            Coverage::Edges(c) | Coverage::Length(c) => c,
        }
    }
}

impl Default for Coverage {
    fn default() -> Self {
        Coverage::Edges(1.0)
    }
}

/// A sequence that at least one solution path must cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subpath {
    /// Consecutive `(tail, head)` edges.
    Edges(Vec<(String, String)>),
    /// Consecutive node labels.
    Nodes(Vec<String>),
}

/// Domain of the path weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightType {
    #[default]
    Integer,
    Continuous,
}

/// Whether the flow attribute lives on edges or on nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowOrigin {
    #[default]
    Edge,
    Node,
}

/// Everything a decomposition needs besides the graph.
///
/// Built with `with_*` methods and consumed by value when the problem is
/// constructed; it is never changed during a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionConfig {
    pub flow_attr: String,
    pub flow_origin: FlowOrigin,
    pub weight_type: WeightType,
    pub subpaths: Vec<Subpath>,
    pub coverage: Coverage,
    pub edge_length_attr: Option<String>,
    pub edges_to_ignore: Vec<(String, String)>,
    pub additional_starts: Vec<String>,
    pub additional_ends: Vec<String>,
    pub encode_edge_position: bool,
    pub encode_path_length: bool,
    pub optimization: OptimizationOptions,
    pub solver: SolverConfig,
    pub backend: BackendFactory,
}

impl DecompositionConfig {
    pub fn new(flow_attr: impl Into<String>) -> Self {
        Self {
            flow_attr: flow_attr.into(),
            flow_origin: FlowOrigin::Edge,
            weight_type: WeightType::default(),
            subpaths: Vec::new(),
            coverage: Coverage::default(),
            edge_length_attr: None,
            edges_to_ignore: Vec::new(),
            additional_starts: Vec::new(),
            additional_ends: Vec::new(),
            encode_edge_position: false,
            encode_path_length: false,
            optimization: OptimizationOptions::default(),
            solver: SolverConfig::default(),
            backend: BackendFactory::default(),
        }
    }

    pub fn with_flow_origin(mut self, origin: FlowOrigin) -> Self {
        self.flow_origin = origin;
        self
    }

    pub fn with_weight_type(mut self, weight_type: WeightType) -> Self {
        self.weight_type = weight_type;
        self
    }

    pub fn with_subpaths(mut self, subpaths: Vec<Subpath>) -> Self {
        self.subpaths = subpaths;
        self
    }

    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_edge_length_attr(mut self, attr: impl Into<String>) -> Self {
        self.edge_length_attr = Some(attr.into());
        self
    }

    pub fn with_edges_to_ignore(mut self, edges: Vec<(String, String)>) -> Self {
        self.edges_to_ignore = edges;
        self
    }

    pub fn with_additional_starts(mut self, nodes: Vec<String>) -> Self {
        self.additional_starts = nodes;
        self
    }

    pub fn with_additional_ends(mut self, nodes: Vec<String>) -> Self {
        self.additional_ends = nodes;
        self
    }

    pub fn with_edge_position(mut self, enabled: bool) -> Self {
        self.encode_edge_position = enabled;
        self
    }

    pub fn with_path_length(mut self, enabled: bool) -> Self {
        self.encode_path_length = enabled;
        self
    }

    pub fn with_optimization(mut self, options: OptimizationOptions) -> Self {
        self.optimization = options;
        self
    }

    pub fn with_safety(mut self, safety: SafetyMode) -> Self {
        self.optimization.safety = safety;
        self
    }

    pub fn with_greedy(mut self, enabled: bool) -> Self {
        self.optimization.greedy = enabled;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the backend every solve attempt is run on.
    pub fn with_backend(mut self, backend: BackendFactory) -> Self {
        self.backend = backend;
        self
    }

    /// Checks that need no graph.
    pub fn validate(&self) -> Result<(), DecompError> {
        let c = self.coverage.fraction();
        if !(c > 0.0 && c <= 1.0) {
            return Err(DecompError::InvalidCoverage(c));
        }
        if matches!(self.coverage, Coverage::Length(_)) && self.edge_length_attr.is_none() {
            return Err(DecompError::CoverageLengthWithoutLengthAttr);
        }
        if self.flow_origin == FlowOrigin::Node
            && (!self.additional_starts.is_empty() || !self.additional_ends.is_empty())
        {
            return Err(DecompError::AdditionalEndpointsInNodeMode);
        }
        Ok(())
    }
}
