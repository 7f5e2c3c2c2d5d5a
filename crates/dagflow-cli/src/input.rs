//! Graph readers for the plain-text and JSON input formats.
//!
//! The text format holds one or more blocks:
//!
//! ```text
//! #graph-id
//! 4
//! s a 3
//! a t 3
//! ```
//!
//! A block starts at a `#` line, continues with the node count and then
//! lists one `tail head flow` edge per line. A file that does not start with
//! a header holds a single anonymous block.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use dagflow_decomp::Subpath;
use dagflow_graph::{FlowGraph, GraphError};
use serde::Deserialize;

pub const FLOW_ATTR: &str = "flow";
pub const LENGTH_ATTR: &str = "length";

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum InputFormat {
    Text,
    Json,
}

/// Errors raised while reading an input file.
#[derive(Debug)]
pub enum InputError {
    Io(std::io::Error),
    /// Malformed text line, 1-based.
    Parse { line: usize, message: String },
    Json(serde_json::Error),
    /// The graph rejected an edge or attribute.
    Graph {
        graph_id: Option<String>,
        source: GraphError,
    },
}

impl InputError {
    pub fn code(&self) -> &'static str {
        match self {
            InputError::Io(_) => "INPUT_IO",
            InputError::Parse { .. } => "INPUT_PARSE",
            InputError::Json(_) => "INPUT_JSON",
            InputError::Graph { .. } => "INPUT_GRAPH",
        }
    }

    fn parse(line: usize, message: impl Into<String>) -> Self {
        InputError::Parse {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Io(err) => write!(f, "[{}] {}", self.code(), err),
            InputError::Parse { line, message } => {
                write!(f, "[{}] line {}: {}", self.code(), line, message)
            }
            InputError::Json(err) => write!(f, "[{}] {}", self.code(), err),
            InputError::Graph { graph_id, source } => write!(
                f,
                "[{}] graph '{}': {}",
                self.code(),
                graph_id.as_deref().unwrap_or("-"),
                source
            ),
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InputError::Io(err) => Some(err),
            InputError::Json(err) => Some(err),
            InputError::Graph { source, .. } => Some(source),
            InputError::Parse { .. } => None,
        }
    }
}

/// One graph read from the input with its per-graph decomposition inputs.
#[derive(Debug, Default)]
pub struct GraphInput {
    pub graph: FlowGraph,
    pub subpaths: Vec<Subpath>,
    pub edges_to_ignore: Vec<(String, String)>,
    pub additional_starts: Vec<String>,
    pub additional_ends: Vec<String>,
    pub error_scaling: BTreeMap<(String, String), f64>,
    /// Whether any edge carries a length attribute.
    pub has_lengths: bool,
}

pub fn read_graphs(path: &Path, format: InputFormat) -> Result<Vec<GraphInput>, InputError> {
    let content = fs::read_to_string(path).map_err(InputError::Io)?;
    match format {
        InputFormat::Text => parse_text(&content),
        InputFormat::Json => parse_json(&content),
    }
}

#[derive(Debug)]
struct TextBlock {
    id: Option<String>,
    header_line: usize,
    node_count: Option<usize>,
    input: GraphInput,
}

impl TextBlock {
    fn new(id: Option<String>, header_line: usize) -> Self {
        let mut graph = FlowGraph::new();
        if let Some(id) = &id {
            graph = graph.with_id(id.clone());
        }
        Self {
            id,
            header_line,
            node_count: None,
            input: GraphInput {
                graph,
                ..GraphInput::default()
            },
        }
    }

    fn finish(self) -> Result<GraphInput, InputError> {
        let Some(expected) = self.node_count else {
            return Err(InputError::parse(self.header_line, "block has no node count"));
        };
        let used = self.input.graph.num_nodes();
        if used > expected {
            return Err(InputError::parse(
                self.header_line,
                format!("block declares {expected} nodes but its edges use {used}"),
            ));
        }
        Ok(self.input)
    }
}

pub fn parse_text(content: &str) -> Result<Vec<GraphInput>, InputError> {
    let mut graphs = Vec::new();
    let mut block: Option<TextBlock> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(id) = line.strip_prefix('#') {
            if let Some(done) = block.take() {
                graphs.push(done.finish()?);
            }
            let id = id.trim();
            let id = (!id.is_empty()).then(|| id.to_string());
            block = Some(TextBlock::new(id, line_no));
            continue;
        }

        let current = block.get_or_insert_with(|| TextBlock::new(None, line_no));
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if current.node_count.is_none() {
            let [count] = tokens.as_slice() else {
                return Err(InputError::parse(line_no, "expected the node count"));
            };
            let count = count
                .parse::<usize>()
                .map_err(|_| InputError::parse(line_no, format!("invalid node count '{count}'")))?;
            current.node_count = Some(count);
            continue;
        }

        let [tail, head, flow] = tokens.as_slice() else {
            return Err(InputError::parse(line_no, "expected 'tail head flow'"));
        };
        let flow = flow
            .parse::<f64>()
            .map_err(|_| InputError::parse(line_no, format!("invalid flow value '{flow}'")))?;
        current
            .input
            .graph
            .add_weighted_edge(tail, head, FLOW_ATTR, flow)
            .map_err(|source| InputError::Graph {
                graph_id: current.id.clone(),
                source,
            })?;
    }

    if let Some(done) = block {
        graphs.push(done.finish()?);
    }
    Ok(graphs)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Many(Vec<JsonGraph>),
    One(JsonGraph),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonGraph {
    #[serde(default)]
    id: Option<String>,
    edges: Vec<JsonEdge>,
    /// Node sequences some path must cover.
    #[serde(default)]
    subpaths: Vec<Vec<String>>,
    #[serde(default)]
    additional_starts: Vec<String>,
    #[serde(default)]
    additional_ends: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonEdge {
    tail: String,
    head: String,
    flow: f64,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    ignore: bool,
    #[serde(default)]
    error_scaling: Option<f64>,
}

pub fn parse_json(content: &str) -> Result<Vec<GraphInput>, InputError> {
    let graphs = match serde_json::from_str(content).map_err(InputError::Json)? {
        JsonInput::Many(graphs) => graphs,
        JsonInput::One(graph) => vec![graph],
    };
    graphs.into_iter().map(graph_from_json).collect()
}

fn graph_from_json(raw: JsonGraph) -> Result<GraphInput, InputError> {
    let graph_error = |source| InputError::Graph {
        graph_id: raw.id.clone(),
        source,
    };
    let mut graph = FlowGraph::new();
    if let Some(id) = &raw.id {
        graph = graph.with_id(id.clone());
    }

    let mut input = GraphInput::default();
    for edge in &raw.edges {
        let e = graph
            .add_weighted_edge(&edge.tail, &edge.head, FLOW_ATTR, edge.flow)
            .map_err(graph_error)?;
        if let Some(length) = edge.length {
            graph
                .set_edge_attr(e, LENGTH_ATTR, length)
                .map_err(graph_error)?;
            input.has_lengths = true;
        }
        let key = (edge.tail.clone(), edge.head.clone());
        if edge.ignore {
            input.edges_to_ignore.push(key.clone());
        }
        if let Some(scale) = edge.error_scaling {
            input.error_scaling.insert(key, scale);
        }
    }

    input.graph = graph;
    input.subpaths = raw
        .subpaths
        .iter()
        .map(|nodes| Subpath::Nodes(nodes.clone()))
        .collect();
    input.additional_starts = raw.additional_starts.clone();
    input.additional_ends = raw.additional_ends.clone();
    Ok(input)
}
