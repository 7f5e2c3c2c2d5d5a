//! Graph layer for dagflow.
//!
//! - [`FlowGraph`]: labelled directed graph with numeric node and edge attributes
//! - [`StGraph`]: immutable view with one global source and one global sink
//! - [`NodeExpandedGraph`]: node-weighted input rewritten as an edge-weighted graph
//!
//! Width and maximum edge antichains are computed on [`StGraph`] with a
//! minimum flow under lower bounds.

mod digraph;
mod error;
mod expand;
mod stgraph;
mod width;

pub use digraph::{Edge, FlowGraph};
pub use error::GraphError;
pub use expand::NodeExpandedGraph;
pub use stgraph::{EdgeKind, StGraph};

/// Index of a node in a [`FlowGraph`] or [`StGraph`].
pub type NodeIx = usize;

/// Index of an edge in a [`FlowGraph`] or [`StGraph`].
pub type EdgeIx = usize;
