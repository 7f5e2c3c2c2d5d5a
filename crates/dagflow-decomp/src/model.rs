//! Path encoding shared by every decomposition objective.
//!
//! For `k` path indices, binary `x[e][i]` marks edge `e` as used by path
//! `i`. Each index leaves the source once, enters the sink once and keeps
//! inflow equal to outflow elsewhere, so the chosen edges form exactly one
//! source-to-sink path in a DAG. Objectives add weights, errors and the
//! objective on top through [`PathObjective`](crate::PathObjective).

use std::time::Instant;

use dagflow_core::{LinearExpr, SolverStatus, VarKind, VariableId};
use dagflow_graph::{EdgeIx, NodeIx};
use dagflow_solver::SolverSession;
use tracing::debug;

use crate::error::DecompError;
use crate::instance::Instance;
use crate::options::Coverage;
use crate::safety::SafetyAnalysis;

/// Optional variable families of the encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathModelOptions {
    /// `pos[e][i]`: length of path `i` before edge `e`.
    pub encode_edge_position: bool,
    /// `len[i]`: total length of path `i`.
    pub encode_path_length: bool,
}

/// Variables and constraints of `k` source-to-sink paths in one solver session.
#[derive(Debug)]
pub struct PathModel<'a> {
    instance: &'a Instance,
    k: usize,
    session: SolverSession,
    /// `x[e][i]`
    edge_vars: Vec<Vec<VariableId>>,
    /// `r[j][i]`
    subpath_vars: Vec<Vec<VariableId>>,
    position_vars: Option<Vec<Vec<VariableId>>>,
    path_length_vars: Option<Vec<VariableId>>,
    fixed_variables: usize,
}

/// Bound state of one `x[e][i]` after safety pinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pin {
    Free,
    One,
    Zero,
}

impl<'a> PathModel<'a> {
    /// Create the path variables and the constraints common to all objectives.
    ///
    /// The first `min(k, lists)` path indices have their safe lists pinned to
    /// one and, with zero-edge pruning, their incompatible edges pinned to zero.
    pub fn build(
        instance: &'a Instance,
        k: usize,
        options: &PathModelOptions,
        safety: &SafetyAnalysis,
        session: SolverSession,
    ) -> Result<Self, DecompError> {
        if k == 0 {
            return Err(DecompError::InvalidPathCount(k));
        }
        let started = Instant::now();
        let graph = instance.st_graph();
        let m = graph.num_edges();

        let mut pins = vec![vec![Pin::Free; k]; m];
        for (i, list) in safety.lists().iter().enumerate().take(k) {
            for &e in safety.zero_edges(i) {
                pins[e][i] = Pin::Zero;
            }
            for &e in list {
                pins[e][i] = Pin::One;
            }
        }

        let mut model = PathModel {
            instance,
            k,
            session,
            edge_vars: Vec::with_capacity(m),
            subpath_vars: Vec::new(),
            position_vars: None,
            path_length_vars: None,
            fixed_variables: 0,
        };

        for edge_pins in &pins {
            let mut row = Vec::with_capacity(k);
            for &pin in edge_pins {
                let (lower, upper) = match pin {
                    Pin::Free => (0.0, 1.0),
                    Pin::One => (1.0, 1.0),
                    Pin::Zero => (0.0, 0.0),
                };
                if pin != Pin::Free {
                    model.fixed_variables += 1;
                }
                row.push(model.session.create_variable(VarKind::Binary, lower, upper)?);
            }
            model.edge_vars.push(row);
        }

        model.encode_paths()?;
        model.encode_subpaths()?;
        if options.encode_edge_position {
            model.encode_edge_positions()?;
        }
        if options.encode_path_length {
            model.encode_path_lengths()?;
        }

        debug!(
            component = "path_model",
            operation = "build",
            status = "success",
            graph_id = instance.graph_id().unwrap_or(""),
            num_paths = k,
            variables = model.session.model().num_variables(),
            constraints = model.session.model().num_constraints(),
            fixed_variables = model.fixed_variables,
            subpaths = model.subpath_vars.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Encoded path variables"
        );

        Ok(model)
    }

    fn encode_paths(&mut self) -> Result<(), DecompError> {
        let graph = self.instance.st_graph();
        for i in 0..self.k {
            let leave_source =
                LinearExpr::sum_of(graph.out_edges(graph.source()).iter().map(|&e| self.edge_vars[e][i]));
            self.session.add_linear_constraint(leave_source.eq_scalar(1.0))?;

            let enter_sink =
                LinearExpr::sum_of(graph.in_edges(graph.sink()).iter().map(|&e| self.edge_vars[e][i]));
            self.session.add_linear_constraint(enter_sink.eq_scalar(1.0))?;

            for v in 0..graph.num_base_nodes() {
                let inflow = LinearExpr::sum_of(graph.in_edges(v).iter().map(|&e| self.edge_vars[e][i]));
                let outflow =
                    LinearExpr::sum_of(graph.out_edges(v).iter().map(|&e| self.edge_vars[e][i]));
                self.session
                    .add_linear_constraint((inflow - outflow).eq_scalar(0.0))?;
            }
        }
        Ok(())
    }

    fn encode_subpaths(&mut self) -> Result<(), DecompError> {
        let instance = self.instance;
        for subpath in &instance.subpaths {
            let mut indicators = Vec::with_capacity(self.k);
            for i in 0..self.k {
                let r = self.session.create_variable(VarKind::Binary, 0.0, 1.0)?;
                let (covered, required) = match instance.coverage {
                    Coverage::Edges(c) => (
                        LinearExpr::sum_of(subpath.iter().map(|&e| self.edge_vars[e][i])),
                        subpath.len() as f64 * c,
                    ),
                    Coverage::Length(c) => (
                        subpath
                            .iter()
                            .map(|&e| (self.edge_vars[e][i], instance.length(e)))
                            .collect::<LinearExpr>(),
                        subpath.iter().map(|&e| instance.length(e)).sum::<f64>() * c,
                    ),
                };
                self.session
                    .add_linear_constraint((covered - LinearExpr::term(r, required)).ge_scalar(0.0))?;
                indicators.push(r);
            }
            self.session
                .add_linear_constraint(LinearExpr::sum_of(indicators.iter().copied()).ge_scalar(1.0))?;
            self.subpath_vars.push(indicators);
        }
        Ok(())
    }

    fn length_kind(&self) -> VarKind {
        if self.instance.has_lengths() {
            VarKind::Continuous
        } else {
            VarKind::Integer
        }
    }

    fn encode_edge_positions(&mut self) -> Result<(), DecompError> {
        let instance = self.instance;
        let graph = instance.st_graph();
        let bound = instance.length_bound();
        let kind = self.length_kind();
        let before = (0..graph.num_nodes())
            .map(|v| graph.reachable_rev_from(v))
            .collect::<Vec<_>>();

        let mut positions = Vec::with_capacity(graph.num_edges());
        for e in 0..graph.num_edges() {
            let ancestors = &before[graph.tail(e)];
            let preceding = (0..graph.num_edges())
                .filter(|&f| ancestors[graph.head(f)])
                .collect::<Vec<_>>();
            let mut row = Vec::with_capacity(self.k);
            for i in 0..self.k {
                let pos = self.session.create_variable(kind, 0.0, bound)?;
                let length_before = preceding
                    .iter()
                    .map(|&f| (self.edge_vars[f][i], instance.length(f)))
                    .collect::<LinearExpr>();
                self.session
                    .add_linear_constraint((LinearExpr::var(pos) - length_before).eq_scalar(0.0))?;
                row.push(pos);
            }
            positions.push(row);
        }
        self.position_vars = Some(positions);
        Ok(())
    }

    fn encode_path_lengths(&mut self) -> Result<(), DecompError> {
        let instance = self.instance;
        let graph = instance.st_graph();
        let bound = instance.length_bound();
        let kind = self.length_kind();
        let mut lengths = Vec::with_capacity(self.k);
        for i in 0..self.k {
            let len = self.session.create_variable(kind, 0.0, bound)?;
            let total = (0..graph.num_edges())
                .map(|e| (self.edge_vars[e][i], instance.length(e)))
                .collect::<LinearExpr>();
            self.session
                .add_linear_constraint((LinearExpr::var(len) - total).eq_scalar(0.0))?;
            lengths.push(len);
        }
        self.path_length_vars = Some(lengths);
        Ok(())
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// `x[e][i]`. Panics on an out-of-range edge or path index.
    pub fn edge_var(&self, edge: EdgeIx, path: usize) -> VariableId {
        self.edge_vars[edge][path]
    }

    pub fn subpath_var(&self, subpath: usize, path: usize) -> Option<VariableId> {
        self.subpath_vars.get(subpath)?.get(path).copied()
    }

    pub fn position_var(&self, edge: EdgeIx, path: usize) -> Option<VariableId> {
        self.position_vars.as_ref()?.get(edge)?.get(path).copied()
    }

    pub fn path_length_var(&self, path: usize) -> Option<VariableId> {
        self.path_length_vars.as_ref()?.get(path).copied()
    }

    /// Number of `x` variables pinned by safety.
    pub fn fixed_variables(&self) -> usize {
        self.fixed_variables
    }

    pub fn session(&self) -> &SolverSession {
        &self.session
    }

    /// Mutable access for objectives adding their own variables and rows.
    pub fn session_mut(&mut self) -> &mut SolverSession {
        &mut self.session
    }

    /// New continuous variable constrained to `binary * continuous`, where
    /// `continuous` lies in `[0, upper]`.
    pub fn add_product(
        &mut self,
        binary: VariableId,
        continuous: VariableId,
        upper: f64,
    ) -> Result<VariableId, DecompError> {
        let product = self
            .session
            .create_variable(VarKind::Continuous, 0.0, upper)?;
        self.session
            .add_binary_continuous_product_constraint(binary, continuous, product, upper)?;
        Ok(product)
    }

    pub fn solve(&mut self) -> Result<SolverStatus, DecompError> {
        Ok(self.session.solve()?)
    }

    /// Value of a variable in the solved model.
    pub fn value(&self, var: VariableId) -> Result<f64, DecompError> {
        self.session.get_value(var).ok_or_else(|| {
            DecompError::InconsistentSolution(format!("no value for {var}"))
        })
    }

    /// Node sequence of every path index, source and sink included.
    pub fn solution_paths(&self) -> Result<Vec<Vec<NodeIx>>, DecompError> {
        let graph = self.instance.st_graph();
        let mut paths = Vec::with_capacity(self.k);
        for i in 0..self.k {
            let mut v = graph.source();
            let mut path = vec![v];
            while v != graph.sink() {
                if path.len() > graph.num_nodes() {
                    return Err(DecompError::InconsistentSolution(format!(
                        "path {i} does not reach the sink"
                    )));
                }
                let mut next = None;
                for &e in graph.out_edges(v) {
                    if self.value(self.edge_vars[e][i])? > 0.5 {
                        next = Some(graph.head(e));
                        break;
                    }
                }
                let Some(w) = next else {
                    return Err(DecompError::InconsistentSolution(format!(
                        "path {i} stops at node '{}'",
                        graph.label(v)
                    )));
                };
                path.push(w);
                v = w;
            }
            paths.push(path);
        }
        Ok(paths)
    }
}
