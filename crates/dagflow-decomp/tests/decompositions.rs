use std::collections::BTreeMap;

use dagflow_core::{LinearExpr, Sense};
use dagflow_decomp::safety::{safe_paths, safe_sequences};
use dagflow_decomp::{
    Coverage, DecompError, Decomposition, DecompositionConfig, FlowOrigin, Instance, KFlowDecomp,
    KLeastAbsErrors, KMinPathError, MinFlowDecomp, Outcome, PathModel, PathObjective, SafetyMode,
    SolveStatistics, Subpath, WeightType, analyze_safety, solve_with_paths,
};
use dagflow_graph::{EdgeIx, FlowGraph, StGraph};

const EXAMPLE_EDGES: [(&str, &str, f64); 8] = [
    ("s", "a", 6.0),
    ("s", "b", 7.0),
    ("a", "b", 2.0),
    ("a", "c", 4.0),
    ("b", "c", 9.0),
    ("c", "d", 6.0),
    ("c", "t", 7.0),
    ("d", "t", 6.0),
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn graph(edges: &[(&str, &str, f64)]) -> FlowGraph {
    let mut g = FlowGraph::new().with_id("test");
    for &(u, v, f) in edges {
        g.add_weighted_edge(u, v, "flow", f).unwrap();
    }
    g
}

fn sorted_weights(weights: &[f64]) -> Vec<f64> {
    let mut sorted = weights.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn assert_reproduces(decomposition: &Decomposition, edges: &[(&str, &str, f64)]) {
    let flows = decomposition.edge_flows();
    for &(u, v, f) in edges {
        let carried = flows
            .get(&(u.to_string(), v.to_string()))
            .copied()
            .unwrap_or(0.0);
        assert!(
            (carried - f).abs() < 1e-6,
            "edge ({u}, {v}) carries {carried}, expected {f}"
        );
    }
}

fn solved<T: std::fmt::Debug>(outcome: Outcome<T>) -> T {
    match outcome {
        Outcome::Solved(solution) => solution,
        other => panic!("expected a solution, got {other:?}"),
    }
}

#[test]
fn test_min_flow_decomposition_of_example() {
    init_tracing();
    let g = graph(&EXAMPLE_EDGES);
    let mut mfd = MinFlowDecomp::new(&g, DecompositionConfig::new("flow")).unwrap();
    assert_eq!(mfd.lower_bound(), 3);

    let decomposition = solved(mfd.solve().unwrap());
    assert_eq!(sorted_weights(&decomposition.weights), vec![2.0, 4.0, 7.0]);
    assert_reproduces(&decomposition, &EXAMPLE_EDGES);

    let mut paths = decomposition.paths.clone();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            vec!["s", "a", "b", "c", "d", "t"],
            vec!["s", "a", "c", "d", "t"],
            vec!["s", "b", "c", "t"],
        ]
    );
    assert!(mfd.statistics().greedy_accepted);
}

#[test]
fn test_milp_agrees_under_every_safety_mode() {
    init_tracing();
    let g = graph(&EXAMPLE_EDGES);
    for mode in [
        SafetyMode::None,
        SafetyMode::SafePaths,
        SafetyMode::SafePathsWithZeroEdges,
        SafetyMode::SafeSequences,
        SafetyMode::SafeSequencesWithZeroEdges,
    ] {
        let config = DecompositionConfig::new("flow")
            .with_greedy(false)
            .with_safety(mode);
        let mut mfd = MinFlowDecomp::new(&g, config).unwrap();
        let decomposition = solved(mfd.solve().unwrap());
        assert_eq!(
            sorted_weights(&decomposition.weights),
            vec![2.0, 4.0, 7.0],
            "safety mode {}",
            mode.as_str()
        );
        assert_reproduces(&decomposition, &EXAMPLE_EDGES);

        let stats = mfd.statistics();
        assert!(!stats.greedy_accepted);
        assert_eq!(stats.attempts.len(), 1);
        assert_eq!(stats.safety_mode, Some(mode));
        if mode.is_enabled() {
            assert!(stats.pinned_lists > 0);
        }
    }
}

#[test]
fn test_repeated_solves_agree() {
    let g = graph(&EXAMPLE_EDGES);
    let config = DecompositionConfig::new("flow").with_greedy(false);
    let first = solved(MinFlowDecomp::new(&g, config.clone()).unwrap().solve().unwrap());
    let second = solved(MinFlowDecomp::new(&g, config).unwrap().solve().unwrap());
    assert_eq!(
        sorted_weights(&first.weights),
        sorted_weights(&second.weights)
    );
}

#[test]
fn test_fixed_k_below_width_is_infeasible() {
    init_tracing();
    let g = graph(&EXAMPLE_EDGES);
    let mut kfd = KFlowDecomp::new(&g, 2, DecompositionConfig::new("flow")).unwrap();
    assert_eq!(kfd.solve().unwrap(), Outcome::Infeasible);
    assert_eq!(kfd.statistics().attempts[0].status, "infeasible");
}

#[test]
fn test_fixed_k_above_minimum() {
    let g = graph(&EXAMPLE_EDGES);
    let config = DecompositionConfig::new("flow").with_greedy(false);
    let mut kfd = KFlowDecomp::new(&g, 4, config).unwrap();
    let decomposition = solved(kfd.solve().unwrap());
    assert_eq!(decomposition.len(), 4);
    assert_reproduces(&decomposition, &EXAMPLE_EDGES);
}

#[test]
fn test_continuous_weights() {
    let edges = [("s", "a", 1.5), ("a", "t", 1.5), ("s", "t", 0.5)];
    let g = graph(&edges);
    let config = DecompositionConfig::new("flow").with_weight_type(WeightType::Continuous);
    let decomposition = solved(MinFlowDecomp::new(&g, config).unwrap().solve().unwrap());
    assert_eq!(sorted_weights(&decomposition.weights), vec![0.5, 1.5]);
    assert_reproduces(&decomposition, &edges);
}

#[test]
fn test_subpath_is_covered_by_one_path() {
    init_tracing();
    let g = graph(&EXAMPLE_EDGES);
    let subpath = Subpath::Nodes(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    let config = DecompositionConfig::new("flow").with_subpaths(vec![subpath]);
    let decomposition = solved(MinFlowDecomp::new(&g, config).unwrap().solve().unwrap());
    assert_reproduces(&decomposition, &EXAMPLE_EDGES);
    assert!(
        decomposition
            .paths
            .iter()
            .any(|p| p.windows(3).any(|w| w == ["a", "b", "c"]))
    );
}

#[test]
fn test_partial_subpath_coverage() {
    init_tracing();
    let edges = [("s", "a", 1.0), ("a", "t", 1.0), ("s", "b", 1.0), ("b", "t", 1.0)];
    let g = graph(&edges);
    let subpath = Subpath::Edges(vec![
        ("s".to_string(), "a".to_string()),
        ("b".to_string(), "t".to_string()),
    ]);

    // No single path uses both edges.
    let config = DecompositionConfig::new("flow").with_subpaths(vec![subpath.clone()]);
    let mut kfd = KFlowDecomp::new(&g, 2, config).unwrap();
    assert!(kfd.solve().unwrap().is_infeasible());

    let config = DecompositionConfig::new("flow")
        .with_subpaths(vec![subpath])
        .with_coverage(Coverage::Edges(0.5));
    let mut kfd = KFlowDecomp::new(&g, 2, config).unwrap();
    let decomposition = solved(kfd.solve().unwrap());
    assert_reproduces(&decomposition, &edges);
}

#[test]
fn test_min_flow_infeasible_at_every_k() {
    init_tracing();
    let g = graph(&[("s", "a", 1.0), ("a", "t", 1.0), ("s", "b", 1.0), ("b", "t", 1.0)]);
    let subpath = Subpath::Edges(vec![
        ("s".to_string(), "a".to_string()),
        ("b".to_string(), "t".to_string()),
    ]);
    let config = DecompositionConfig::new("flow").with_subpaths(vec![subpath]);
    let mut mfd = MinFlowDecomp::new(&g, config).unwrap();
    assert_eq!(mfd.solve().unwrap(), Outcome::Infeasible);

    // One path per positive edge plus one per subpath bounds the search.
    let upper_bound = 4 + 1;
    let stats = mfd.statistics();
    assert_eq!(stats.attempts.len(), upper_bound - mfd.lower_bound() + 1);
    assert_eq!(stats.attempts.last().map(|a| a.num_paths), Some(upper_bound));
    assert!(stats.attempts.iter().all(|a| a.status == "infeasible"));
}

#[test]
fn test_one_path_per_edge_is_feasible() {
    let g = graph(&EXAMPLE_EDGES);
    let config = DecompositionConfig::new("flow").with_greedy(false);
    let mut kfd = KFlowDecomp::new(&g, EXAMPLE_EDGES.len(), config).unwrap();
    let decomposition = solved(kfd.solve().unwrap());
    assert_eq!(decomposition.len(), EXAMPLE_EDGES.len());
    assert_reproduces(&decomposition, &EXAMPLE_EDGES);
}

#[test]
fn test_coverage_by_length() {
    let mut g = graph(&[("s", "a", 2.0), ("a", "b", 2.0), ("b", "t", 2.0)]);
    g.set_edge_attr(0, "len", 10.0).unwrap();
    let subpath = Subpath::Nodes(vec!["s".to_string(), "a".to_string(), "b".to_string()]);
    let config = DecompositionConfig::new("flow")
        .with_subpaths(vec![subpath])
        .with_edge_length_attr("len")
        .with_coverage(Coverage::Length(0.9));
    let decomposition = solved(MinFlowDecomp::new(&g, config).unwrap().solve().unwrap());
    assert_eq!(decomposition.paths, vec![vec!["s", "a", "b", "t"]]);
}

#[test]
fn test_node_weighted_input() {
    init_tracing();
    let mut g = FlowGraph::new();
    for (u, v) in [("s", "a"), ("s", "b"), ("a", "t"), ("b", "t")] {
        g.add_edge(u, v).unwrap();
    }
    for (v, w) in [("s", 3.0), ("a", 2.0), ("b", 1.0), ("t", 3.0)] {
        g.set_node_attr(v, "weight", w).unwrap();
    }
    let config = DecompositionConfig::new("weight").with_flow_origin(FlowOrigin::Node);
    let decomposition = solved(MinFlowDecomp::new(&g, config).unwrap().solve().unwrap());
    assert_eq!(sorted_weights(&decomposition.weights), vec![1.0, 2.0]);
    assert_eq!(decomposition.node_flows()["a"], 2.0);
    assert_eq!(decomposition.node_flows()["s"], 3.0);
    for path in &decomposition.paths {
        assert_eq!(path.first().map(String::as_str), Some("s"));
        assert_eq!(path.last().map(String::as_str), Some("t"));
        assert_eq!(path.len(), 3);
    }
}

#[test]
fn test_additional_ends() {
    init_tracing();
    let edges = [("s", "a", 5.0), ("a", "t", 3.0)];
    let g = graph(&edges);

    let err = MinFlowDecomp::new(&g, DecompositionConfig::new("flow")).unwrap_err();
    assert_eq!(err.code(), "DECOMP_FLOW_CONSERVATION");

    let config = DecompositionConfig::new("flow").with_additional_ends(vec!["a".to_string()]);
    let mut mfd = MinFlowDecomp::new(&g, config).unwrap();
    let decomposition = solved(mfd.solve().unwrap());
    assert_eq!(sorted_weights(&decomposition.weights), vec![2.0, 3.0]);
    assert_reproduces(&decomposition, &edges);
    assert!(decomposition.paths.contains(&vec!["s".to_string(), "a".to_string()]));
}

#[test]
fn test_ignored_edges_are_not_reproduced() {
    let mut g = graph(&[("s", "a", 4.0), ("a", "t", 4.0)]);
    g.add_weighted_edge("s", "t", "flow", 100.0).unwrap();
    let config = DecompositionConfig::new("flow")
        .with_edges_to_ignore(vec![("s".to_string(), "t".to_string())]);
    let decomposition = solved(MinFlowDecomp::new(&g, config).unwrap().solve().unwrap());
    assert_eq!(decomposition.weights, vec![4.0]);
    assert_eq!(decomposition.paths, vec![vec!["s", "a", "t"]]);
}

#[test]
fn test_least_absolute_errors() {
    init_tracing();
    let g = graph(&EXAMPLE_EDGES);
    let mut exact = KLeastAbsErrors::new(&g, 3, DecompositionConfig::new("flow")).unwrap();
    let solution = solved(exact.solve().unwrap());
    assert_eq!(solution.total_error(), 0.0);
    assert_eq!(solution.edge_errors.len(), EXAMPLE_EDGES.len());

    let mut short = KLeastAbsErrors::new(&g, 2, DecompositionConfig::new("flow")).unwrap();
    let solution = solved(short.solve().unwrap());
    assert!(solution.total_error() > 0.0);
}

#[test]
fn test_min_path_error_on_exact_flow() {
    let g = graph(&EXAMPLE_EDGES);
    let mut kmpe = KMinPathError::new(&g, None, DecompositionConfig::new("flow")).unwrap();
    assert_eq!(kmpe.k(), 3);
    let solution = solved(kmpe.solve().unwrap());
    assert_eq!(solution.total_slack(), 0.0);
    assert_eq!(sorted_weights(&solution.weights), vec![2.0, 4.0, 7.0]);
}

#[test]
fn test_min_path_error_agrees_with_and_without_safety() {
    init_tracing();
    // a -> {b, c} -> d -> e -> {f, g} -> h, with noise on (g, h).
    let edges = [
        ("a", "b", 3.0),
        ("a", "c", 5.0),
        ("b", "d", 3.0),
        ("c", "d", 5.0),
        ("d", "e", 8.0),
        ("e", "f", 4.0),
        ("e", "g", 4.0),
        ("f", "h", 4.0),
        ("g", "h", 5.0),
    ];
    let g = graph(&edges);

    let st = StGraph::new(&g).unwrap();
    let trusted = (0..g.num_edges()).collect::<Vec<_>>();
    assert_ne!(safe_paths(&st, &trusted, 1), safe_sequences(&st, &trusted, 1));

    let total_slack = |mode: SafetyMode| {
        let config = DecompositionConfig::new("flow").with_safety(mode);
        let mut kmpe = KMinPathError::new(&g, None, config).unwrap();
        assert_eq!(kmpe.k(), 2);
        solved(kmpe.solve().unwrap()).total_slack()
    };
    let unpruned = total_slack(SafetyMode::None);
    assert!(unpruned > 0.0);
    for mode in [
        SafetyMode::SafePathsWithZeroEdges,
        SafetyMode::SafeSequencesWithZeroEdges,
    ] {
        assert!(
            (total_slack(mode) - unpruned).abs() < 1e-6,
            "safety mode {}",
            mode.as_str()
        );
    }
}

#[test]
fn test_min_path_error_with_scaling() {
    let g = graph(&[("s", "a", 4.0), ("a", "t", 8.0)]);
    let scaling = BTreeMap::from([(("a".to_string(), "t".to_string()), 0.5)]);
    let mut kmpe = KMinPathError::new(&g, Some(1), DecompositionConfig::new("flow"))
        .unwrap()
        .with_error_scaling(&scaling)
        .unwrap();
    let solution = solved(kmpe.solve().unwrap());
    // |4 - w| <= rho and 0.5 * |8 - w| <= rho give rho = 4/3 at w = 16/3.
    assert!(solution.total_slack() <= 2.0);
    assert!(solution.total_slack() >= 4.0 / 3.0 - 1e-6);
}

#[test]
fn test_rejected_inputs() {
    let err = MinFlowDecomp::new(&graph(&[("s", "t", -1.0)]), DecompositionConfig::new("flow"))
        .unwrap_err();
    assert_eq!(err.code(), "DECOMP_NEGATIVE_FLOW");

    let err = MinFlowDecomp::new(&graph(&[("s", "t", 1.0)]), DecompositionConfig::new("other"))
        .unwrap_err();
    assert_eq!(err.code(), "DECOMP_MISSING_FLOW");
    assert!(err.to_string().contains("'other'"));

    let config = DecompositionConfig::new("flow").with_coverage(Coverage::Edges(0.0));
    let err = MinFlowDecomp::new(&graph(&[("s", "t", 1.0)]), config).unwrap_err();
    assert_eq!(err.code(), "DECOMP_INVALID_COVERAGE");

    let mut cyclic = graph(&[("s", "a", 1.0), ("a", "b", 1.0)]);
    cyclic.add_weighted_edge("b", "a", "flow", 1.0).unwrap();
    let err = MinFlowDecomp::new(&cyclic, DecompositionConfig::new("flow")).unwrap_err();
    assert_eq!(err.code(), "GRAPH_CYCLE_DETECTED");
}

#[test]
fn test_statistics_serialize() {
    let g = graph(&EXAMPLE_EDGES);
    let config = DecompositionConfig::new("flow").with_greedy(false);
    let mut mfd = MinFlowDecomp::new(&g, config).unwrap();
    mfd.solve().unwrap();
    let json = serde_json::to_value(mfd.statistics()).unwrap();
    assert_eq!(json["graph_id"], "test");
    assert_eq!(json["lower_bound"], 3);
    assert_eq!(json["attempts"][0]["status"], "optimal");
}

/// `k` paths that together use every edge.
struct EdgeCover {
    instance: Instance,
}

impl PathObjective for EdgeCover {
    type Encoding = ();
    type Solution = Vec<Vec<String>>;

    fn name(&self) -> &'static str {
        "edge_cover"
    }

    fn instance(&self) -> &Instance {
        &self.instance
    }

    fn trusted_edges(&self) -> Vec<EdgeIx> {
        self.instance.counted_edges().collect()
    }

    fn encode(&self, model: &mut PathModel<'_>) -> Result<Self::Encoding, DecompError> {
        for e in self.instance.counted_edges() {
            let used = LinearExpr::sum_of((0..model.k()).map(|i| model.edge_var(e, i)));
            model.session_mut().add_linear_constraint(used.ge_scalar(1.0))?;
        }
        model
            .session_mut()
            .set_objective(LinearExpr::new(), Sense::Minimize)?;
        Ok(())
    }

    fn extract(
        &self,
        _model: &PathModel<'_>,
        _encoding: &Self::Encoding,
        paths: Vec<Vec<String>>,
    ) -> Result<Self::Solution, DecompError> {
        Ok(paths)
    }
}

#[test]
fn test_objective_defined_outside_the_crate() {
    init_tracing();
    let config = DecompositionConfig::new("flow");
    let objective = EdgeCover {
        instance: Instance::new(&graph(&EXAMPLE_EDGES), &config).unwrap(),
    };
    let mut stats = SolveStatistics::default();
    let safety = analyze_safety(&objective, &config, &mut stats);
    assert!(stats.pinned_lists > 0);

    let outcome = solve_with_paths(&objective, 2, &safety, &config, &mut stats).unwrap();
    assert!(outcome.is_infeasible());

    let paths = solved(solve_with_paths(&objective, 3, &safety, &config, &mut stats).unwrap());
    assert_eq!(paths.len(), 3);
    for &(u, v, _) in &EXAMPLE_EDGES {
        assert!(
            paths.iter().any(|p| p.windows(2).any(|w| w == [u, v])),
            "edge ({u}, {v}) is not covered"
        );
    }
    assert_eq!(stats.attempts.len(), 2);
}
