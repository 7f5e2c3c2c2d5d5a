#![allow(clippy::float_cmp)]

use dagflow_core::{LinearExpr, Sense, SolverStatus, VarKind};
use dagflow_highs::{HighsBackend, HighsModel, HighsStatus, ObjectiveSense};
use dagflow_solver::{Presolve, SolverConfig, SolverSession};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn session() -> SolverSession {
    SolverSession::new(SolverConfig::default(), Box::new(HighsBackend::new()))
}

/// minimize 2x + 3y subject to x + y >= 5, x,y >= 0
#[test]
fn test_simple_lp() {
    init_tracing();
    let mut s = session();
    let x = s
        .create_variable(VarKind::Continuous, 0.0, f64::INFINITY)
        .unwrap();
    let y = s
        .create_variable(VarKind::Continuous, 0.0, f64::INFINITY)
        .unwrap();
    s.add_linear_constraint((LinearExpr::var(x) + LinearExpr::var(y)).ge_scalar(5.0))
        .unwrap();
    s.set_objective(
        LinearExpr::term(x, 2.0) + LinearExpr::term(y, 3.0),
        Sense::Minimize,
    )
    .unwrap();

    assert_eq!(s.solve().unwrap(), SolverStatus::Optimal);
    let objective = s.objective_value().expect("missing objective value");
    assert!(
        (objective - 10.0).abs() < 1e-6,
        "Expected objective value 10.0, got {objective}"
    );
    assert!((s.get_value(x).unwrap() - 5.0).abs() < 1e-6);
}

/// maximize integer x subject to x <= 1.5
#[test]
fn test_integer_variable_is_enforced() {
    init_tracing();
    let mut s = session();
    let x = s.create_variable(VarKind::Integer, 0.0, 10.0).unwrap();
    s.add_linear_constraint(LinearExpr::var(x).le_scalar(1.5))
        .unwrap();
    s.set_objective(LinearExpr::var(x), Sense::Maximize)
        .unwrap();

    assert_eq!(s.solve().unwrap(), SolverStatus::Optimal);
    let value = s.get_value(x).expect("missing primal value");
    assert!((value - 1.0).abs() < 1e-6, "Expected x = 1.0, got {value}");
}

#[test]
fn test_infeasible_model_reports_status() {
    init_tracing();
    let mut s = session();
    let x = s.create_variable(VarKind::Binary, 0.0, 1.0).unwrap();
    s.add_linear_constraint(LinearExpr::var(x).ge_scalar(2.0))
        .unwrap();
    s.set_objective(LinearExpr::new(), Sense::Minimize).unwrap();

    assert_eq!(s.solve().unwrap(), SolverStatus::Infeasible);
    assert_eq!(s.get_status(), Some(SolverStatus::Infeasible));
    assert_eq!(s.get_value(x), None);
}

/// The product of a binary and a bounded continuous variable follows the gate.
#[test]
fn test_binary_continuous_product() {
    init_tracing();
    for gate in [0.0, 1.0] {
        let mut s = session();
        let x = s.create_variable(VarKind::Binary, gate, gate).unwrap();
        let w = s.create_variable(VarKind::Continuous, 0.0, 8.0).unwrap();
        let p = s.create_variable(VarKind::Continuous, 0.0, 8.0).unwrap();
        s.add_binary_continuous_product_constraint(x, w, p, 8.0)
            .unwrap();
        s.add_linear_constraint(LinearExpr::var(w).eq_scalar(6.0))
            .unwrap();
        s.set_objective(LinearExpr::var(p), Sense::Maximize).unwrap();

        assert_eq!(s.solve().unwrap(), SolverStatus::Optimal);
        let product = s.get_value(p).unwrap();
        assert!(
            (product - 6.0 * gate).abs() < 1e-6,
            "gate {gate}: expected product {}, got {product}",
            6.0 * gate
        );
    }
}

#[test]
fn test_config_options_are_accepted() {
    init_tracing();
    let config = SolverConfig::builder()
        .with_threads(1)
        .with_time_limit(5.0)
        .with_presolve(Presolve::Off)
        .with_tolerance(1e-6)
        .build()
        .unwrap();
    let mut s = SolverSession::new(config, Box::new(HighsBackend::new()));
    let x = s.create_variable(VarKind::Integer, 0.0, 3.0).unwrap();
    s.set_objective(LinearExpr::var(x), Sense::Maximize).unwrap();

    assert_eq!(s.solve().unwrap(), SolverStatus::Optimal);
    assert_eq!(s.get_value(x), Some(3.0));
}

#[test]
fn test_raw_model_roundtrip() {
    init_tracing();
    let mut model = HighsModel::new();
    let x = model.add_col(1.0, f64::INFINITY, 1.0);
    model.set_objective_sense(ObjectiveSense::Minimize);
    assert_eq!(model.columns(), 1);

    let status = model.solve().expect("HiGHS run failed");
    assert_eq!(status, HighsStatus::Optimal);
    assert_eq!(model.columns(), 0);

    let values = model.col_values().expect("missing solution");
    assert!((values[x] - 1.0).abs() < 1e-6);
    assert!(model.has_primal_solution());
}
