//! Backend selection.

use std::fmt;
use std::sync::Arc;

use dagflow_highs::HighsBackend;
use dagflow_solver::{Backend, ExternalSolver, SolverConfig, SolverSession};

/// Backend named by the configuration.
pub fn backend_for(config: &SolverConfig) -> Box<dyn Backend> {
    match config.external_solver() {
        ExternalSolver::Highs => Box::new(HighsBackend::new()),
    }
}

type MakeBackend = dyn Fn(&SolverConfig) -> Box<dyn Backend> + Send + Sync;

/// Creates the backend of every solve attempt.
///
/// The default follows [`backend_for`]. Two factories compare equal only when
/// they share the same closure.
#[derive(Clone)]
pub struct BackendFactory(Arc<MakeBackend>);

impl BackendFactory {
    pub fn new<F>(make: F) -> Self
    where
        F: Fn(&SolverConfig) -> Box<dyn Backend> + Send + Sync + 'static,
    {
        Self(Arc::new(make))
    }

    pub fn create(&self, config: &SolverConfig) -> Box<dyn Backend> {
        (self.0)(config)
    }
}

impl Default for BackendFactory {
    fn default() -> Self {
        Self::new(backend_for)
    }
}

impl fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackendFactory")
    }
}

impl PartialEq for BackendFactory {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Fresh session for one model.
pub(crate) fn new_session(factory: &BackendFactory, config: &SolverConfig) -> SolverSession {
    SolverSession::new(config.clone(), factory.create(config))
}
