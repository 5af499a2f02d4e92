use std::sync::Arc;

use crate::analysis::pipeline::AnalysisPipeline;
use crate::config::Config;
use crate::persistence::PersistenceCoordinator;
use crate::report::ReportRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every collaborator is built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    pub persistence: PersistenceCoordinator,
    pub renderer: Arc<dyn ReportRenderer>,
    pub config: Config,
}
