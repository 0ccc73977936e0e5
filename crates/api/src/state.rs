use brokersync_engine::SyncOrchestrator;
use std::sync::Arc;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
