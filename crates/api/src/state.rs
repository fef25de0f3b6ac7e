//! Application state shared across handlers.

use aggregator::Inspector;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Orchestrator over every registered cluster
    pub inspector: Arc<Inspector>,
}

impl AppState {
    pub fn new(inspector: Arc<Inspector>) -> Self {
        Self { inspector }
    }
}
