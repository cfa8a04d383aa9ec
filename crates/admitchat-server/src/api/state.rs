use std::sync::Arc;

use crate::relay::CompletionRelay;

/// Shared handler state. The relay holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<CompletionRelay>,
}

impl AppState {
    pub fn new(relay: CompletionRelay) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}
