pub mod config;
pub mod ingest;
pub mod model;
pub mod store;
pub mod webhook;

use std::sync::Arc;

use store::EntityStore;

/// Shared application state handed to every request handler.
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub webhook_secret: String,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, webhook_secret: String) -> Self {
        Self {
            store,
            webhook_secret,
        }
    }
}
