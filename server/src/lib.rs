pub mod config;
pub mod document;
pub mod generation;
pub mod models;
pub mod prompts;
pub mod server;
pub mod store;
pub mod style;
pub mod upstream;

// Re-export commonly used types
pub use config::{ConfigError, ServerConfig, StoreKind};
pub use document::{Document, EditorSession, StyleSnapshot, StyleTarget, ViewMode};
pub use generation::{GenerationBackend, GenerationError, GenerationSession, Generator};
pub use models::ModelRegistry;
pub use store::{ProjectStore, StoreError, StyleMap};
pub use upstream::{ChatCompletions, UpstreamClient};

use std::sync::Arc;

pub type AppState = Arc<ServerState>;

pub struct ServerState {
    pub models: ModelRegistry,
    pub store: Box<dyn ProjectStore>,
    // None while no API key is configured; generation is refused
    pub upstream: Option<Arc<dyn ChatCompletions>>,
}

impl ServerState {
    pub fn new(
        models: ModelRegistry,
        store: Box<dyn ProjectStore>,
        upstream: Option<Arc<dyn ChatCompletions>>,
    ) -> Self {
        Self {
            models,
            store,
            upstream,
        }
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("models", &self.models)
            .field("store", &self.store.storage_type())
            .field("upstream", &self.upstream.as_ref().map(|_| "<dyn ChatCompletions>"))
            .finish()
    }
}
