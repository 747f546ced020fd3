//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use notebook_core::{AuthService, ContentService, NotebookStore, TokenCodec};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Nothing in here is mutated after startup; per-request identity travels as
/// an explicit argument into the services.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub content: ContentService,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services around one store and the configured signing secret.
    pub fn new(store: Arc<dyn NotebookStore>, config: Arc<Config>) -> Self {
        let tokens = TokenCodec::new(config.jwt_secret.as_bytes().to_vec());
        Self {
            auth: AuthService::new(store.clone(), tokens),
            content: ContentService::new(store),
            config,
        }
    }
}
