//! services/gateway/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use conceptify_core::ports::{ExtractionService, ResultStore};
use conceptify_core::upload::UploadPolicy;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResultStore>,
    pub extractor: Arc<dyn ExtractionService>,
    pub config: Arc<Config>,
    pub policy: UploadPolicy,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ResultStore>,
        extractor: Arc<dyn ExtractionService>,
        config: Arc<Config>,
    ) -> Self {
        let policy = UploadPolicy::new(config.max_upload_bytes);
        Self {
            store,
            extractor,
            config,
            policy,
        }
    }
}
