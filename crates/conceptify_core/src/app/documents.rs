//! crates/conceptify_core/src/app/documents.rs
//!
//! Client-side wrapper around the gateway's OCR endpoints.
//!
//! A network failure is not shown as an ordinary error: it re-runs the
//! liveness probe, and an unreachable gateway ends the session
//! (`PortError::Unauthorized`).

use std::sync::Arc;
use tracing::{info, warn};

use crate::app::auth::AuthManager;
use crate::domain::{OcrResult, ResultSummary, TextEdit};
use crate::ports::{GatewayService, PortError, PortResult, Upload};
use crate::storage::{load_json, save_json, KeyValueStore, StorageError, OCR_RESULT_KEY};

pub struct DocumentWorkflow {
    gateway: Arc<dyn GatewayService>,
    store: Arc<dyn KeyValueStore>,
}

impl DocumentWorkflow {
    pub fn new(gateway: Arc<dyn GatewayService>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { gateway, store }
    }

    /// Uploads a file for extraction and remembers the result as the current one.
    pub async fn upload(&self, auth: &mut AuthManager, upload: Upload) -> PortResult<OcrResult> {
        let outcome = self.gateway.upload(upload).await;
        let result = self.guard(auth, outcome).await?;
        info!("Stored OCR result {}", result.saved_file_name);
        self.remember(&result);
        Ok(result)
    }

    pub async fn list(&self, auth: &mut AuthManager) -> PortResult<Vec<ResultSummary>> {
        let outcome = self.gateway.list_results().await;
        self.guard(auth, outcome).await
    }

    pub async fn open(&self, auth: &mut AuthManager, filename: &str) -> PortResult<OcrResult> {
        let outcome = self.gateway.get_result(filename).await;
        let result = self.guard(auth, outcome).await?;
        self.remember(&result);
        Ok(result)
    }

    /// Saves an edit to the authoritative text and returns the stored document.
    pub async fn save_edit(
        &self,
        auth: &mut AuthManager,
        filename: &str,
        edit: TextEdit,
    ) -> PortResult<OcrResult> {
        if edit.edited_text.is_empty() {
            return Err(PortError::Validation(
                "Missing filename or edited text".to_string(),
            ));
        }
        let outcome = self.gateway.update_result(filename, edit).await;
        self.guard(auth, outcome).await?;
        self.open(auth, filename).await
    }

    pub fn current_result(&self) -> Result<Option<OcrResult>, StorageError> {
        load_json(self.store.as_ref(), OCR_RESULT_KEY)
    }

    fn remember(&self, result: &OcrResult) {
        if let Err(e) = save_json(self.store.as_ref(), OCR_RESULT_KEY, result) {
            warn!("Failed to persist current OCR result: {}", e);
        }
    }

    async fn guard<T>(&self, auth: &mut AuthManager, outcome: PortResult<T>) -> PortResult<T> {
        match outcome {
            Err(PortError::Network(reason)) => {
                let alive = auth
                    .revalidate()
                    .await
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                if alive {
                    Err(PortError::Network(reason))
                } else {
                    Err(PortError::Unauthorized)
                }
            }
            other => other,
        }
    }
}
