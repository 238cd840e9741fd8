//! crates/conceptify_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the filesystem, the extraction process and HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::domain::{DocumentRef, HealthStatus, OcrResult, ResultSummary, TextEdit};
use crate::extraction::Extraction;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Extraction failed: {message}")]
    Extraction { message: String, details: String },
    #[error("Extraction output could not be parsed: {0}")]
    MalformedOutput(String),
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("Too many extractions in progress")]
    Busy,
    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),
    #[error("Gateway unreachable: {0}")]
    Network(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Server-side Ports
//=========================================================================================

/// Durable per-document storage for processed uploads.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Assigns a unique `saved_file_name` derived from the original file name,
    /// persists the result and returns it.
    async fn save(&self, result: OcrResult) -> PortResult<OcrResult>;

    async fn get(&self, filename: &str) -> PortResult<OcrResult>;

    /// Lists stored documents, newest first.
    async fn list(&self) -> PortResult<Vec<ResultSummary>>;

    /// Rewrites only the authoritative text of a stored document.
    async fn update_text(&self, filename: &str, edit: TextEdit) -> PortResult<OcrResult>;
}

/// The external program that turns an image or PDF into text plus analysis.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, file: &Path, user_id: Option<&str>) -> PortResult<Extraction>;
}

//=========================================================================================
// Client-side Ports
//=========================================================================================

/// A file picked by the user for upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub user_id: Option<String>,
}

/// The HTTP gateway as seen from the client.
#[async_trait]
pub trait GatewayService: Send + Sync {
    /// Liveness probe.
    async fn health(&self) -> PortResult<HealthStatus>;

    async fn upload(&self, upload: Upload) -> PortResult<OcrResult>;

    async fn list_results(&self) -> PortResult<Vec<ResultSummary>>;

    async fn get_result(&self, filename: &str) -> PortResult<OcrResult>;

    async fn update_result(&self, filename: &str, edit: TextEdit) -> PortResult<()>;
}

/// Produces the assistant's side of a chat exchange.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn reply(&self, message: &str, context: Option<&DocumentRef>) -> PortResult<String>;
}
