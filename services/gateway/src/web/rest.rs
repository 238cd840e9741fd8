//! services/gateway/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ErrorBody, ErrorResponse};
use crate::web::state::AppState;
use crate::web::upload::process_upload;
use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use conceptify_core::domain::{HealthStatus, OcrResult, ResultSummary, TextEdit};
use conceptify_core::ports::Upload;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_results_handler,
        get_result_handler,
        process_ocr_handler,
        update_result_handler,
    ),
    components(
        schemas(HealthResponse, ResultsResponse, UpdateRequest, UpdateResponse, ErrorBody)
    ),
    tags(
        (name = "Conceptify API", description = "Document upload, OCR extraction and stored results.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    message: String,
}

impl From<HealthStatus> for HealthResponse {
    fn from(health: HealthStatus) -> Self {
        Self {
            status: health.status,
            message: health.message,
        }
    }
}

/// The listing of stored results, newest first.
#[derive(Serialize, ToSchema)]
pub struct ResultsResponse {
    #[schema(value_type = Vec<Object>)]
    results: Vec<ResultSummary>,
    count: usize,
}

/// An edit to a stored result's text.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    edited_text: Option<String>,
    /// Reject the edit unless the stored revision still matches.
    #[serde(default)]
    expected_revision: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateResponse {
    success: bool,
    message: String,
    revision: u64,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe used by the client to validate its session.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Gateway is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(
        HealthStatus {
            status: "healthy".to_string(),
            message: "Backend server is running".to_string(),
        }
        .into(),
    )
}

/// List stored OCR results, newest first.
#[utoipa::path(
    get,
    path = "/api/ocr/results",
    responses(
        (status = 200, description = "Stored results", body = ResultsResponse),
        (status = 500, description = "Failed to list OCR results", body = ErrorBody)
    )
)]
pub async fn list_results_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ResultsResponse>, ErrorResponse> {
    let results = app_state.store.list().await.map_err(|e| {
        error!("Error listing OCR results: {}", e);
        ErrorResponse::from(e)
    })?;
    Ok(Json(ResultsResponse {
        count: results.len(),
        results,
    }))
}

/// Fetch one stored OCR result.
#[utoipa::path(
    get,
    path = "/api/ocr/result/{filename}",
    params(("filename" = String, Path, description = "The result's savedFileName.")),
    responses(
        (status = 200, description = "The stored result"),
        (status = 400, description = "Invalid filename", body = ErrorBody),
        (status = 404, description = "OCR result file not found", body = ErrorBody)
    )
)]
pub async fn get_result_handler(
    State(app_state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<OcrResult>, ErrorResponse> {
    let result = app_state.store.get(&filename).await?;
    Ok(Json(result))
}

/// Upload an image or PDF for text extraction.
///
/// Accepts a multipart/form-data request with a required `file` part and an
/// optional `user_id` text part. Blocks until extraction finishes.
#[utoipa::path(
    post,
    path = "/api/ocr/process",
    request_body(content_type = "multipart/form-data", description = "The document to process."),
    responses(
        (status = 200, description = "The normalized, stored result"),
        (status = 400, description = "Missing file or disallowed type/size", body = ErrorBody),
        (status = 500, description = "Extraction failed or produced unreadable output", body = ErrorBody),
        (status = 503, description = "Too many extractions in progress", body = ErrorBody),
        (status = 504, description = "Extraction timed out", body = ErrorBody)
    )
)]
pub async fn process_ocr_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<OcrResult>, ErrorResponse> {
    info!("OCR processing request received");
    let mut file = None;
    let mut user_id = None;

    let multipart_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("Upload rejected by body limit: {}", e);
            ErrorResponse::from(app_state.policy.too_large())
        } else {
            ErrorResponse::new(e.status(), e.body_text(), None)
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            Some("user_id") => {
                let text = field.text().await.map_err(multipart_error)?;
                user_id = Some(text).filter(|id| !id.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| ErrorResponse::bad_request("No file uploaded"))?;

    let upload = Upload {
        file_name,
        content_type,
        bytes,
        user_id,
    };
    let result = process_upload(&app_state, upload).await.map_err(|e| {
        error!("OCR processing failed: {}", e);
        ErrorResponse::from(e)
    })?;
    Ok(Json(result))
}

/// Replace the authoritative text of a stored result.
#[utoipa::path(
    put,
    path = "/api/ocr/update/{filename}",
    params(("filename" = String, Path, description = "The result's savedFileName.")),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Result updated", body = UpdateResponse),
        (status = 400, description = "Missing filename or edited text", body = ErrorBody),
        (status = 404, description = "OCR result file not found", body = ErrorBody),
        (status = 409, description = "Stored revision no longer matches", body = ErrorBody)
    )
)]
pub async fn update_result_handler(
    State(app_state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ErrorResponse> {
    let Json(request) = payload.map_err(|e| ErrorResponse::bad_request(e.body_text()))?;
    let edited_text = request
        .edited_text
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ErrorResponse::bad_request("Missing filename or edited text"))?;

    let updated = app_state
        .store
        .update_text(
            &filename,
            TextEdit {
                edited_text,
                expected_revision: request.expected_revision,
            },
        )
        .await?;

    Ok(Json(UpdateResponse {
        success: true,
        message: "OCR result updated successfully".to_string(),
        revision: updated.revision,
    }))
}
