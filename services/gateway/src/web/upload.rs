//! services/gateway/src/web/upload.rs
//!
//! The upload pipeline behind `POST /ocr/process`: admit the file, stage it in
//! the uploads directory, run the extractor on it, normalize and persist the
//! result. The staged file is removed on every path out of the pipeline.

use chrono::Utc;
use conceptify_core::domain::OcrResult;
use conceptify_core::ports::{PortError, PortResult, Upload};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::web::state::AppState;

/// An uploaded file staged on disk for the extractor.
///
/// [`StagedUpload::remove`] deletes it on the normal path; `Drop` only cleans
/// up when the request is abandoned before that.
#[derive(Debug)]
pub struct StagedUpload {
    path: Option<PathBuf>,
}

impl StagedUpload {
    /// Writes the upload's bytes under `dir` with a generated name that keeps
    /// the original extension.
    pub async fn write(dir: &Path, file_name: &str, bytes: &[u8]) -> PortResult<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("Cannot create upload directory: {}", e)))?;

        let extension = Path::new(file_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();
        let path = dir.join(format!(
            "file-{}-{}{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        ));

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("Cannot stage upload: {}", e)))?;
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    pub async fn remove(mut self) {
        if let Some(path) = self.path.take() {
            log_removal(&path, tokio::fs::remove_file(&path).await);
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            log_removal(&path, std::fs::remove_file(&path));
        }
    }
}

fn log_removal(path: &Path, outcome: std::io::Result<()>) {
    match outcome {
        Ok(()) => info!("Cleaned up uploaded file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to clean up uploaded file {}: {}", path.display(), e),
    }
}

/// The MIME type used for the allow-list check: the declared one, or a guess
/// from the file name when the client sent none.
pub fn effective_mime(file_name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) => ct.to_string(),
        None => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Runs one upload through admission, extraction and storage.
pub async fn process_upload(state: &AppState, upload: Upload) -> PortResult<OcrResult> {
    let size = upload.bytes.len() as u64;
    let mime = effective_mime(&upload.file_name, upload.content_type.as_deref());
    state.policy.validate(&upload.file_name, &mime, size)?;
    info!("Processing file: {} ({} bytes, {})", upload.file_name, size, mime);

    let staged = StagedUpload::write(&state.config.uploads_dir, &upload.file_name, &upload.bytes).await?;
    let extraction = state
        .extractor
        .extract(staged.path(), upload.user_id.as_deref())
        .await;
    staged.remove().await;

    let result = extraction?.into_result(
        &upload.file_name,
        size,
        upload.user_id.as_deref(),
        Utc::now(),
    );
    state.store.save(result).await
}
