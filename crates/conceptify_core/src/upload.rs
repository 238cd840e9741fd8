//! crates/conceptify_core/src/upload.rs
//!
//! Upload admission rules, checked before any extraction work is started.

use std::path::Path;

use crate::ports::{PortError, PortResult};

/// Default upload size limit: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions accepted for extraction, lowercase and without the dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "pdf"];

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// The rejection for a file over the size limit.
    pub fn too_large(&self) -> PortError {
        PortError::Validation(format!(
            "File exceeds the {} MB upload limit",
            self.max_bytes / (1024 * 1024)
        ))
    }

    /// Checks the size limit and the extension/MIME allow-list.
    ///
    /// Both the extension and the MIME type must name an allowed type.
    pub fn validate(&self, file_name: &str, mime_type: &str, size: u64) -> PortResult<()> {
        if size > self.max_bytes {
            return Err(self.too_large());
        }

        let extension = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let extension_ok = ALLOWED_EXTENSIONS.contains(&extension.as_str());

        let mime = mime_type.to_ascii_lowercase();
        let mime_ok = ALLOWED_EXTENSIONS.iter().any(|allowed| mime.contains(allowed));

        if extension_ok && mime_ok {
            Ok(())
        } else {
            Err(PortError::Validation(format!(
                "Only image files (JPEG, JPG, PNG, GIF) and PDF files are allowed! Permitted extensions: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )))
        }
    }
}
