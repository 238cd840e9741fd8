//! services/gateway/src/adapters/fs_store.rs
//!
//! This module contains the result store adapter, which is the concrete
//! implementation of the `ResultStore` port from the `core` crate. Every
//! processed upload is one pretty-printed JSON file in the results directory,
//! named `{baseName}_{timestampMillis}.json`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conceptify_core::domain::{OcrResult, ResultSummary, TextEdit};
use conceptify_core::ports::{PortError, PortResult, ResultStore};
use serde_json::{json, Value};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Collisions on the same millisecond stamp are resolved by advancing it; this
/// bounds how far.
const MAX_NAME_ATTEMPTS: i64 = 1000;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A filesystem adapter that implements the `ResultStore` port.
pub struct FsResultStore {
    dir: PathBuf,
    /// Serializes read-modify-write updates within this process.
    write_lock: Mutex<()>,
}

impl FsResultStore {
    /// Opens the store, creating the results directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, filename: &str) -> PortResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.dir.join(filename))
    }

    async fn read(&self, filename: &str) -> PortResult<OcrResult> {
        let path = self.path_for(filename)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| map_io(filename, e))?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io(filename, e))?;
        decode(filename, &content, &metadata).map_err(|e| {
            PortError::Unexpected(format!("Stored result {} is unreadable: {}", filename, e))
        })
    }

    async fn summarize(&self, filename: String, path: &Path) -> PortResult<ResultSummary> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io(&filename, e))?;
        let size = metadata.len();

        let parsed = tokio::fs::read_to_string(path)
            .await
            .ok()
            .and_then(|content| decode(&filename, &content, &metadata).ok());

        let summary = match parsed {
            Some(result) => ResultSummary {
                original_name: if result.original_file_name.is_empty() {
                    display_name(&filename)
                } else {
                    result.original_file_name.clone()
                },
                created: result.created_at,
                size,
                text_preview: result.text_preview(),
                filename,
            },
            None => {
                warn!("Error reading OCR result file {}", filename);
                ResultSummary {
                    original_name: display_name(&filename),
                    created: file_time(&metadata),
                    size,
                    text_preview: "Error reading file".to_string(),
                    filename,
                }
            }
        };
        Ok(summary)
    }
}

//=========================================================================================
// `ResultStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ResultStore for FsResultStore {
    async fn save(&self, mut result: OcrResult) -> PortResult<OcrResult> {
        let base = base_name(&result.original_file_name);
        let mut stamp = result.created_at.timestamp_millis();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = format!("{}_{}.json", base, stamp);
            let path = self.dir.join(&filename);
            result.saved_file_name = filename.clone();
            let body = serde_json::to_string_pretty(&result)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists, advancing stamp", filename);
                    stamp += 1;
                    continue;
                }
                Err(e) => return Err(map_io(&filename, e)),
            };
            fill_or_discard(file, &path, &filename, body.as_bytes()).await?;

            info!("OCR result saved: {}", filename);
            return Ok(result);
        }

        Err(PortError::Unexpected(format!(
            "Could not find a free result name for {}",
            base
        )))
    }

    async fn get(&self, filename: &str) -> PortResult<OcrResult> {
        self.read(filename).await
    }

    async fn list(&self) -> PortResult<Vec<ResultSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
        {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(".json") {
                continue;
            }
            match self.summarize(filename, &entry.path()).await {
                Ok(summary) => summaries.push(summary),
                // Removed between listing and reading.
                Err(PortError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        summaries.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(summaries)
    }

    async fn update_text(&self, filename: &str, edit: TextEdit) -> PortResult<OcrResult> {
        if filename.is_empty() || edit.edited_text.is_empty() {
            return Err(PortError::Validation(
                "Missing filename or edited text".to_string(),
            ));
        }
        let path = self.path_for(filename)?;

        let _guard = self.write_lock.lock().await;
        let mut result = self.read(filename).await?;

        if let Some(expected) = edit.expected_revision {
            if expected != result.revision {
                return Err(PortError::Conflict(format!(
                    "expected revision {}, stored revision is {}",
                    expected, result.revision
                )));
            }
        }

        result.apply_edit(edit.edited_text, Utc::now());
        let body = serde_json::to_string_pretty(&result)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let tmp = self.dir.join(format!(".{}.tmp", filename));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| map_io(filename, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| map_io(filename, e))?;

        info!("OCR result updated: {} (revision {})", filename, result.revision);
        Ok(result)
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Rejects names that could resolve outside the results directory. A valid
/// name is exactly one plain path component.
pub fn validate_filename(filename: &str) -> PortResult<()> {
    let mut components = Path::new(filename).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || filename.contains(['/', '\\', '\0']) {
        return Err(PortError::Validation(format!(
            "Invalid result filename: {}",
            filename
        )));
    }
    Ok(())
}

/// The stem of the uploaded file's name, reduced to a safe file name component.
fn base_name(original_file_name: &str) -> String {
    let stem = Path::new(original_file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Writes a freshly created result file, removing it again if the write fails
/// so no truncated result is left behind.
async fn fill_or_discard<W: AsyncWrite + Unpin>(
    mut file: W,
    path: &Path,
    filename: &str,
    body: &[u8],
) -> PortResult<()> {
    let written = match file.write_all(body).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    drop(file);
    if let Err(e) = written {
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove partial result {}: {}", filename, remove_err);
        }
        return Err(map_io(filename, e));
    }
    Ok(())
}

/// Decodes a stored result. Files written before `createdAt` was recorded get
/// the stamp from their name, or failing that the file's own timestamps, so a
/// legacy entry keeps one stable position in the listing.
fn decode(filename: &str, content: &str, metadata: &Metadata) -> serde_json::Result<OcrResult> {
    let mut value: Value = serde_json::from_str(content)?;
    if let Some(object) = value.as_object_mut() {
        if object.get("createdAt").map_or(true, Value::is_null) {
            let created = OcrResult::stamp_from_saved_name(filename)
                .unwrap_or_else(|| file_time(metadata));
            object.insert("createdAt".to_string(), json!(created));
        }
    }
    let mut result: OcrResult = serde_json::from_value(value)?;
    // Files written before names were recorded in the body.
    if result.saved_file_name.is_empty() {
        result.saved_file_name = filename.to_string();
    }
    Ok(result)
}

fn file_time(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// A readable name for files whose body could not be parsed.
fn display_name(filename: &str) -> String {
    filename.replacen('_', " ", 1).replacen(".json", "", 1)
}

fn map_io(filename: &str, e: std::io::Error) -> PortError {
    if e.kind() == ErrorKind::NotFound {
        PortError::NotFound(filename.to_string())
    } else {
        PortError::Unexpected(format!("{}: {}", filename, e))
    }
}
