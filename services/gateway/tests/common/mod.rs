//! Shared fixtures for the gateway integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use conceptify_core::extraction::{Extraction, ExtractorReport};
use conceptify_core::ports::{ExtractionService, PortError, PortResult};
use gateway_lib::adapters::FsResultStore;
use gateway_lib::config::Config;
use gateway_lib::web::{build_router, state::AppState};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const BOUNDARY: &str = "conceptify-test-boundary";

/// Stands in for the OCR process: answers with a canned report or error and
/// records what it was asked to read.
pub struct FakeExtractor {
    outcome: Mutex<PortResult<Value>>,
    pub calls: Mutex<Vec<(PathBuf, bool, Option<String>)>>,
}

impl FakeExtractor {
    pub fn returning(payload: Value) -> Self {
        Self {
            outcome: Mutex::new(Ok(payload)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: PortError) -> Self {
        Self {
            outcome: Mutex::new(Err(err)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ExtractionService for FakeExtractor {
    async fn extract(&self, file: &Path, user_id: Option<&str>) -> PortResult<Extraction> {
        self.calls.lock().unwrap().push((
            file.to_path_buf(),
            file.exists(),
            user_id.map(str::to_string),
        ));
        let outcome = self.outcome.lock().unwrap().clone();
        ExtractorReport::from_value(&outcome?)?.into_extraction()
    }
}

pub fn cell_report() -> Value {
    json!({
        "success": true,
        "originalOcrOutput": "Teh cell is the basic unit of life",
        "enhancedTextNltk": "The cell is the basic unit of life",
        "finalExtractedText": "The cell is the basic unit of life",
        "concepts": ["cell", "life"],
        "difficulty": "Easy",
        "wordCount": 8,
        "readingTime": 1,
        "keyTopics": ["biology"],
        "confidenceScore": 0.93,
        "summary": "Cells are the unit of life."
    })
}

pub struct TestApp {
    pub dir: TempDir,
    pub extractor: Arc<FakeExtractor>,
    pub router: Router,
}

impl TestApp {
    pub async fn new(extractor: FakeExtractor) -> Self {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("data");
        let uploads = dir.path().join("uploads");
        let config = Config::from_lookup(|key: &str| match key {
            "RESULTS_DIR" => Some(results.display().to_string()),
            "UPLOADS_DIR" => Some(uploads.display().to_string()),
            "MAX_UPLOAD_BYTES" => Some("1048576".to_string()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(FsResultStore::open(&config.results_dir).await.unwrap());
        let extractor = Arc::new(extractor);
        let state = AppState::new(store, extractor.clone(), Arc::new(config));
        Self {
            dir,
            extractor,
            router: build_router(Arc::new(state)),
        }
    }

    pub fn results_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn stored_files(&self) -> Vec<String> {
        list_dir(&self.results_dir())
    }

    pub fn staged_files(&self) -> Vec<String> {
        list_dir(&self.uploads_dir())
    }
}

fn list_dir(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// A part of a multipart form: `(name, filename, content type, body)`.
pub type FormPart<'a> = (&'a str, Option<&'a str>, Option<&'a str>, &'a [u8]);

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", name);
        if let Some(filename) = filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Serves the router on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
