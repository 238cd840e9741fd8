//! Test doubles shared by the client-side modules.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::{
    Difficulty, HealthStatus, OcrResult, ReadingTime, ResultSummary, SummaryDetails, TextEdit,
};
use crate::ports::{GatewayService, PortError, PortResult, Upload};

pub fn sample_result(saved_file_name: &str, text: &str) -> OcrResult {
    OcrResult {
        success: true,
        original_file_name: format!("{}.png", saved_file_name.trim_end_matches(".json")),
        saved_file_name: saved_file_name.to_string(),
        raw_text: text.to_string(),
        corrected_text: text.to_string(),
        final_extracted_text: text.to_string(),
        concepts: vec!["Photosynthesis".to_string()],
        difficulty: Difficulty::Beginner,
        word_count: text.split_whitespace().count() as u64,
        reading_time: ReadingTime::Minutes(1),
        key_topics: vec![
            "Chlorophyll".to_string(),
            "Light".to_string(),
            "Glucose".to_string(),
            "Oxygen".to_string(),
        ],
        confidence_score: 0.9,
        summary: "Plants make sugar from light.".to_string(),
        summary_model: "facebook/bart-large-cnn".to_string(),
        summary_details: SummaryDetails::default(),
        summary_time: 0.0,
        processing_metadata: json!({}),
        file_info: json!({}),
        edited_by_user: false,
        edit_timestamp: None,
        revision: 1,
        created_at: Utc::now(),
    }
}

/// An in-memory gateway whose reachability can be switched off.
pub struct FakeGateway {
    reachable: AtomicBool,
    results: Mutex<Vec<OcrResult>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            results: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn check(&self) -> PortResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PortError::Network("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl GatewayService for FakeGateway {
    async fn health(&self) -> PortResult<HealthStatus> {
        self.check()?;
        Ok(HealthStatus {
            status: "healthy".to_string(),
            message: "Backend server is running".to_string(),
        })
    }

    async fn upload(&self, upload: Upload) -> PortResult<OcrResult> {
        self.check()?;
        let base = upload.file_name.rsplit_once('.').map_or(upload.file_name.as_str(), |(b, _)| b);
        let mut results = self.results.lock().unwrap();
        let result = sample_result(
            &format!("{}_{}.json", base, 1_700_000_000_000u64 + results.len() as u64),
            "Plants convert light into chemical energy.",
        );
        results.push(result.clone());
        Ok(result)
    }

    async fn list_results(&self) -> PortResult<Vec<ResultSummary>> {
        self.check()?;
        let results = self.results.lock().unwrap();
        Ok(results
            .iter()
            .map(|r| ResultSummary {
                filename: r.saved_file_name.clone(),
                original_name: r.original_file_name.clone(),
                created: r.created_at,
                size: 0,
                text_preview: r.text_preview(),
            })
            .collect())
    }

    async fn get_result(&self, filename: &str) -> PortResult<OcrResult> {
        self.check()?;
        let results = self.results.lock().unwrap();
        results
            .iter()
            .find(|r| r.saved_file_name == filename)
            .cloned()
            .ok_or_else(|| PortError::NotFound(filename.to_string()))
    }

    async fn update_result(&self, filename: &str, edit: TextEdit) -> PortResult<()> {
        self.check()?;
        let mut results = self.results.lock().unwrap();
        let result = results
            .iter_mut()
            .find(|r| r.saved_file_name == filename)
            .ok_or_else(|| PortError::NotFound(filename.to_string()))?;
        result.apply_edit(edit.edited_text, Utc::now());
        Ok(())
    }
}
