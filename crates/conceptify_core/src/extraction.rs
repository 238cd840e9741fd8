//! crates/conceptify_core/src/extraction.rs
//!
//! Parses the loosely-typed JSON printed by the extraction process into a strict
//! `Extraction`, and turns that into the canonical `OcrResult`.
//!
//! The process has emitted several generations of field names over time:
//! camelCase keys at the top level, snake_case keys, and a legacy layout nested
//! under `data.*`. Each canonical field is resolved from an ordered list of
//! candidate locations; the first one present wins. Nothing downstream of this
//! module ever looks at the raw payload.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::domain::{Difficulty, OcrResult, ReadingTime, SummaryDetails};
use crate::ports::{PortError, PortResult};

const FINAL_TEXT: &[&str] = &[
    "/finalExtractedText",
    "/extractedText",
    "/final_text",
    "/data/extraction_results/extracted_text",
];
const RAW_TEXT: &[&str] = &[
    "/originalOcrOutput",
    "/rawText",
    "/raw_ocr_text",
    "/data/extraction_results/raw_text",
];
const CORRECTED_TEXT: &[&str] = &[
    "/enhancedTextNltk",
    "/correctedText",
    "/corrected_text",
    "/data/extraction_results/corrected_text",
];
const CONCEPTS: &[&str] = &["/concepts", "/data/ai_analysis/concepts"];
const DIFFICULTY: &[&str] = &["/difficulty", "/data/ai_analysis/difficulty"];
const WORD_COUNT: &[&str] = &[
    "/wordCount",
    "/word_count",
    "/data/ai_analysis/word_count",
];
const READING_TIME: &[&str] = &[
    "/readingTime",
    "/estimated_reading_time",
    "/data/ai_analysis/estimated_reading_time",
];
const KEY_TOPICS: &[&str] = &[
    "/keyTopics",
    "/key_topics",
    "/data/ai_analysis/key_topics",
];
const CONFIDENCE: &[&str] = &[
    "/confidenceScore",
    "/confidence_score",
    "/data/ai_analysis/confidence_score",
];
const SUMMARY: &[&str] = &["/summary", "/aiSummary", "/data/ai_analysis/summary"];
const SUMMARY_MODEL: &[&str] = &["/summary_model", "/summaryModel", "/data/ai_analysis/summary_model"];
const SUMMARY_DETAILS: &[&str] = &["/summaryDetails", "/data/ai_analysis/summary_details"];
const SUMMARY_TIME: &[&str] = &["/summaryTime", "/data/processing_metadata/summary_time"];
const PROCESSING_METADATA: &[&str] = &["/processingMetadata", "/data/processing_metadata"];
const FILE_INFO: &[&str] = &["/fileInfo", "/data/file_info"];

/// Model credited for summaries when the extractor does not name one.
pub const DEFAULT_SUMMARY_MODEL: &str = "facebook/bart-large-cnn";
const DEFAULT_CONFIDENCE: f64 = 0.85;

/// The two shapes an extractor report can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorReport {
    Completed(Extraction),
    Failed { error: String },
}

/// Normalized extractor output, before it has been given a name in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub raw_text: String,
    pub corrected_text: String,
    pub final_text: String,
    pub concepts: Vec<String>,
    pub difficulty: Difficulty,
    pub word_count: u64,
    pub reading_time: ReadingTime,
    pub key_topics: Vec<String>,
    pub confidence_score: f64,
    pub summary: String,
    pub summary_model: String,
    pub summary_details: SummaryDetails,
    pub summary_time: f64,
    pub processing_metadata: Value,
    pub file_info: Value,
}

impl ExtractorReport {
    /// Parses the process's standard output.
    pub fn parse(stdout: &str) -> PortResult<Self> {
        let payload: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| PortError::MalformedOutput(e.to_string()))?;
        Self::from_value(&payload)
    }

    pub fn from_value(payload: &Value) -> PortResult<Self> {
        if !payload.is_object() {
            return Err(PortError::MalformedOutput(
                "expected a JSON object".to_string(),
            ));
        }

        let failed = payload.get("success").and_then(Value::as_bool) == Some(false)
            || payload.get("error").and_then(Value::as_bool) == Some(true);
        if failed {
            let error = first_str(payload, &["/error", "/error_message"])
                .unwrap_or_else(|| "Unknown processing error".to_string());
            return Ok(ExtractorReport::Failed { error });
        }

        Ok(ExtractorReport::Completed(Extraction::from_value(payload)))
    }

    /// Collapses a logical failure into a port error.
    pub fn into_extraction(self) -> PortResult<Extraction> {
        match self {
            ExtractorReport::Completed(extraction) => Ok(extraction),
            ExtractorReport::Failed { error } => Err(PortError::Extraction {
                message: "OCR processing failed".to_string(),
                details: error,
            }),
        }
    }
}

impl Extraction {
    fn from_value(payload: &Value) -> Self {
        let final_text = first_str(payload, FINAL_TEXT).unwrap_or_default();
        let summary = first_str(payload, SUMMARY).unwrap_or_default();
        let summary_model = if summary.is_empty() {
            String::new()
        } else {
            first_str(payload, SUMMARY_MODEL).unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string())
        };

        Self {
            raw_text: first_str(payload, RAW_TEXT).unwrap_or_default(),
            corrected_text: first_str(payload, CORRECTED_TEXT).unwrap_or_default(),
            concepts: first_strings(payload, CONCEPTS),
            difficulty: first_str(payload, DIFFICULTY)
                .map(Difficulty::from)
                .unwrap_or_default(),
            word_count: first(payload, WORD_COUNT)
                .and_then(as_count)
                .unwrap_or_else(|| final_text.split_whitespace().count() as u64),
            reading_time: first(payload, READING_TIME)
                .and_then(as_reading_time)
                .unwrap_or_default(),
            key_topics: first_strings(payload, KEY_TOPICS),
            confidence_score: first(payload, CONFIDENCE)
                .and_then(Value::as_f64)
                .filter(|c| *c > 0.0)
                .map(|c| c.min(1.0))
                .unwrap_or(DEFAULT_CONFIDENCE),
            summary,
            summary_model,
            summary_details: first(payload, SUMMARY_DETAILS)
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
            summary_time: first(payload, SUMMARY_TIME)
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            processing_metadata: first(payload, PROCESSING_METADATA)
                .filter(|v| v.is_object())
                .cloned()
                .unwrap_or_else(|| json!({ "method": "hybrid" })),
            file_info: first(payload, FILE_INFO)
                .filter(|v| v.is_object())
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            final_text,
        }
    }

    /// Builds the canonical result. The store assigns `saved_file_name` later.
    pub fn into_result(
        self,
        original_file_name: &str,
        file_size: u64,
        user_id: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> OcrResult {
        let mut processing_metadata = self.processing_metadata;
        if let Value::Object(map) = &mut processing_metadata {
            map.insert(
                "userId".to_string(),
                Value::String(user_id.unwrap_or("anonymous").to_string()),
            );
        }

        let mut file_info = self.file_info;
        if let Value::Object(map) = &mut file_info {
            map.insert("filename".to_string(), json!(original_file_name));
            map.insert("size".to_string(), json!(file_size));
            map.insert("type".to_string(), json!(extension_of(original_file_name)));
        }

        OcrResult {
            success: true,
            original_file_name: original_file_name.to_string(),
            saved_file_name: String::new(),
            raw_text: self.raw_text,
            corrected_text: self.corrected_text,
            final_extracted_text: self.final_text,
            concepts: self.concepts,
            difficulty: self.difficulty,
            word_count: self.word_count,
            reading_time: self.reading_time,
            key_topics: self.key_topics,
            confidence_score: self.confidence_score,
            summary: self.summary,
            summary_model: self.summary_model,
            summary_details: self.summary_details,
            summary_time: self.summary_time,
            processing_metadata,
            file_info,
            edited_by_user: false,
            edit_timestamp: None,
            revision: 1,
            created_at,
        }
    }
}

fn extension_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

fn first<'a>(payload: &'a Value, pointers: &[&str]) -> Option<&'a Value> {
    pointers
        .iter()
        .filter_map(|p| payload.pointer(p))
        .find(|v| !v.is_null())
}

/// Empty strings fall through to the next candidate, matching the extractor's
/// habit of emitting `""` for fields it did not fill.
fn first_str(payload: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|p| payload.pointer(p))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_strings(payload: &Value, pointers: &[&str]) -> Vec<String> {
    first(payload, pointers)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

fn as_reading_time(value: &Value) -> Option<ReadingTime> {
    match value {
        Value::String(label) if !label.is_empty() => Some(ReadingTime::Label(label.clone())),
        Value::Number(_) => as_count(value).map(|m| ReadingTime::Minutes(m as u32)),
        _ => None,
    }
}
