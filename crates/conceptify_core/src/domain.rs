//! crates/conceptify_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Every type here is also the persisted JSON shape, so field names follow the
//! camelCase layout the browser client and the result files use.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

//=========================================================================================
// OCR Results
//=========================================================================================

/// Difficulty label reported by the extraction process.
///
/// The extractor is not consistent about its vocabulary, so unknown labels are
/// kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Beginner,
    Intermediate,
    Advanced,
    Unknown,
    Other(String),
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl From<String> for Difficulty {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            "beginner" => Difficulty::Beginner,
            "intermediate" => Difficulty::Intermediate,
            "advanced" => Difficulty::Advanced,
            "unknown" => Difficulty::Unknown,
            _ => Difficulty::Other(label),
        }
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.to_string()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
            Difficulty::Unknown => "Unknown",
            Difficulty::Other(label) => label,
        };
        f.write_str(label)
    }
}

/// Estimated reading time: either whole minutes or a free-form label like "1 min".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingTime {
    Minutes(u32),
    Label(String),
}

impl Default for ReadingTime {
    fn default() -> Self {
        ReadingTime::Label("1 min".to_string())
    }
}

impl fmt::Display for ReadingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingTime::Minutes(m) => write!(f, "{} min", m),
            ReadingTime::Label(label) => f.write_str(label),
        }
    }
}

/// How the extractor produced its summary. Keys are snake_case as emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trimmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trimmed_words: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// One processed upload, as stored in the Result Store and returned to clients.
///
/// `saved_file_name` is assigned once by the store and never changes.
/// `final_extracted_text` is the authoritative text; it is also serialized as
/// the legacy `extractedText` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OcrResultRecord", into = "OcrResultRecord")]
pub struct OcrResult {
    pub success: bool,
    pub original_file_name: String,
    pub saved_file_name: String,
    pub raw_text: String,
    pub corrected_text: String,
    pub final_extracted_text: String,
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
    pub edited_by_user: bool,
    pub edit_timestamp: Option<DateTime<Utc>>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
}

impl OcrResult {
    /// Replaces the authoritative text and stamps the edit.
    pub fn apply_edit(&mut self, text: String, at: DateTime<Utc>) {
        self.final_extracted_text = text;
        self.edited_by_user = true;
        self.edit_timestamp = Some(at);
        self.revision += 1;
    }

    /// The creation time encoded in a `{baseName}_{timestampMillis}.json` name.
    pub fn stamp_from_saved_name(name: &str) -> Option<DateTime<Utc>> {
        let (_, stamp) = name.strip_suffix(".json")?.rsplit_once('_')?;
        Utc.timestamp_millis_opt(stamp.parse().ok()?).single()
    }

    /// A short preview of the authoritative text for listings.
    pub fn text_preview(&self) -> String {
        if self.final_extracted_text.is_empty() {
            return "No text available".to_string();
        }
        let preview: String = self.final_extracted_text.chars().take(100).collect();
        format!("{}...", preview)
    }
}

/// The on-disk layout of an `OcrResult`.
///
/// Serializing writes the canonical keys plus the legacy `extractedText` alias.
/// Deserializing also accepts files written by the earlier gateway, which kept
/// text and analysis nested under `data.extraction_results` and `data.ai_analysis`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResultRecord {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    original_file_name: String,
    #[serde(default)]
    saved_file_name: String,
    #[serde(default)]
    raw_text: Option<String>,
    #[serde(default)]
    corrected_text: Option<String>,
    #[serde(default)]
    final_extracted_text: Option<String>,
    #[serde(default)]
    extracted_text: Option<String>,
    #[serde(default)]
    concepts: Option<Vec<String>>,
    #[serde(default)]
    difficulty: Option<Difficulty>,
    #[serde(default)]
    word_count: Option<u64>,
    #[serde(default)]
    reading_time: Option<ReadingTime>,
    #[serde(default)]
    key_topics: Option<Vec<String>>,
    #[serde(default)]
    confidence_score: Option<f64>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    summary_model: String,
    #[serde(default)]
    summary_details: SummaryDetails,
    #[serde(default)]
    summary_time: f64,
    #[serde(default)]
    processing_metadata: Value,
    #[serde(default)]
    file_info: Value,
    #[serde(default)]
    edited_by_user: bool,
    #[serde(default)]
    edit_timestamp: Option<DateTime<Utc>>,
    #[serde(default = "default_revision")]
    revision: u64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    data: Option<LegacyData>,
}

#[derive(Deserialize, Default)]
struct LegacyData {
    #[serde(default)]
    extraction_results: LegacyExtraction,
    #[serde(default)]
    ai_analysis: LegacyAnalysis,
    #[serde(default)]
    processing_metadata: Option<Value>,
    #[serde(default)]
    file_info: Option<Value>,
}

#[derive(Deserialize, Default)]
struct LegacyExtraction {
    extracted_text: Option<String>,
    raw_text: Option<String>,
    corrected_text: Option<String>,
    #[serde(default)]
    edited_by_user: bool,
    edit_timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
struct LegacyAnalysis {
    concepts: Option<Vec<String>>,
    difficulty: Option<Difficulty>,
    word_count: Option<u64>,
    estimated_reading_time: Option<ReadingTime>,
    key_topics: Option<Vec<String>>,
    confidence_score: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn default_revision() -> u64 {
    1
}

impl From<OcrResultRecord> for OcrResult {
    fn from(record: OcrResultRecord) -> Self {
        let legacy = record.data.unwrap_or_default();
        let text = legacy.extraction_results;
        let analysis = legacy.ai_analysis;

        Self {
            success: record.success,
            original_file_name: record.original_file_name,
            saved_file_name: record.saved_file_name.clone(),
            raw_text: record.raw_text.or(text.raw_text).unwrap_or_default(),
            corrected_text: record
                .corrected_text
                .or(text.corrected_text)
                .unwrap_or_default(),
            final_extracted_text: record
                .final_extracted_text
                .or(record.extracted_text)
                .or(text.extracted_text)
                .unwrap_or_default(),
            concepts: record.concepts.or(analysis.concepts).unwrap_or_default(),
            difficulty: record
                .difficulty
                .or(analysis.difficulty)
                .unwrap_or_default(),
            word_count: record.word_count.or(analysis.word_count).unwrap_or(0),
            reading_time: record
                .reading_time
                .or(analysis.estimated_reading_time)
                .unwrap_or_default(),
            key_topics: record.key_topics.or(analysis.key_topics).unwrap_or_default(),
            confidence_score: record
                .confidence_score
                .or(analysis.confidence_score)
                .unwrap_or(0.0),
            summary: record.summary,
            summary_model: record.summary_model,
            summary_details: record.summary_details,
            summary_time: record.summary_time,
            processing_metadata: non_null_or(
                record.processing_metadata,
                legacy.processing_metadata,
            ),
            file_info: non_null_or(record.file_info, legacy.file_info),
            edited_by_user: record.edited_by_user || text.edited_by_user,
            edit_timestamp: record.edit_timestamp.or(text.edit_timestamp),
            revision: record.revision,
            created_at: record
                .created_at
                .or_else(|| OcrResult::stamp_from_saved_name(&record.saved_file_name))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }
}

impl From<OcrResult> for OcrResultRecord {
    fn from(result: OcrResult) -> Self {
        Self {
            success: result.success,
            original_file_name: result.original_file_name,
            saved_file_name: result.saved_file_name,
            raw_text: Some(result.raw_text),
            corrected_text: Some(result.corrected_text),
            extracted_text: Some(result.final_extracted_text.clone()),
            final_extracted_text: Some(result.final_extracted_text),
            concepts: Some(result.concepts),
            difficulty: Some(result.difficulty),
            word_count: Some(result.word_count),
            reading_time: Some(result.reading_time),
            key_topics: Some(result.key_topics),
            confidence_score: Some(result.confidence_score),
            summary: result.summary,
            summary_model: result.summary_model,
            summary_details: result.summary_details,
            summary_time: result.summary_time,
            processing_metadata: result.processing_metadata,
            file_info: result.file_info,
            edited_by_user: result.edited_by_user,
            edit_timestamp: result.edit_timestamp,
            revision: result.revision,
            created_at: Some(result.created_at),
            data: None,
        }
    }
}

fn non_null_or(value: Value, fallback: Option<Value>) -> Value {
    if value.is_null() {
        fallback.unwrap_or(Value::Null)
    } else {
        value
    }
}

/// One entry of the Result Store listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub filename: String,
    pub original_name: String,
    pub created: DateTime<Utc>,
    pub size: u64,
    pub text_preview: String,
}

/// A user edit to a stored result's authoritative text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub edited_text: String,
    /// When set, the edit only applies if the stored revision still matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_revision: Option<u64>,
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// A single message within a chat session. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    #[serde(deserialize_with = "lenient_time::deserialize")]
    pub timestamp: DateTime<Utc>,
}

/// A processed document attached to a chat session as context.
/// `id` is the `saved_file_name` of the `OcrResult` it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub content: String,
    pub key_topics: Vec<String>,
    pub word_count: u64,
    pub reading_time: ReadingTime,
    #[serde(deserialize_with = "lenient_time::deserialize")]
    pub added_at: DateTime<Utc>,
}

impl DocumentRef {
    pub fn from_result(result: &OcrResult, added_at: DateTime<Utc>) -> Self {
        Self {
            id: result.saved_file_name.clone(),
            name: result.original_file_name.clone(),
            summary: result.summary.clone(),
            content: result.final_extracted_text.clone(),
            key_topics: result.key_topics.clone(),
            word_count: result.word_count,
            reading_time: result.reading_time.clone(),
            added_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    pub message_count: usize,
    #[serde(default)]
    pub context: Option<DocumentRef>,
}

/// A named, persisted thread of messages and attached documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
    #[serde(deserialize_with = "lenient_time::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_time::deserialize")]
    pub updated_at: DateTime<Utc>,
    pub metadata: ChatMetadata,
}

//=========================================================================================
// Quiz
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

/// The in-progress quiz instance for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTest {
    pub document_id: String,
    pub document_name: String,
    #[serde(deserialize_with = "lenient_time::deserialize")]
    pub timestamp: DateTime<Utc>,
}

/// A graded answer kept alongside a test record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub question: String,
    pub selected_answer: Option<usize>,
    pub correct_answer: usize,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub document_id: String,
    pub document_name: String,
    #[serde(deserialize_with = "lenient_time::deserialize")]
    pub timestamp: DateTime<Utc>,
    pub score: u32,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub correct_answers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_answers: Option<Vec<QuestionAnswer>>,
}

//=========================================================================================
// Users
//=========================================================================================

/// The client-held user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub email: String,
    pub name: String,
}

impl UserSession {
    /// Builds a user record, deriving the name from the email's local part when
    /// none is supplied.
    pub fn new(email: &str, name: Option<&str>) -> Self {
        let email = email.trim().to_string();
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => email.split('@').next().unwrap_or_default().to_string(),
        };
        Self { email, name }
    }
}

//=========================================================================================
// Gateway Liveness
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

/// Client-side timestamps are RFC 3339 strings, but records written by the
/// browser client may carry epoch milliseconds instead.
mod lenient_time {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stamp {
        Text(DateTime<Utc>),
        Millis(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        match Stamp::deserialize(d)? {
            Stamp::Text(at) => Ok(at),
            Stamp::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", ms))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> OcrResult {
        OcrResult {
            success: true,
            original_file_name: "notes.png".to_string(),
            saved_file_name: "notes_1700000000000.json".to_string(),
            raw_text: "raw".to_string(),
            corrected_text: "corrected".to_string(),
            final_extracted_text: "final".to_string(),
            concepts: vec!["Cells".to_string()],
            difficulty: Difficulty::Intermediate,
            word_count: 1,
            reading_time: ReadingTime::Minutes(1),
            key_topics: vec![],
            confidence_score: 0.9,
            summary: String::new(),
            summary_model: String::new(),
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

    #[test]
    fn serialized_result_carries_legacy_text_alias() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["finalExtractedText"], "final");
        assert_eq!(value["extractedText"], "final");
        assert_eq!(value["rawText"], "raw");
        assert_eq!(value["correctedText"], "corrected");
        assert_eq!(value["difficulty"], "Intermediate");
    }

    #[test]
    fn extracted_text_alias_is_read_when_final_text_is_absent() {
        let result: OcrResult = serde_json::from_value(json!({
            "originalFileName": "a.png",
            "savedFileName": "a_1.json",
            "extractedText": "from alias"
        }))
        .unwrap();
        assert_eq!(result.final_extracted_text, "from alias");
        assert_eq!(result.revision, 1);
    }

    #[test]
    fn legacy_nested_layout_is_readable() {
        let result: OcrResult = serde_json::from_value(json!({
            "success": true,
            "originalFileName": "scan.pdf",
            "savedFileName": "scan_42.json",
            "data": {
                "extraction_results": {
                    "extracted_text": "legacy text",
                    "raw_text": "legacy raw",
                    "corrected_text": "legacy corrected",
                    "edited_by_user": true
                },
                "ai_analysis": {
                    "concepts": ["Biology"],
                    "difficulty": "Hard",
                    "word_count": 2,
                    "estimated_reading_time": "1 min",
                    "key_topics": ["Cells"],
                    "confidence_score": 0.5
                },
                "file_info": { "filename": "scan.pdf" }
            }
        }))
        .unwrap();

        assert_eq!(result.final_extracted_text, "legacy text");
        assert_eq!(result.raw_text, "legacy raw");
        assert_eq!(result.corrected_text, "legacy corrected");
        assert!(result.edited_by_user);
        assert_eq!(result.difficulty, Difficulty::Hard);
        assert_eq!(result.reading_time, ReadingTime::Label("1 min".to_string()));
        assert_eq!(result.key_topics, vec!["Cells".to_string()]);
        assert_eq!(result.file_info["filename"], "scan.pdf");
    }

    #[test]
    fn missing_creation_time_comes_from_the_saved_name() {
        let result: OcrResult = serde_json::from_value(json!({
            "originalFileName": "old.png",
            "savedFileName": "old_scan_1600000000000.json",
            "finalExtractedText": "x"
        }))
        .unwrap();
        assert_eq!(result.created_at.timestamp_millis(), 1_600_000_000_000);

        let unnamed: OcrResult = serde_json::from_value(json!({ "finalExtractedText": "x" })).unwrap();
        assert_eq!(unnamed.created_at, DateTime::<Utc>::MIN_UTC);
        assert_eq!(OcrResult::stamp_from_saved_name("notes.json"), None);
    }

    #[test]
    fn chat_messages_accept_millisecond_timestamps() {
        let message: ChatMessage = serde_json::from_value(json!({
            "id": "1", "sender": "user", "text": "hi", "timestamp": 1700000000000i64
        }))
        .unwrap();
        assert_eq!(message.timestamp.timestamp_millis(), 1_700_000_000_000);

        let message: ChatMessage = serde_json::from_value(json!({
            "id": "2", "sender": "ai", "text": "hello", "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(message.timestamp.timestamp(), 1_704_067_200);
    }

    #[test]
    fn unknown_difficulty_is_kept_verbatim() {
        let d: Difficulty = serde_json::from_value(json!("Graduate")).unwrap();
        assert_eq!(d, Difficulty::Other("Graduate".to_string()));
        assert_eq!(serde_json::to_value(&d).unwrap(), json!("Graduate"));
    }

    #[test]
    fn apply_edit_stamps_and_bumps_revision() {
        let mut result = sample();
        let at = Utc::now();
        result.apply_edit("edited".to_string(), at);
        assert_eq!(result.final_extracted_text, "edited");
        assert!(result.edited_by_user);
        assert_eq!(result.edit_timestamp, Some(at));
        assert_eq!(result.revision, 2);
        assert_eq!(result.raw_text, "raw");
    }

    #[test]
    fn user_name_defaults_to_email_local_part() {
        let user = UserSession::new("ada@example.com", None);
        assert_eq!(user.name, "ada");
        let named = UserSession::new("ada@example.com", Some("Ada Lovelace"));
        assert_eq!(named.name, "Ada Lovelace");
    }
}
