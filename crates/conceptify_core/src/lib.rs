pub mod app;
pub mod domain;
pub mod extraction;
pub mod ports;
pub mod storage;
pub mod upload;

pub use domain::{
    ActiveTest, ChatMessage, ChatSession, DocumentRef, OcrResult, ResultSummary, TestRecord,
    TextEdit, UserSession,
};
pub use extraction::{Extraction, ExtractorReport};
pub use ports::{
    ChatResponder, ExtractionService, GatewayService, PortError, PortResult, ResultStore, Upload,
};
pub use storage::{KeyValueStore, StorageError};
pub use upload::UploadPolicy;
