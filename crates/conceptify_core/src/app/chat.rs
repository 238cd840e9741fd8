//! crates/conceptify_core/src/app/chat.rs
//!
//! Client-side chat sessions. The full session list is written back to storage
//! after every mutation; sessions are kept newest first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::{ChatMessage, ChatMetadata, ChatSession, DocumentRef, OcrResult, Sender};
use crate::ports::{ChatResponder, PortError, PortResult};
use crate::storage::{
    load_json, save_json, KeyValueStore, StorageError, CHAT_DOCUMENTS_PREFIX, CHAT_SESSIONS_KEY,
};

pub const DEFAULT_TITLE: &str = "New Chat";
const TITLE_LENGTH: usize = 30;
const EXCERPT_LENGTH: usize = 200;
const MAX_TOPICS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat session {0} not found")]
    SessionNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Failed to produce a reply: {0}")]
    Responder(#[from] PortError),
}

//=========================================================================================
// Placeholder responder
//=========================================================================================

/// Stands in for a real inference call: waits a fixed delay, then echoes the
/// attached document's opening text and topics back to the user.
#[derive(Debug, Clone)]
pub struct PlaceholderResponder {
    delay: Duration,
}

impl PlaceholderResponder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for PlaceholderResponder {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

#[async_trait]
impl ChatResponder for PlaceholderResponder {
    async fn reply(&self, message: &str, context: Option<&DocumentRef>) -> PortResult<String> {
        tokio::time::sleep(self.delay).await;
        Ok(compose_reply(message, context))
    }
}

pub fn compose_reply(message: &str, context: Option<&DocumentRef>) -> String {
    let Some(doc) = context else {
        return format!(
            "I understand you're asking about \"{}\". Let me help you learn this concept step by step. This is a powerful learning topic that we can explore together!",
            message
        );
    };

    let excerpt: String = doc.content.chars().take(EXCERPT_LENGTH).collect();
    let mut reply = format!(
        "Looking at \"{}\" for your question \"{}\": the document begins \"{}\"",
        doc.name, message, excerpt
    );
    if doc.content.chars().count() > EXCERPT_LENGTH {
        reply.push_str("...");
    }
    let topics: Vec<&str> = doc
        .key_topics
        .iter()
        .take(MAX_TOPICS)
        .map(String::as_str)
        .collect();
    if !topics.is_empty() {
        reply.push_str(&format!(". Key topics to focus on: {}.", topics.join(", ")));
    }
    reply
}

//=========================================================================================
// Session manager
//=========================================================================================

pub struct ChatManager {
    store: Arc<dyn KeyValueStore>,
    responder: Arc<dyn ChatResponder>,
    sessions: Vec<ChatSession>,
    active_id: Option<String>,
}

impl ChatManager {
    /// Loads the persisted session list. The most recent session becomes active.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        responder: Arc<dyn ChatResponder>,
    ) -> Result<Self, StorageError> {
        let mut sessions: Vec<ChatSession> =
            load_json(store.as_ref(), CHAT_SESSIONS_KEY)?.unwrap_or_default();
        for session in &mut sessions {
            session.metadata.message_count = session.messages.len();
        }
        let active_id = sessions.first().map(|s| s.id.clone());
        debug!("Loaded {} chat sessions", sessions.len());

        Ok(Self {
            store,
            responder,
            sessions,
            active_id,
        })
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active_id.as_deref().and_then(|id| self.session(id))
    }

    /// Creates a session, prepends it and makes it active. `context` seeds the
    /// session with whatever document is currently loaded in the app.
    pub fn create_session(&mut self, context: Option<DocumentRef>) -> Result<ChatSession, ChatError> {
        let now = Utc::now();
        let session = ChatSession {
            id: self.next_session_id(now),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: ChatMetadata {
                message_count: 0,
                context,
            },
        };
        info!("Created chat session {}", session.id);

        self.sessions.insert(0, session.clone());
        self.active_id = Some(session.id.clone());
        self.persist()?;
        Ok(session)
    }

    pub fn select_session(&mut self, id: &str) -> Result<(), ChatError> {
        if self.session(id).is_none() {
            return Err(ChatError::SessionNotFound(id.to_string()));
        }
        self.active_id = Some(id.to_string());
        Ok(())
    }

    /// Appends the user's message, waits for the responder and appends its
    /// reply. Blank messages are ignored and return `None`.
    pub async fn send_message(
        &mut self,
        session_id: &str,
        text: &str,
    ) -> Result<Option<ChatMessage>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let context = {
            let session = self.session_mut(session_id)?;
            append_message(session, Sender::User, text.to_string());
            if session.title == DEFAULT_TITLE && session.messages.len() == 1 {
                session.title = title_from(text);
            }
            session
                .documents
                .first()
                .cloned()
                .or_else(|| session.metadata.context.clone())
        };
        self.persist()?;

        let reply_text = self.responder.reply(text, context.as_ref()).await?;

        let reply = {
            let session = self.session_mut(session_id)?;
            append_message(session, Sender::Ai, reply_text)
        };
        self.persist()?;
        Ok(Some(reply))
    }

    /// Removes a session. If it was active, the most recent remaining session
    /// takes over, or none when the list is empty.
    pub fn delete_session(&mut self, id: &str) -> Result<(), ChatError> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return Err(ChatError::SessionNotFound(id.to_string()));
        }

        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.sessions.first().map(|s| s.id.clone());
        }
        self.store.remove(&documents_key(id))?;
        self.persist()?;
        info!("Deleted chat session {}", id);
        Ok(())
    }

    /// Attaches a processed document as chat context. Returns `false` without
    /// changing anything when a document with the same id or name is attached.
    pub fn attach_document(&mut self, session_id: &str, result: &OcrResult) -> Result<bool, ChatError> {
        let doc = DocumentRef::from_result(result, Utc::now());
        let session = self.session_mut(session_id)?;
        if session
            .documents
            .iter()
            .any(|d| d.id == doc.id || d.name == doc.name)
        {
            return Ok(false);
        }
        session.documents.push(doc);
        touch(session, Utc::now());
        let documents = session.documents.clone();

        self.persist()?;
        save_json(self.store.as_ref(), &documents_key(session_id), &documents)?;
        Ok(true)
    }

    fn session_mut(&mut self, id: &str) -> Result<&mut ChatSession, ChatError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))
    }

    /// Millisecond timestamp, advanced past any id already in the list.
    fn next_session_id(&self, now: DateTime<Utc>) -> String {
        let mut stamp = now.timestamp_millis();
        while self.sessions.iter().any(|s| s.id == stamp.to_string()) {
            stamp += 1;
        }
        stamp.to_string()
    }

    fn persist(&self) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), CHAT_SESSIONS_KEY, &self.sessions)
    }
}

fn documents_key(session_id: &str) -> String {
    format!("{}{}", CHAT_DOCUMENTS_PREFIX, session_id)
}

fn append_message(session: &mut ChatSession, sender: Sender, text: String) -> ChatMessage {
    let now = Utc::now();
    let message = ChatMessage {
        id: format!("{}-{}", session.id, session.messages.len() + 1),
        sender,
        text,
        timestamp: now,
    };
    session.messages.push(message.clone());
    session.metadata.message_count = session.messages.len();
    touch(session, now);
    message
}

fn touch(session: &mut ChatSession, now: DateTime<Utc>) {
    session.updated_at = session.updated_at.max(now);
}

fn title_from(text: &str) -> String {
    if text.chars().count() > TITLE_LENGTH {
        let head: String = text.chars().take(TITLE_LENGTH).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::sample_result;
    use crate::storage::MemoryStore;

    fn manager() -> (Arc<MemoryStore>, ChatManager) {
        let store = Arc::new(MemoryStore::new());
        let responder = Arc::new(PlaceholderResponder::new(Duration::from_millis(1)));
        let chat = ChatManager::load(store.clone(), responder).unwrap();
        (store, chat)
    }

    #[tokio::test]
    async fn send_message_keeps_count_in_step_with_messages() {
        let (_, mut chat) = manager();
        let session = chat.create_session(None).unwrap();

        let reply = chat
            .send_message(&session.id, "What is osmosis?")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.sender, Sender::Ai);
        assert!(reply.text.contains("What is osmosis?"));

        let stored = chat.session(&session.id).unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.metadata.message_count, 2);
        assert_eq!(stored.title, "What is osmosis?");
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn blank_messages_are_ignored() {
        let (_, mut chat) = manager();
        let session = chat.create_session(None).unwrap();
        assert!(chat.send_message(&session.id, "   ").await.unwrap().is_none());
        assert!(chat.session(&session.id).unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn reply_uses_attached_document() {
        let (_, mut chat) = manager();
        let session = chat.create_session(None).unwrap();
        let result = sample_result("leaf_1.json", &"chlorophyll ".repeat(40));
        chat.attach_document(&session.id, &result).unwrap();

        let reply = chat
            .send_message(&session.id, "Summarise this")
            .await
            .unwrap()
            .unwrap();
        assert!(reply.text.contains("chlorophyll"));
        assert!(reply.text.contains("Chlorophyll, Light, Glucose"));
        assert!(!reply.text.contains("Oxygen"));
    }

    #[test]
    fn compose_reply_truncates_excerpt() {
        let mut doc = DocumentRef::from_result(&sample_result("a_1.json", ""), Utc::now());
        doc.content = "x".repeat(500);
        let reply = compose_reply("q", Some(&doc));
        assert!(reply.contains(&"x".repeat(200)));
        assert!(!reply.contains(&"x".repeat(201)));
    }

    #[test]
    fn attach_document_is_idempotent() {
        let (store, mut chat) = manager();
        let session = chat.create_session(None).unwrap();
        let result = sample_result("notes_1.json", "text");

        assert!(chat.attach_document(&session.id, &result).unwrap());
        assert!(!chat.attach_document(&session.id, &result).unwrap());
        assert_eq!(chat.session(&session.id).unwrap().documents.len(), 1);

        let key = documents_key(&session.id);
        let docs: Vec<DocumentRef> = load_json(store.as_ref(), &key).unwrap().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "notes_1.json");
    }

    #[test]
    fn deleting_active_session_activates_the_other() {
        let (_, mut chat) = manager();
        let first = chat.create_session(None).unwrap();
        let second = chat.create_session(None).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(chat.active_id(), Some(second.id.as_str()));

        chat.delete_session(&second.id).unwrap();
        assert_eq!(chat.active_id(), Some(first.id.as_str()));

        chat.delete_session(&first.id).unwrap();
        assert_eq!(chat.active_id(), None);
        assert!(chat.sessions().is_empty());
    }

    #[test]
    fn sessions_survive_reload() {
        let (store, mut chat) = manager();
        let context = DocumentRef::from_result(&sample_result("ctx_1.json", "context"), Utc::now());
        let session = chat.create_session(Some(context)).unwrap();

        let reloaded = ChatManager::load(
            store.clone(),
            Arc::new(PlaceholderResponder::default()),
        )
        .unwrap();
        assert_eq!(reloaded.sessions().len(), 1);
        assert_eq!(reloaded.active_id(), Some(session.id.as_str()));
        assert_eq!(
            reloaded.sessions()[0]
                .metadata
                .context
                .as_ref()
                .map(|d| d.id.as_str()),
            Some("ctx_1.json")
        );
    }

    #[test]
    fn unknown_session_is_an_error() {
        let (_, mut chat) = manager();
        assert!(matches!(
            chat.select_session("missing"),
            Err(ChatError::SessionNotFound(_))
        ));
    }
}
