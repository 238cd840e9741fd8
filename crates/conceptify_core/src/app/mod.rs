//! Client-side application logic: everything the browser UI does besides rendering.

pub mod auth;
pub mod chat;
pub mod documents;
pub mod preferences;
pub mod quiz;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthError, AuthManager, AuthState};
pub use chat::{ChatError, ChatManager, PlaceholderResponder};
pub use documents::DocumentWorkflow;
pub use preferences::{PreferenceStore, Preferences, Theme};
pub use quiz::{QuizSession, ScoreBand, TestHistory, TestStats};
pub use router::{Layout, Navigation, Route};
pub use state::{reduce, ClientAction, ClientState};
