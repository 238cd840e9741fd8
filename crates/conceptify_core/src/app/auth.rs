//! crates/conceptify_core/src/app/auth.rs
//!
//! The client's session/auth state machine:
//! `Validating -> {Authenticated, Anonymous}`.
//!
//! Credentials are not verified anywhere; a session is only as alive as the
//! gateway it talks to. A failed liveness probe is treated as an expired session.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::UserSession;
use crate::ports::GatewayService;
use crate::storage::{
    load_json, save_json, KeyValueStore, StorageError, CHAT_DOCUMENTS_PREFIX, CHAT_SESSIONS_KEY,
    CURRENT_TEST_RESULT_KEY, CURRENT_USER_KEY, OCR_RESULT_KEY,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Validating,
    Authenticated(UserSession),
    Anonymous,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Name is required")]
    MissingName,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct AuthManager {
    store: Arc<dyn KeyValueStore>,
    gateway: Arc<dyn GatewayService>,
    state: AuthState,
}

impl AuthManager {
    pub fn new(store: Arc<dyn KeyValueStore>, gateway: Arc<dyn GatewayService>) -> Self {
        Self {
            store,
            gateway,
            state: AuthState::Validating,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&UserSession> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    /// Runs on application load: a persisted user is only restored if the
    /// gateway answers its health check.
    pub async fn restore(&mut self) -> Result<&AuthState, StorageError> {
        self.state = AuthState::Validating;

        let Some(user) = load_json::<UserSession>(self.store.as_ref(), CURRENT_USER_KEY)? else {
            self.store.remove(CURRENT_USER_KEY)?;
            self.state = AuthState::Anonymous;
            return Ok(&self.state);
        };

        match self.gateway.health().await {
            Ok(_) => {
                info!("Restored session for {}", user.email);
                self.state = AuthState::Authenticated(user);
            }
            Err(e) => {
                warn!("Gateway health check failed, dropping stored session: {}", e);
                self.store.remove(CURRENT_USER_KEY)?;
                self.state = AuthState::Anonymous;
            }
        }
        Ok(&self.state)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        self.authenticate(UserSession::new(email, None))
    }

    pub fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserSession, AuthError> {
        if name.trim().is_empty() {
            return Err(AuthError::MissingName);
        }
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        self.authenticate(UserSession::new(email, Some(name)))
    }

    fn authenticate(&mut self, user: UserSession) -> Result<UserSession, AuthError> {
        save_json(self.store.as_ref(), CURRENT_USER_KEY, &user)?;
        self.state = AuthState::Authenticated(user.clone());
        Ok(user)
    }

    /// Clears the user, chat and OCR-result state. Test history and
    /// preferences are left in place.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        for key in self.store.keys()? {
            if key.starts_with(CHAT_DOCUMENTS_PREFIX) {
                self.store.remove(&key)?;
            }
        }
        for key in [
            CURRENT_USER_KEY,
            CHAT_SESSIONS_KEY,
            OCR_RESULT_KEY,
            CURRENT_TEST_RESULT_KEY,
        ] {
            self.store.remove(key)?;
        }
        self.state = AuthState::Anonymous;
        Ok(())
    }

    /// Re-probes the gateway after a network failure. Returns whether the
    /// session survived; an unreachable gateway forces the user out.
    pub async fn revalidate(&mut self) -> Result<bool, StorageError> {
        if !self.is_authenticated() {
            return Ok(false);
        }
        match self.gateway.health().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Gateway unreachable, invalidating session: {}", e);
                self.store.remove(CURRENT_USER_KEY)?;
                self.state = AuthState::Anonymous;
                Ok(false)
            }
        }
    }
}
