//! crates/conceptify_core/src/app/state.rs
//!
//! The client's application state as one immutable snapshot. Views dispatch
//! `ClientAction`s; `reduce` returns the next snapshot.

use crate::app::auth::AuthState;
use crate::app::router::{resolve, shows_chrome, Layout, Route};
use crate::domain::{ActiveTest, OcrResult, UserSession};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientState {
    pub auth: AuthState,
    pub route: Route,
    pub layout: Layout,
    pub active_session: Option<String>,
    pub current_result: Option<OcrResult>,
    pub active_test: Option<ActiveTest>,
}

#[derive(Debug, Clone)]
pub enum ClientAction {
    /// Outcome of the startup liveness check.
    Restored(Option<UserSession>),
    LoggedIn(UserSession),
    LoggedOut,
    /// The gateway stopped answering; treated as an expired session.
    SessionExpired,
    Navigate(String),
    Resized(u32),
    ToggleSidebar,
    ResultLoaded(OcrResult),
    ActiveSessionChanged(Option<String>),
    TestStarted(ActiveTest),
    TestFinished,
}

impl ClientState {
    pub fn initial(viewport_width: u32) -> Self {
        Self {
            auth: AuthState::Validating,
            route: Route::Landing,
            layout: Layout::mount(viewport_width),
            active_session: None,
            current_result: None,
            active_test: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    pub fn shows_chrome(&self) -> bool {
        shows_chrome(self.route, self.is_authenticated())
    }

    fn signed_out(&self) -> Self {
        let mut layout = self.layout;
        layout.close_sidebar();
        Self {
            auth: AuthState::Anonymous,
            layout,
            ..Self::initial(self.layout.viewport_width())
        }
    }

    fn navigated(mut self, path: &str) -> Self {
        let next = resolve(path, self.is_authenticated()).route();
        if next != self.route {
            self.layout.on_navigate();
        }
        self.route = next;
        self
    }
}

pub fn reduce(state: &ClientState, action: ClientAction) -> ClientState {
    let next = state.clone();
    match action {
        ClientAction::Restored(user) => {
            let path = state.route.path();
            let auth = match user {
                Some(user) => AuthState::Authenticated(user),
                None => AuthState::Anonymous,
            };
            ClientState { auth, ..next }.navigated(path)
        }
        ClientAction::LoggedIn(user) => ClientState {
            auth: AuthState::Authenticated(user),
            ..next
        }
        .navigated(Route::Dashboard.path()),
        ClientAction::LoggedOut | ClientAction::SessionExpired => state.signed_out(),
        ClientAction::Navigate(path) => next.navigated(&path),
        ClientAction::Resized(width) => {
            let mut next = next;
            next.layout.resize(width);
            next
        }
        ClientAction::ToggleSidebar => {
            let mut next = next;
            next.layout.toggle_sidebar();
            next
        }
        ClientAction::ResultLoaded(result) => ClientState {
            current_result: Some(result),
            ..next
        }
        .navigated(Route::OcrResult.path()),
        ClientAction::ActiveSessionChanged(id) => ClientState {
            active_session: id,
            ..next
        },
        ClientAction::TestStarted(test) => ClientState {
            active_test: Some(test),
            ..next
        }
        .navigated(Route::TakeTest.path()),
        ClientAction::TestFinished => ClientState {
            active_test: None,
            ..next
        }
        .navigated(Route::TestResult.path()),
    }
}
