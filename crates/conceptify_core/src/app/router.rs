//! crates/conceptify_core/src/app/router.rs
//!
//! Route table, route guards and the layout shell's sidebar rule.

/// Viewports wider than this get the sidebar open by default.
pub const SIDEBAR_BREAKPOINT: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Signup,
    Dashboard,
    Chatbot,
    Ocr,
    OcrResult,
    Test,
    TakeTest,
    TestResult,
    Settings,
}

impl Route {
    pub const ALL: [Route; 11] = [
        Route::Landing,
        Route::Login,
        Route::Signup,
        Route::Dashboard,
        Route::Chatbot,
        Route::Ocr,
        Route::OcrResult,
        Route::Test,
        Route::TakeTest,
        Route::TestResult,
        Route::Settings,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Chatbot => "/chatbot",
            Route::Ocr => "/ocr",
            Route::OcrResult => "/ocr-result",
            Route::Test => "/test",
            Route::TakeTest => "/take-test",
            Route::TestResult => "/test-result",
            Route::Settings => "/settings",
        }
    }

    /// Matches a location, ignoring any query string, fragment or trailing slash.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL.into_iter().find(|r| r.path() == normalized)
    }

    /// Routes an authenticated user is sent away from.
    pub fn is_public_only(self) -> bool {
        matches!(self, Route::Landing | Route::Login | Route::Signup)
    }

    pub fn is_protected(self) -> bool {
        !self.is_public_only()
    }

    /// Routes that render inside the sidebar/navbar chrome.
    pub fn uses_app_chrome(self) -> bool {
        matches!(
            self,
            Route::Dashboard
                | Route::Chatbot
                | Route::Ocr
                | Route::OcrResult
                | Route::Test
                | Route::TakeTest
                | Route::TestResult
                | Route::Settings
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

impl Navigation {
    pub fn route(self) -> Route {
        match self {
            Navigation::Render(r) | Navigation::Redirect(r) => r,
        }
    }
}

/// Applies the public-route and protected-route guards to a location.
pub fn resolve(path: &str, authenticated: bool) -> Navigation {
    let home = if authenticated {
        Route::Dashboard
    } else {
        Route::Landing
    };
    match Route::from_path(path) {
        None => Navigation::Redirect(home),
        Some(route) if authenticated && route.is_public_only() => Navigation::Redirect(home),
        Some(route) if !authenticated && route.is_protected() => Navigation::Redirect(home),
        Some(route) => Navigation::Render(route),
    }
}

pub fn shows_chrome(route: Route, authenticated: bool) -> bool {
    authenticated && route.uses_app_chrome()
}

//=========================================================================================
// Layout shell
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    viewport_width: u32,
    sidebar_open: bool,
}

impl Layout {
    /// Initial mount: the sidebar state follows the viewport width.
    pub fn mount(viewport_width: u32) -> Self {
        Self {
            viewport_width,
            sidebar_open: viewport_width > SIDEBAR_BREAKPOINT,
        }
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn is_wide(&self) -> bool {
        self.viewport_width > SIDEBAR_BREAKPOINT
    }

    /// A resize re-applies the default, discarding any manual toggle.
    pub fn resize(&mut self, viewport_width: u32) {
        *self = Self::mount(viewport_width);
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    /// Page changes close the sidebar on narrow viewports.
    pub fn on_navigate(&mut self) {
        if !self.is_wide() {
            self.sidebar_open = false;
        }
    }

    pub fn close_sidebar(&mut self) {
        self.sidebar_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_path_round_trips() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/ocr-result/?x=1"), Some(Route::OcrResult));
        assert_eq!(Route::from_path(""), Some(Route::Landing));
        assert_eq!(Route::from_path("/nope"), None);
    }

    #[test]
    fn public_routes_redirect_authenticated_users() {
        assert_eq!(resolve("/login", true), Navigation::Redirect(Route::Dashboard));
        assert_eq!(resolve("/", true), Navigation::Redirect(Route::Dashboard));
        assert_eq!(resolve("/login", false), Navigation::Render(Route::Login));
    }

    #[test]
    fn protected_routes_redirect_anonymous_users() {
        assert_eq!(resolve("/chatbot", false), Navigation::Redirect(Route::Landing));
        assert_eq!(resolve("/chatbot", true), Navigation::Render(Route::Chatbot));
        assert_eq!(resolve("/missing", false), Navigation::Redirect(Route::Landing));
        assert_eq!(resolve("/missing", true), Navigation::Redirect(Route::Dashboard));
    }

    #[test]
    fn chrome_only_on_app_routes_when_authenticated() {
        assert!(shows_chrome(Route::Settings, true));
        assert!(!shows_chrome(Route::Settings, false));
        assert!(!shows_chrome(Route::Login, true));
    }

    #[test]
    fn sidebar_follows_breakpoint() {
        assert!(Layout::mount(1280).sidebar_open());
        assert!(!Layout::mount(1024).sidebar_open());

        let mut layout = Layout::mount(800);
        layout.toggle_sidebar();
        assert!(layout.sidebar_open());
        layout.on_navigate();
        assert!(!layout.sidebar_open());

        layout.resize(1440);
        assert!(layout.sidebar_open());
        layout.on_navigate();
        assert!(layout.sidebar_open());
    }
}
