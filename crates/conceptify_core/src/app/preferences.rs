//! crates/conceptify_core/src/app/preferences.rs
//!
//! Theme, notification and language preferences. Every change is persisted and
//! published on a `watch` channel, so subscribers see it immediately.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::storage::{KeyValueStore, StorageError, LANGUAGE_KEY, NOTIFICATIONS_KEY, THEME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    pub notifications: bool,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            notifications: true,
            language: "en".to_string(),
        }
    }
}

pub struct PreferenceStore {
    store: Arc<dyn KeyValueStore>,
    sender: watch::Sender<Preferences>,
}

impl PreferenceStore {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let defaults = Preferences::default();
        let prefs = Preferences {
            theme: store
                .get(THEME_KEY)?
                .and_then(|raw| Theme::parse(&raw))
                .unwrap_or(defaults.theme),
            notifications: store
                .get(NOTIFICATIONS_KEY)?
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.notifications),
            language: store.get(LANGUAGE_KEY)?.unwrap_or(defaults.language),
        };
        let (sender, _) = watch::channel(prefs);
        Ok(Self { store, sender })
    }

    pub fn current(&self) -> Preferences {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.sender.subscribe()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.store.set(THEME_KEY, theme.as_str())?;
        self.publish(|p| p.theme = theme);
        Ok(())
    }

    pub fn set_notifications(&self, enabled: bool) -> Result<(), StorageError> {
        self.store
            .set(NOTIFICATIONS_KEY, if enabled { "true" } else { "false" })?;
        self.publish(|p| p.notifications = enabled);
        Ok(())
    }

    pub fn set_language(&self, language: &str) -> Result<(), StorageError> {
        self.store.set(LANGUAGE_KEY, language)?;
        let language = language.to_string();
        self.publish(move |p| p.language = language);
        Ok(())
    }

    fn publish(&self, change: impl FnOnce(&mut Preferences)) {
        self.sender.send_if_modified(|prefs| {
            let before = prefs.clone();
            change(prefs);
            let modified = *prefs != before;
            if modified {
                debug!("Preferences changed: {:?}", prefs);
            }
            modified
        });
    }
}
