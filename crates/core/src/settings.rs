//! User-editable backend settings shared by the orchestrators.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use tokio::sync::watch;

use crate::backend::{BackendConfig, BackendKind};
use crate::error::ConfigurationError;

/// Base URL of a default local Ollama installation.
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";

/// The settings as the user entered them.
///
/// The backend is kept as a raw string, so a typo surfaces as a
/// [`ConfigurationError`] on the next request rather than being lost.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Backend name, `ollama` or `gemini`.
    pub backend: String,
    /// API key for the cloud backend.
    pub api_key: String,
    /// Endpoint URL for the local backend.
    pub url: String,
    /// Model override.
    pub model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::LocalHosted.to_string(),
            api_key: String::new(),
            url: DEFAULT_LOCAL_URL.to_owned(),
            model: None,
        }
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("backend", &self.backend)
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish()
    }
}

impl Settings {
    /// Resolves the settings into a [`BackendConfig`].
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigurationError> {
        Ok(BackendConfig {
            kind: self.backend.parse()?,
            api_key: self.api_key.clone(),
            endpoint: self.url.clone(),
            model: self
                .model
                .as_deref()
                .map(str::trim)
                .filter(|model| !model.is_empty())
                .map(str::to_owned),
        })
    }
}

/// A shared handle to the current [`Settings`].
///
/// Clones refer to the same settings. Changes take effect on the next
/// request; requests already in flight keep the client they started
/// with.
#[derive(Clone, Debug)]
pub struct SettingsStore(Arc<watch::Sender<Settings>>);

impl Default for SettingsStore {
    #[inline]
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsStore {
    /// Creates a store holding `settings`.
    #[inline]
    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(watch::Sender::new(settings)))
    }

    /// Returns a copy of the current settings.
    #[inline]
    pub fn snapshot(&self) -> Settings {
        self.0.borrow().clone()
    }

    /// Selects the backend by name.
    pub fn set_backend(&self, backend: impl Into<String>) {
        let backend = backend.into();
        self.0.send_modify(|settings| settings.backend = backend);
    }

    /// Sets the API key for the cloud backend.
    pub fn set_api_key(&self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        self.0.send_modify(|settings| settings.api_key = api_key);
    }

    /// Sets the endpoint URL for the local backend.
    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.0.send_modify(|settings| settings.url = url);
    }

    /// Overrides the model, or restores the backend default with `None`.
    pub fn set_model(&self, model: Option<String>) {
        self.0.send_modify(|settings| settings.model = model);
    }

    /// Subscribes to settings changes.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.0.subscribe()
    }
}
