//! The seam between backend settings and concrete model providers.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::model_client::{ModelClient, RetryPolicy};
use crate::settings::SettingsStore;

/// The family of backend a [`BackendConfig`] points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// A model served on the user's machine, reached by endpoint URL.
    LocalHosted,
    /// A cloud model, authenticated by API key.
    CloudKeyBased,
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" | "local" => Ok(Self::LocalHosted),
            "gemini" | "cloud" => Ok(Self::CloudKeyBased),
            _ => Err(ConfigurationError::UnknownBackend(s.to_owned())),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::LocalHosted => write!(f, "ollama"),
            BackendKind::CloudKeyBased => write!(f, "gemini"),
        }
    }
}

/// Everything needed to build a client for one backend.
///
/// Nothing is validated here. Factories check the fields relevant to
/// their backend when a client is requested.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Which backend to talk to.
    pub kind: BackendKind,
    /// Credential for [`BackendKind::CloudKeyBased`].
    pub api_key: String,
    /// Base URL for [`BackendKind::LocalHosted`].
    pub endpoint: String,
    /// Overrides the backend's default model.
    pub model: Option<String>,
}

impl Debug for BackendConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

/// Builds a [`ModelClient`] from a [`BackendConfig`].
///
/// Implementations must not perform any network I/O. A misconfigured
/// backend is reported as a [`ConfigurationError`] right away.
pub trait ModelClientFactory: Send + Sync + 'static {
    /// Creates a client for the given configuration.
    fn create_client(
        &self,
        config: &BackendConfig,
    ) -> Result<ModelClient, ConfigurationError>;
}

impl<F> ModelClientFactory for F
where
    F: Fn(&BackendConfig) -> Result<ModelClient, ConfigurationError>
        + Send
        + Sync
        + 'static,
{
    #[inline]
    fn create_client(
        &self,
        config: &BackendConfig,
    ) -> Result<ModelClient, ConfigurationError> {
        self(config)
    }
}

/// Creates a fresh client from the current settings for every request.
#[derive(Clone)]
pub(crate) struct ClientSource {
    pub(crate) settings: SettingsStore,
    pub(crate) factory: Arc<dyn ModelClientFactory>,
    pub(crate) retry_policy: RetryPolicy,
}

impl ClientSource {
    pub(crate) fn client(&self) -> Result<ModelClient, ConfigurationError> {
        let config = self.settings.snapshot().backend_config()?;
        debug!("creating client: {config:?}");
        let client = self.factory.create_client(&config)?;
        Ok(client.with_retry_policy(self.retry_policy))
    }
}
