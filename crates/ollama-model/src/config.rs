use std::fmt::{self, Display};

use reqwest::Url;

const DEFAULT_MODEL: &str = "qwen3:8b";
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Error returned when an [`OllamaConfig`] cannot be built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The base URL is empty.
    MissingBaseUrl,
    /// The base URL is not a valid `http` or `https` URL.
    InvalidBaseUrl(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingBaseUrl => write!(f, "Ollama URL is missing."),
            ConfigError::InvalidBaseUrl(reason) => write!(
                f,
                "Invalid Ollama URL format ({reason}). Please check the URL."
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Builder for [`OllamaConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct OllamaConfigBuilder {
    base_url: String,
    model: Option<String>,
    temperature: Option<f64>,
}

impl OllamaConfigBuilder {
    /// Creates a builder with the URL of the Ollama server, for example
    /// `http://localhost:11434`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            model: None,
            temperature: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Validates the base URL and builds the configuration.
    pub fn build(self) -> Result<OllamaConfig, ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let url = Url::parse(base_url)
            .map_err(|err| ConfigError::InvalidBaseUrl(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(format!(
                "unsupported scheme `{}`",
                url.scheme()
            )));
        }

        Ok(OllamaConfig {
            chat_url: format!(
                "{}/api/chat",
                url.as_str().trim_end_matches('/')
            ),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }
}

/// Configuration for the Ollama provider.
#[derive(Clone, Debug, PartialEq)]
pub struct OllamaConfig {
    pub(crate) chat_url: String,
    pub(crate) model: String,
    pub(crate) temperature: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_url() {
        let config = OllamaConfigBuilder::with_base_url("http://localhost:11434")
            .build()
            .unwrap();
        assert_eq!(config.chat_url, "http://localhost:11434/api/chat");
        assert_eq!(config.model, "qwen3:8b");

        let config = OllamaConfigBuilder::with_base_url(" https://gpu.lan/ollama/ ")
            .with_model("llama3.2")
            .build()
            .unwrap();
        assert_eq!(config.chat_url, "https://gpu.lan/ollama/api/chat");
        assert_eq!(config.model, "llama3.2");
    }

    #[test]
    fn test_missing_url() {
        let err = OllamaConfigBuilder::with_base_url("").build().unwrap_err();
        assert_eq!(err, ConfigError::MissingBaseUrl);
    }

    #[test]
    fn test_invalid_url() {
        for url in ["localhost:11434", "not a url", "ftp://localhost"] {
            let err = OllamaConfigBuilder::with_base_url(url).build().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidBaseUrl(_)),
                "{url} should be rejected"
            );
        }
    }
}
