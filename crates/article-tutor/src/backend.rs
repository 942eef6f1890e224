use tutor_core::{
    BackendConfig, BackendKind, ConfigurationError, ModelClient,
    ModelClientFactory,
};
use tutor_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use tutor_ollama_model::{OllamaConfigBuilder, OllamaProvider};

/// Creates clients for Ollama ([`BackendKind::LocalHosted`]) and Gemini
/// ([`BackendKind::CloudKeyBased`]).
#[derive(Clone, Copy, Debug, Default)]
pub struct ProviderFactory;

impl ModelClientFactory for ProviderFactory {
    fn create_client(
        &self,
        config: &BackendConfig,
    ) -> Result<ModelClient, ConfigurationError> {
        match config.kind {
            BackendKind::LocalHosted => {
                let mut builder =
                    OllamaConfigBuilder::with_base_url(&config.endpoint);
                if let Some(model) = &config.model {
                    builder = builder.with_model(model);
                }
                let ollama_config = builder.build().map_err(|err| {
                    ConfigurationError::InvalidEndpoint(err.to_string())
                })?;
                Ok(ModelClient::new(OllamaProvider::new(ollama_config)))
            }
            BackendKind::CloudKeyBased => {
                let mut builder =
                    GeminiConfigBuilder::with_api_key(&config.api_key);
                if let Some(model) = &config.model {
                    builder = builder.with_model(model);
                }
                let gemini_config = builder.build().map_err(|err| {
                    ConfigurationError::InvalidApiKey(err.to_string())
                })?;
                Ok(ModelClient::new(GeminiProvider::new(gemini_config)))
            }
        }
    }
}
