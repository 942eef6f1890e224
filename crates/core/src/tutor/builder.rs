use std::sync::Arc;

use super::Tutor;
use crate::backend::ModelClientFactory;
use crate::chat::CONTEXT_WINDOW;
use crate::model_client::RetryPolicy;
use crate::settings::SettingsStore;

/// [`Tutor`] builder.
pub struct TutorBuilder {
    pub(crate) factory: Arc<dyn ModelClientFactory>,
    pub(crate) settings: SettingsStore,
    pub(crate) context_window: usize,
    pub(crate) retry_policy: RetryPolicy,
}

impl TutorBuilder {
    /// Creates a new builder with the factory that turns settings into
    /// model clients.
    #[inline]
    pub fn with_client_factory(factory: impl ModelClientFactory) -> Self {
        Self {
            factory: Arc::new(factory),
            settings: SettingsStore::default(),
            context_window: CONTEXT_WINDOW,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Shares an existing settings store with the tutor.
    #[inline]
    pub fn with_settings(mut self, settings: SettingsStore) -> Self {
        self.settings = settings;
        self
    }

    /// Sets how many history messages are sent with each chat turn.
    #[inline]
    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    /// Sets how rate-limited requests are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Builds the tutor.
    #[inline]
    pub fn build(self) -> Tutor {
        Tutor::from_builder(self)
    }
}
