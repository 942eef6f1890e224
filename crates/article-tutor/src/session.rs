use std::sync::Arc;

use tutor_core::{
    AnalysisResult, ChatError, ModelClientFactory, SettingsStore, Tutor,
    TutorBuilder,
};

use crate::backend::ProviderFactory;
use crate::speech::Speaker;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    tutor_builder: TutorBuilder,
    speaker: Option<Arc<dyn Speaker>>,
}

impl Default for SessionBuilder {
    #[inline]
    fn default() -> Self {
        Self::with_client_factory(ProviderFactory)
    }
}

impl SessionBuilder {
    /// Creates a session builder that talks to the real backends.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session builder with a custom client factory.
    #[inline]
    pub fn with_client_factory(factory: impl ModelClientFactory) -> Self {
        Self {
            tutor_builder: TutorBuilder::with_client_factory(factory),
            speaker: None,
        }
    }

    /// Shares a settings store with the session.
    #[inline]
    pub fn with_settings(mut self, settings: SettingsStore) -> Self {
        self.tutor_builder = self.tutor_builder.with_settings(settings);
        self
    }

    /// Reads every reply aloud with `speaker`.
    #[inline]
    pub fn with_speaker(mut self, speaker: impl Speaker) -> Self {
        self.speaker = Some(Arc::new(speaker));
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            tutor: self.tutor_builder.build(),
            speaker: self.speaker,
        }
    }
}

/// A tutoring session, like a window with an analysis panel and a chat
/// panel.
///
/// The session holds a fully configured tutor that you can use directly,
/// and it is basically a wrapper around [`Tutor`] that also speaks the
/// replies.
#[derive(Clone)]
pub struct Session {
    tutor: Tutor,
    speaker: Option<Arc<dyn Speaker>>,
}

impl Session {
    /// The underlying tutor.
    #[inline]
    pub fn tutor(&self) -> &Tutor {
        &self.tutor
    }

    /// Analyzes an article. See [`Tutor::analyze`].
    #[inline]
    pub async fn analyze(&self, article: impl Into<String>) -> AnalysisResult {
        self.tutor.analyze(article).await
    }

    /// Sends a chat message and waits for the reply. See
    /// [`Tutor::send_message`].
    pub async fn send_message(
        &self,
        text: impl Into<String>,
    ) -> Result<String, ChatError> {
        let reply = self.tutor.send_message(text)?.await;
        self.speak(&reply);
        Ok(reply)
    }

    /// Sends a conversation starter and waits for the reply. See
    /// [`Tutor::send_starter`].
    pub async fn send_starter(&self, index: usize) -> Result<String, ChatError> {
        let reply = self.tutor.send_starter(index)?.await;
        self.speak(&reply);
        Ok(reply)
    }

    /// Stops reading the current reply.
    #[inline]
    pub fn stop_speaking(&self) {
        if let Some(speaker) = &self.speaker {
            speaker.cancel();
        }
    }

    fn speak(&self, text: &str) {
        if let Some(speaker) = &self.speaker {
            speaker.speak(text);
        }
    }
}
