mod builder;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::watch;

use crate::analysis::{AnalysisOrchestrator, AnalysisResult};
use crate::backend::ClientSource;
use crate::chat::ConversationOrchestrator;
use crate::error::ChatError;
use crate::settings::SettingsStore;
use crate::state::{SharedState, TutorState};
pub use builder::TutorBuilder;

/// A tutoring session: one article at a time, and a conversation about it.
///
/// Every operation updates the shared [`TutorState`] before it returns,
/// and once more when its request completes. Subscribe to the state to
/// render it. The tutor is cheap to clone, and clones share the session.
#[derive(Clone)]
pub struct Tutor {
    state: SharedState,
    settings: SettingsStore,
    analysis: AnalysisOrchestrator,
    chat: ConversationOrchestrator,
}

impl Tutor {
    fn from_builder(builder: TutorBuilder) -> Self {
        let TutorBuilder {
            factory,
            settings,
            context_window,
            retry_policy,
        } = builder;

        let state: SharedState =
            Arc::new(watch::Sender::new(TutorState::default()));
        let clients = ClientSource {
            settings: settings.clone(),
            factory,
            retry_policy,
        };
        Self {
            analysis: AnalysisOrchestrator::new(
                Arc::clone(&state),
                clients.clone(),
            ),
            chat: ConversationOrchestrator::new(
                Arc::clone(&state),
                clients,
                context_window,
            ),
            state,
            settings,
        }
    }

    /// Analyzes an article, producing its summary and conversation
    /// starters.
    ///
    /// The article is recorded and the previous analysis is cleared
    /// right away. The returned future never fails; a failed analysis
    /// has a summary describing the error and no starters. Only the
    /// latest analysis is stored if several overlap.
    #[inline]
    pub fn analyze(
        &self,
        article: impl Into<String>,
    ) -> impl Future<Output = AnalysisResult> + Send + 'static {
        self.analysis.analyze(article)
    }

    /// Sends a chat message about the current article.
    ///
    /// The message is appended to the history right away. The returned
    /// future resolves to the reply, which is appended too. Errors are
    /// reported as a reply rather than through the future. Dropping the
    /// future before it completes ends the turn with an apology.
    ///
    /// # Errors
    ///
    /// Blank messages and messages sent while another one is still
    /// waiting for its reply are rejected.
    #[inline]
    pub fn send_message(
        &self,
        text: impl Into<String>,
    ) -> Result<impl Future<Output = String> + Send + 'static, ChatError> {
        self.chat.send_message(text)
    }

    /// Sends a conversation starter of the current analysis as a chat
    /// message. `index` is zero-based.
    #[inline]
    pub fn send_starter(
        &self,
        index: usize,
    ) -> Result<impl Future<Output = String> + Send + 'static, ChatError> {
        self.chat.send_starter(index)
    }

    /// Returns a copy of the current state.
    #[inline]
    pub fn state(&self) -> TutorState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<TutorState> {
        self.state.subscribe()
    }

    /// The settings used for every request of this session.
    #[inline]
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }
}
