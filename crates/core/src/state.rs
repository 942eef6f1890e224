//! The state shared between the orchestrators and the presentation layer.

use std::sync::Arc;

use tokio::sync::watch;

use crate::analysis::AnalysisResult;
use crate::conversation::ChatHistory;

pub(crate) type SharedState = Arc<watch::Sender<TutorState>>;

/// Whether a chat turn is in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TurnStatus {
    /// Ready for the next message.
    #[default]
    Idle,
    /// A message was sent and its reply has not arrived yet.
    AwaitingReply,
}

/// A snapshot of everything the presentation layer renders.
#[derive(Clone, Debug, Default)]
pub struct TutorState {
    pub(crate) article: String,
    pub(crate) analysis: Option<AnalysisResult>,
    pub(crate) history: ChatHistory,
    pub(crate) is_analysis_loading: bool,
    pub(crate) turn_status: TurnStatus,
    pub(crate) analysis_generation: u64,
}

impl TutorState {
    /// The article of the latest analysis, empty before the first one.
    #[inline]
    pub fn article(&self) -> &str {
        &self.article
    }

    /// The latest analysis, `None` before the first one completes and
    /// while a new one is loading.
    #[inline]
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// The chat history.
    #[inline]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Whether an analysis is in flight.
    #[inline]
    pub fn is_analysis_loading(&self) -> bool {
        self.is_analysis_loading
    }

    /// The status of the current chat turn.
    #[inline]
    pub fn turn_status(&self) -> TurnStatus {
        self.turn_status
    }

    /// Shorthand for [`TurnStatus::AwaitingReply`].
    #[inline]
    pub fn is_chat_loading(&self) -> bool {
        self.turn_status == TurnStatus::AwaitingReply
    }

    /// Whether chatting makes sense: an analysis with starters is
    /// available and no other analysis is running.
    ///
    /// This is a hint for the presentation layer. Messages are accepted
    /// regardless.
    #[inline]
    pub fn is_ready(&self) -> bool {
        !self.is_analysis_loading
            && self.analysis.as_ref().is_some_and(AnalysisResult::is_usable)
    }
}
