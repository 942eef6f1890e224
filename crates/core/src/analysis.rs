use std::sync::Arc;

use tutor_model::ModelMessage;

use crate::backend::ClientSource;
use crate::error::{ConfigurationError, Error};
use crate::model_client::ModelClient;
use crate::parser::parse_analysis;
use crate::prompt::Template;
use crate::state::SharedState;

/// The summary and conversation starters of an article.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisResult {
    /// A one-sentence summary.
    pub summary: String,
    /// Open questions to start the conversation with.
    pub starters: Vec<String>,
}

impl AnalysisResult {
    /// The result shown when the analysis could not be produced. It has no
    /// starters.
    pub fn failed(err: &Error) -> Self {
        Self {
            summary: format!("Analysis failed: {err}"),
            starters: vec![],
        }
    }

    /// Whether there is anything to start a conversation with.
    #[inline]
    pub fn is_usable(&self) -> bool {
        !self.starters.is_empty()
    }
}

#[derive(Clone)]
pub(crate) struct AnalysisOrchestrator {
    state: SharedState,
    clients: ClientSource,
}

impl AnalysisOrchestrator {
    #[inline]
    pub(crate) fn new(state: SharedState, clients: ClientSource) -> Self {
        Self { state, clients }
    }

    /// Starts analyzing `article`.
    ///
    /// The article is recorded, the previous analysis is cleared and the
    /// loading flag is raised before this method returns. The returned
    /// future performs the request and never fails: errors are turned
    /// into [`AnalysisResult::failed`]. If another analysis was started
    /// in the meantime, the result is returned but not stored.
    pub(crate) fn analyze(
        &self,
        article: impl Into<String>,
    ) -> impl Future<Output = AnalysisResult> + Send + 'static {
        let article = article.into();
        let prompt = Template::Analysis.render(&article);

        let mut generation = 0;
        self.state.send_modify(|state| {
            state.analysis_generation += 1;
            generation = state.analysis_generation;
            state.article = article;
            state.analysis = None;
            state.is_analysis_loading = true;
        });
        debug!("analysis #{generation} started");

        let client = self.clients.client();
        let state = Arc::clone(&self.state);
        async move {
            let result = match request_analysis(client, prompt).await {
                Ok(result) => result,
                Err(err) => {
                    warn!("analysis #{generation} failed: {err}");
                    AnalysisResult::failed(&err)
                }
            };

            let applied = state.send_if_modified(|state| {
                if state.analysis_generation != generation {
                    return false;
                }
                state.analysis = Some(result.clone());
                state.is_analysis_loading = false;
                true
            });
            if !applied {
                debug!("analysis #{generation} is stale, discarded");
            }
            result
        }
    }
}

async fn request_analysis(
    client: Result<ModelClient, ConfigurationError>,
    prompt: String,
) -> Result<AnalysisResult, Error> {
    let reply = client?
        .invoke(vec![ModelMessage::User(prompt)])
        .await
        .map_err(Error::Backend)?;
    trace!("analysis output: {:?}", reply.content());
    Ok(parse_analysis(reply.content())?)
}
