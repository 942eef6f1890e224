use std::fmt::Display;
use std::sync::Arc;

use tutor_model::ModelMessage;

use crate::backend::ClientSource;
use crate::error::{ChatError, ConfigurationError, Error};
use crate::model_client::ModelClient;
use crate::parser::parse_reply;
use crate::prompt::Template;
use crate::state::{SharedState, TurnStatus};

/// The default number of history messages sent along with each turn.
pub const CONTEXT_WINDOW: usize = 10;

#[derive(Clone)]
pub(crate) struct ConversationOrchestrator {
    state: SharedState,
    clients: ClientSource,
    context_window: usize,
}

impl ConversationOrchestrator {
    #[inline]
    pub(crate) fn new(
        state: SharedState,
        clients: ClientSource,
        context_window: usize,
    ) -> Self {
        Self {
            state,
            clients,
            context_window,
        }
    }

    /// Sends a chat message.
    ///
    /// On success the human message is already in the history and the
    /// turn is marked as awaiting a reply. The returned future performs
    /// the request, appends the reply (or an apology carrying the error)
    /// and returns it. Dropping the future early ends the turn with an
    /// apology, so the next message is accepted.
    pub(crate) fn send_message(
        &self,
        text: impl Into<String>,
    ) -> Result<impl Future<Output = String> + Send + 'static, ChatError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let context_window = self.context_window;
        let mut messages = vec![];
        let accepted = self.state.send_if_modified(|state| {
            if state.turn_status == TurnStatus::AwaitingReply {
                return false;
            }
            messages.reserve(context_window + 2);
            messages.push(ModelMessage::System(
                Template::Conversation.render(&state.article),
            ));
            messages.extend_from_slice(state.history.window(context_window));

            let msg = ModelMessage::User(text);
            messages.push(msg.clone());
            state.history.push(msg);
            state.turn_status = TurnStatus::AwaitingReply;
            true
        });
        if !accepted {
            return Err(ChatError::TurnInFlight);
        }

        let client = self.clients.client();
        let turn = Turn {
            state: Some(Arc::clone(&self.state)),
        };
        Ok(async move {
            let reply = match request_reply(client, messages).await {
                Ok(reply) => reply,
                Err(err) => {
                    error!("chat turn failed: {err}");
                    apology(err)
                }
            };
            turn.finish(reply.clone());
            reply
        })
    }

    /// Sends the conversation starter at `index` of the current analysis.
    pub(crate) fn send_starter(
        &self,
        index: usize,
    ) -> Result<impl Future<Output = String> + Send + 'static, ChatError> {
        let starter = self
            .state
            .borrow()
            .analysis
            .as_ref()
            .and_then(|analysis| analysis.starters.get(index))
            .cloned();
        // The borrow above must end before `send_message` modifies the
        // state.
        let starter = starter.ok_or(ChatError::NoSuchStarter(index))?;
        self.send_message(starter)
    }
}

/// An accepted turn that still owes the history its AI message.
///
/// If it is dropped unfinished, the turn ends with an apology.
struct Turn {
    state: Option<SharedState>,
}

impl Turn {
    fn finish(mut self, reply: String) {
        if let Some(state) = self.state.take() {
            end_turn(&state, reply);
        }
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            warn!("chat turn dropped before the reply arrived");
            end_turn(&state, apology(TURN_CANCELLED));
        }
    }
}

const TURN_CANCELLED: &str = "The reply was cancelled.";

#[inline]
fn apology(err: impl Display) -> String {
    format!("Sorry, an error occurred: {err}")
}

fn end_turn(state: &SharedState, reply: String) {
    state.send_modify(|state| {
        state.history.push(ModelMessage::Assistant(reply));
        state.turn_status = TurnStatus::Idle;
    });
}

async fn request_reply(
    client: Result<ModelClient, ConfigurationError>,
    messages: Vec<ModelMessage>,
) -> Result<String, Error> {
    trace!("sending {} messages", messages.len());
    let reply = client?.invoke(messages).await.map_err(Error::Backend)?;
    trace!("chat output: {:?}", reply.content());
    Ok(parse_reply(reply.content()))
}
