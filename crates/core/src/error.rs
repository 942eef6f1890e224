use thiserror::Error;

use crate::model_client::ModelClientError;

/// The backend settings cannot produce a usable client.
///
/// This is detected before any network request is made.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The backend name is not one of the supported backends.
    #[error("Invalid backend selected: `{0}`.")]
    UnknownBackend(String),
    /// The API key is missing.
    #[error("{0}")]
    InvalidApiKey(String),
    /// The endpoint is missing or malformed.
    #[error("{0}")]
    InvalidEndpoint(String),
}

/// The structured output of the model is missing a required field.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Unable to parse conversation starters.")]
pub struct ParseFailure;

/// Any failure that can happen while talking to the model.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`ConfigurationError`].
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The completion call itself failed.
    #[error("{0}")]
    Backend(ModelClientError),
    /// See [`ParseFailure`].
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

/// A chat message was rejected before anything was sent.
///
/// Rejected messages never touch the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The previous message has not been answered yet.
    #[error("The previous message is still waiting for a reply.")]
    TurnInFlight,
    /// The message is empty or whitespace only.
    #[error("Cannot send an empty message.")]
    EmptyMessage,
    /// The current analysis has no starter at this index.
    #[error("There is no conversation starter #{}.", .0 + 1)]
    NoSuchStarter(usize),
}
