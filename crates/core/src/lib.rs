//! Core logic of the tutor: settings, prompts, output parsing, chat
//! history and the orchestrators that tie them to a model backend.
//!
//! The entry point is [`Tutor`], built with a [`ModelClientFactory`] that
//! knows how to talk to the configured backend:
//!
//! ```ignore
//! let tutor = TutorBuilder::with_client_factory(factory).build();
//! let analysis = tutor.analyze(article).await;
//! let reply = tutor.send_message("I think bees is smart.")?.await;
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod analysis;
mod backend;
mod chat;
pub mod conversation;
mod error;
mod model_client;
pub mod parser;
pub mod prompt;
mod settings;
mod state;
mod tutor;

pub use analysis::AnalysisResult;
pub use backend::{BackendConfig, BackendKind, ModelClientFactory};
pub use chat::CONTEXT_WINDOW;
pub use error::{ChatError, ConfigurationError, Error, ParseFailure};
pub use model_client::{ModelClient, ModelClientError, RetryPolicy};
pub use settings::{DEFAULT_LOCAL_URL, Settings, SettingsStore};
pub use state::{TurnStatus, TutorState};
pub use tutor::{Tutor, TutorBuilder};
