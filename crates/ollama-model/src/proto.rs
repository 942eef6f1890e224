use serde::{Deserialize, Serialize};
use tutor_model::{ModelMessage, ModelRequest};

use crate::OllamaConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatChunk {
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    pub done_reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Options {
    temperature: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: Options,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &ModelRequest, config: &OllamaConfig) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        stream: true,
        options: Options {
            temperature: config.temperature,
        },
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    let role = match msg {
        ModelMessage::System(_) => "system",
        ModelMessage::User(_) => "user",
        ModelMessage::Assistant(_) => "assistant",
    };
    Message {
        role,
        content: msg.content().to_owned(),
    }
}
