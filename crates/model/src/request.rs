/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages, in conversation order.
    pub messages: Vec<ModelMessage>,
}

/// A complete message.
///
/// Messages are immutable once created. The human side of a conversation
/// is [`ModelMessage::User`], and the AI side is
/// [`ModelMessage::Assistant`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text content of the message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            ModelMessage::System(content)
            | ModelMessage::User(content)
            | ModelMessage::Assistant(content) => content,
        }
    }

    /// Returns the role of the message.
    #[inline]
    pub fn role(&self) -> ModelRole {
        match self {
            ModelMessage::System(_) => ModelRole::System,
            ModelMessage::User(_) => ModelRole::User,
            ModelMessage::Assistant(_) => ModelRole::Assistant,
        }
    }
}

/// The role tag of a [`ModelMessage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelRole {
    /// The system instructions.
    System,
    /// The human side.
    User,
    /// The AI side.
    Assistant,
}
