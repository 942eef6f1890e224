//! Conversation-related types.

use std::slice;

use tutor_model::ModelMessage;

/// The AI message every conversation starts with.
pub const WELCOME_MESSAGE: &str =
    "Welcome to Light English Teacher! Please provide an article to start.";

/// The messages exchanged in a session, oldest first.
///
/// The history only grows: the orchestrators append to it, nothing is
/// ever removed or rewritten. The first item is always the
/// [`WELCOME_MESSAGE`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatHistory {
    items: Vec<ModelMessage>,
}

impl Default for ChatHistory {
    #[inline]
    fn default() -> Self {
        Self {
            items: vec![ModelMessage::Assistant(WELCOME_MESSAGE.to_owned())],
        }
    }
}

impl ChatHistory {
    #[inline]
    pub(crate) fn push(&mut self, msg: ModelMessage) {
        self.items.push(msg);
    }

    /// Returns all messages.
    #[inline]
    pub fn items(&self) -> &[ModelMessage] {
        &self.items
    }

    /// Returns the number of messages, the welcome message included.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`, since the welcome message is never removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&ModelMessage> {
        self.items.last()
    }

    /// Iterates over the messages, oldest first.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, ModelMessage> {
        self.items.iter()
    }

    /// Returns at most `size` most recent messages.
    #[inline]
    pub fn window(&self, size: usize) -> &[ModelMessage] {
        let start = self.items.len().saturating_sub(size);
        &self.items[start..]
    }
}

impl<'a> IntoIterator for &'a ChatHistory {
    type Item = &'a ModelMessage;
    type IntoIter = slice::Iter<'a, ModelMessage>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_welcome() {
        let history = ChatHistory::default();
        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
        assert_eq!(
            history.last(),
            Some(&ModelMessage::Assistant(WELCOME_MESSAGE.to_owned()))
        );
    }

    #[test]
    fn test_window() {
        let mut history = ChatHistory::default();
        for i in 0..15 {
            history.push(ModelMessage::User(format!("message {i}")));
        }
        assert_eq!(history.len(), 16);

        let window = history.window(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content(), "message 5");
        assert_eq!(window[9].content(), "message 14");

        // Older messages stay in the history.
        assert_eq!(history.items()[1].content(), "message 0");
        assert_eq!(history.window(100).len(), 16);
        assert!(history.window(0).is_empty());
    }
}
