#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use super::Author;
use super::Message;

/// Points at an assistant turn inside a [`Conversation`]. Only
/// [`Conversation::push_assistant_placeholder`] can create one, and messages
/// are never removed, so a handle always resolves to that assistant turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssistantHandle(usize);

impl AssistantHandle {
    pub fn index(&self) -> usize {
        return self.0;
    }
}

#[derive(Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    pub fn len(&self) -> usize {
        return self.messages.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.messages.is_empty();
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_assistant_placeholder(&mut self) -> AssistantHandle {
        self.messages.push(Message::new(Author::Assistant, ""));
        return AssistantHandle(self.messages.len() - 1);
    }

    pub fn assistant(&self, handle: AssistantHandle) -> Option<&Message> {
        return self.messages.get(handle.0);
    }

    pub fn assistant_mut(&mut self, handle: AssistantHandle) -> Option<&mut Message> {
        return self.messages.get_mut(handle.0);
    }

    pub fn last_user_text(&self) -> Option<&str> {
        return self
            .messages
            .iter()
            .rev()
            .find(|message| return message.author == Author::User)
            .map(|message| return message.text.as_str());
    }

    pub fn last_answer(&self) -> Option<&Message> {
        return self
            .messages
            .iter()
            .rev()
            .find(|message| return message.author == Author::Assistant);
    }
}
