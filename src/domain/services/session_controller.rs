#[cfg(test)]
#[path = "session_controller_test.rs"]
mod tests;

use std::mem;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::domain::models::Action;
use crate::domain::models::AssistantHandle;
use crate::domain::models::Author;
use crate::domain::models::Conversation;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::SessionState;
use crate::domain::models::StreamEvent;
use crate::domain::models::StreamRequest;
use crate::domain::models::StreamSession;

pub const STREAM_FAILURE_NOTICE: &str = "Sorry, something went wrong while generating the answer.";

/// Owns the conversation and the lifecycle of the single streamed answer.
/// Connections are opened and closed by sending actions; whoever consumes
/// the action channel owns the actual network stream.
#[derive(Default)]
pub struct SessionController {
    conversation: Conversation,
    state: SessionState,
    last_session_id: u64,
}

impl SessionController {
    pub fn conversation(&self) -> &Conversation {
        return &self.conversation;
    }

    pub fn is_streaming(&self) -> bool {
        return self.state.is_streaming();
    }

    pub fn active_session_id(&self) -> Option<u64> {
        if let SessionState::Streaming(session) = &self.state {
            return Some(session.id);
        }

        return None;
    }

    pub fn active_assistant(&self) -> Option<AssistantHandle> {
        if let SessionState::Streaming(session) = &self.state {
            return Some(session.assistant);
        }

        return None;
    }

    /// Adds a client-side message that is not part of any streamed answer.
    pub fn push_notice(&mut self, message: Message) {
        self.conversation.push(message);
    }

    /// Starts streaming an answer for `text`. Returns false without touching
    /// the conversation when the text is blank or an answer is already
    /// streaming.
    pub fn send(&mut self, text: &str, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }

        if let SessionState::Streaming(session) = &self.state {
            tracing::debug!(
                session_id = session.id,
                "Rejecting send while an answer is streaming"
            );
            return Ok(false);
        }

        let session_id = self.last_session_id + 1;
        tx.send(Action::StreamOpen(StreamRequest {
            session_id,
            message: text.to_string(),
        }))?;

        self.last_session_id = session_id;
        self.conversation.push(Message::new(Author::User, text));
        let assistant = self.conversation.push_assistant_placeholder();
        self.state = SessionState::Streaming(StreamSession {
            id: session_id,
            started_at: Instant::now(),
            assistant,
        });

        tracing::debug!(session_id, "Stream session started");
        return Ok(true);
    }

    /// Closes the active stream, if any. Safe to call repeatedly.
    pub fn stop(&mut self, tx: &mpsc::UnboundedSender<Action>) -> Result<()> {
        if let SessionState::Streaming(session) = mem::take(&mut self.state) {
            tracing::debug!(session_id = session.id, "Stream session closed");
            tx.send(Action::StreamClose(session.id))?;
        }

        return Ok(());
    }

    /// Applies one streamed event. Events from any session other than the
    /// active one are dropped, including late events of a finished session.
    pub fn handle_stream_event(
        &mut self,
        session_id: u64,
        event: StreamEvent,
        tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<()> {
        let session = match &self.state {
            SessionState::Streaming(session) if session.id == session_id => session.clone(),
            _ => {
                tracing::debug!(session_id, "Dropping event for inactive stream session");
                return Ok(());
            }
        };

        match event {
            StreamEvent::Sources(sources) => {
                if let Some(message) = self.conversation.assistant_mut(session.assistant) {
                    message.set_sources(sources);
                }
            }
            StreamEvent::Token(text) => {
                if let Some(message) = self.conversation.assistant_mut(session.assistant) {
                    message.set_text(&text);
                }
            }
            StreamEvent::Done => {
                let elapsed = session.started_at.elapsed();
                if let Some(message) = self.conversation.assistant_mut(session.assistant) {
                    message.set_elapsed(elapsed);
                }
                tracing::debug!(
                    session_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Answer complete"
                );
                self.stop(tx)?;
            }
            StreamEvent::Error(detail) => {
                tracing::warn!(session_id, detail = ?detail, "Answer stream failed");
                if let Some(message) = self.conversation.assistant_mut(session.assistant) {
                    if message.text.is_empty() {
                        message.set_text(STREAM_FAILURE_NOTICE);
                        message.set_message_type(MessageType::Error);
                    }
                }
                self.stop(tx)?;
            }
        }

        return Ok(());
    }
}
