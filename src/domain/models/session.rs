use std::time::Instant;

use super::AssistantHandle;

/// The one in-flight streamed answer.
#[derive(Clone, Debug)]
pub struct StreamSession {
    pub id: u64,
    pub started_at: Instant,
    pub assistant: AssistantHandle,
}

#[derive(Clone, Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Streaming(StreamSession),
}

impl SessionState {
    pub fn is_streaming(&self) -> bool {
        return matches!(self, SessionState::Streaming(_));
    }
}
