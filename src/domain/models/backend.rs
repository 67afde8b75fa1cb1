use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::Event;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRequest {
    pub session_id: u64,
    pub message: String,
}

#[async_trait]
pub trait Backend {
    /// Used at startup to verify the backend is reachable before the first
    /// question is asked.
    async fn health_check(&self) -> Result<()>;

    /// Opens a streamed answer for the request's message. Every decoded
    /// event is passed through the channel tagged with the request's session
    /// id, ending with exactly one `Done` or `Error`.
    ///
    /// Transport failures are returned as errors and are not forwarded; the
    /// caller is responsible for turning them into an `Error` event.
    async fn stream_answer<'a>(
        &self,
        request: StreamRequest,
        tx: &'a mpsc::UnboundedSender<Event>,
    ) -> Result<()>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;
