#[cfg(test)]
#[path = "stream_event_test.rs"]
mod tests;

use anyhow::Result;
use serde_derive::Deserialize;

use super::Source;

#[derive(Debug, Deserialize)]
struct SourcesPayload {
    request_id: Option<String>,
    sources: Option<Vec<Source>>,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
}

/// Application-level events of a streamed answer.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Sources(Vec<Source>),
    /// The full answer text generated so far.
    Token(String),
    Done,
    Error(Option<String>),
}

impl StreamEvent {
    /// Decodes a named server-sent event. Unknown event names yield `None`,
    /// malformed JSON payloads yield an error.
    pub fn from_frame(event: &str, data: &str) -> Result<Option<StreamEvent>> {
        match event {
            "sources" => {
                let payload: SourcesPayload = serde_json::from_str(data)?;
                tracing::debug!(
                    request_id = ?payload.request_id,
                    count = ?payload.sources.as_ref().map(|s| return s.len()),
                    "sources"
                );
                return Ok(Some(StreamEvent::Sources(
                    payload.sources.unwrap_or_default(),
                )));
            }
            "token" => {
                let payload: TokenPayload = serde_json::from_str(data)?;
                return Ok(Some(StreamEvent::Token(payload.text.unwrap_or_default())));
            }
            "done" => {
                return Ok(Some(StreamEvent::Done));
            }
            "error" => {
                let detail = match serde_json::from_str::<ErrorPayload>(data) {
                    Ok(payload) => payload.message,
                    Err(_) if data.trim().is_empty() => None,
                    Err(_) => Some(data.trim().to_string()),
                };
                return Ok(Some(StreamEvent::Error(detail)));
            }
            _ => return Ok(None),
        }
    }

    pub fn is_terminal(&self) -> bool {
        return matches!(self, StreamEvent::Done | StreamEvent::Error(_));
    }
}
