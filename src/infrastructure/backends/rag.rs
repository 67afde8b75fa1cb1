#[cfg(test)]
#[path = "rag_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use reqwest::header;
use reqwest::Url;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

use super::sse::SseDecoder;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::Event;
use crate::domain::models::StreamEvent;
use crate::domain::models::StreamRequest;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

/// Client for the retrieval augmented generation backend, which answers a
/// question as a stream of server-sent events.
pub struct Rag {
    url: String,
    stream_path: String,
    timeout: String,
}

impl Default for Rag {
    fn default() -> Rag {
        return Rag {
            url: Config::get(ConfigKey::BackendURL),
            stream_path: Config::get(ConfigKey::StreamPath),
            timeout: Config::get(ConfigKey::BackendHealthCheckTimeout),
        };
    }
}

impl Rag {
    fn base_url(&self) -> &str {
        return self.url.trim_end_matches('/');
    }

    /// The question is passed as the form encoded `message` query parameter.
    pub fn stream_url(&self, message: &str) -> Result<Url> {
        let url = Url::parse_with_params(
            &format!("{}{}", self.base_url(), self.stream_path),
            &[("message", message)],
        )?;

        return Ok(url);
    }
}

#[async_trait]
impl Backend for Rag {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        let res = reqwest::Client::new()
            .get(format!("{url}/health", url = self.base_url()))
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "RAG backend is not running");
                bail!("RAG backend is not running");
            }
        };

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "RAG backend health check failed"
            );
            bail!("RAG backend health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn stream_answer<'a>(
        &self,
        request: StreamRequest,
        tx: &'a mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let session_id = request.session_id;
        let url = self.stream_url(&request.message)?;
        tracing::debug!(session_id, url = url.as_str(), "Opening answer stream");

        let res = reqwest::Client::new()
            .get(url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            tracing::error!(session_id, status, "Failed to open answer stream");
            bail!("The backend responded with status {status}");
        }

        let stream = res.bytes_stream().map_err(convert_err);
        let mut lines_reader = StreamReader::new(stream).lines();
        let mut decoder = SseDecoder::default();

        while let Some(line) = lines_reader.next_line().await? {
            let frame = match decoder.push_line(&line) {
                Some(frame) => frame,
                None => continue,
            };

            let event = match StreamEvent::from_frame(&frame.event, &frame.data) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    tracing::debug!(session_id, event = frame.event.as_str(), "Ignoring unknown event");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        session_id,
                        event = frame.event.as_str(),
                        error = ?err,
                        "Skipping malformed event payload"
                    );
                    continue;
                }
            };

            let terminal = event.is_terminal();
            tx.send(Event::Stream(session_id, event))?;
            if terminal {
                return Ok(());
            }
        }

        if decoder.discard() {
            tracing::debug!(session_id, "Dropped unterminated event at end of stream");
        }

        bail!("The backend closed the stream before the answer was complete");
    }
}
