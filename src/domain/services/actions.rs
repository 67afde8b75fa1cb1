#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::clipboard::ClipboardService;
use crate::domain::models::Action;
use crate::domain::models::Author;
use crate::domain::models::Backend;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::StreamEvent;
use crate::domain::models::StreamRequest;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /stop (/s) - Stops the answer that is currently streaming. Whatever was received so far is kept.
- /sources (/src) - Expands or collapses the sources listed under every answer.
- /copy (/c) [all?] - Copies the last answer and its sources to your clipboard. Use `/copy all` to copy the entire chat instead.
- /quit /exit (/q) - Exit RagChat.
- /help (/h) - Provides this help menu.

HOTKEYS:
- Up arrow - Scroll up
- Down arrow - Scroll down
- CTRL+U - Page up
- CTRL+D - Page down
- CTRL+C - Stop the answer that is streaming if in progress, otherwise exit.
- CTRL+R - Resubmit your last question to the backend.
        "#;

    return text.trim().to_string();
}

fn copy_messages(messages: Vec<Message>, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    if messages.is_empty() {
        tx.send(Event::AppMessage(Message::new_with_type(
            Author::App,
            MessageType::Error,
            "There is nothing to copy yet.",
        )))?;
        return Ok(());
    }

    let formatted = messages
        .iter()
        .map(|message| {
            return message.transcript();
        })
        .collect::<Vec<String>>()
        .join("\n\n");

    if let Err(err) = ClipboardService::set(formatted) {
        tracing::error!(error = ?err, "Failed to copy to clipboard");
        tx.send(Event::AppMessage(Message::new_with_type(
            Author::App,
            MessageType::Error,
            &format!("Failed to copy to clipboard: {err}"),
        )))?;
        return Ok(());
    }

    tx.send(Event::AppMessage(Message::new(
        Author::App,
        "Copied chat log to clipboard.",
    )))?;

    return Ok(());
}

fn worker_error(
    session_id: u64,
    err: anyhow::Error,
    tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    tracing::error!(session_id, error = ?err, "Answer stream worker failed");
    tx.send(Event::Stream(
        session_id,
        StreamEvent::Error(Some(err.to_string())),
    ))?;

    return Ok(());
}

/// Runs background work requested by the UI. Owns at most one open answer
/// stream at a time.
pub struct ActionsService {}

impl ActionsService {
    pub async fn start(
        backend: Arc<dyn Backend + Send + Sync>,
        tx: mpsc::UnboundedSender<Event>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        let mut worker: Option<(u64, JoinHandle<Result<()>>)> = None;

        while let Some(action) = rx.recv().await {
            match action {
                Action::CopyMessages(messages) => {
                    copy_messages(messages, &tx)?;
                }
                Action::StreamClose(session_id) => {
                    match worker.take() {
                        Some((worker_id, handle)) if worker_id == session_id => {
                            handle.abort();
                        }
                        other => {
                            tracing::debug!(session_id, "No open stream for session");
                            worker = other;
                        }
                    }
                }
                Action::StreamOpen(request) => {
                    if let Some((worker_id, handle)) = worker.take() {
                        tracing::debug!(worker_id, "Superseding open stream");
                        handle.abort();
                    }

                    let session_id = request.session_id;
                    let handle = spawn_stream(backend.clone(), request, tx.clone());
                    worker = Some((session_id, handle));
                }
            }
        }

        if let Some((_, handle)) = worker.take() {
            handle.abort();
        }

        return Ok(());
    }
}

fn spawn_stream(
    backend: Arc<dyn Backend + Send + Sync>,
    request: StreamRequest,
    worker_tx: mpsc::UnboundedSender<Event>,
) -> JoinHandle<Result<()>> {
    return tokio::spawn(async move {
        let session_id = request.session_id;
        let res = backend.stream_answer(request, &worker_tx).await;

        if let Err(err) = res {
            worker_error(session_id, err, &worker_tx)?;
        }

        return Ok(());
    });
}
