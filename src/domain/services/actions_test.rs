use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::help_text;
use super::ActionsService;
use crate::domain::models::Action;
use crate::domain::models::Backend;
use crate::domain::models::Event;
use crate::domain::models::StreamEvent;
use crate::domain::models::StreamRequest;

struct ScriptedBackend {
    events: Vec<StreamEvent>,
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    async fn stream_answer<'a>(
        &self,
        request: StreamRequest,
        tx: &'a mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        for event in self.events.iter() {
            tx.send(Event::Stream(request.session_id, event.clone()))?;
        }

        return Ok(());
    }
}

struct FailingBackend {}

#[async_trait]
impl Backend for FailingBackend {
    async fn health_check(&self) -> Result<()> {
        bail!("connection refused");
    }

    async fn stream_answer<'a>(
        &self,
        _request: StreamRequest,
        _tx: &'a mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        return Err(anyhow!("connection refused"));
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Sends a single token, then holds the stream open until it is aborted.
struct PendingBackend {
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl Backend for PendingBackend {
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    async fn stream_answer<'a>(
        &self,
        request: StreamRequest,
        tx: &'a mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let _flag = DropFlag(self.dropped.clone());
        tx.send(Event::Stream(
            request.session_id,
            StreamEvent::Token("X is".to_string()),
        ))?;
        std::future::pending::<()>().await;

        return Ok(());
    }
}

fn open(session_id: u64) -> Action {
    return Action::StreamOpen(StreamRequest {
        session_id,
        message: "What is X?".to_string(),
    });
}

async fn wait_for(flag: &AtomicBool) -> bool {
    for _ in 0..100 {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    return false;
}

#[tokio::test]
async fn it_forwards_stream_events() -> Result<()> {
    let backend = Arc::new(ScriptedBackend {
        events: vec![StreamEvent::Token("X is".to_string()), StreamEvent::Done],
    });
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let service = tokio::spawn(async move {
        return ActionsService::start(backend, event_tx, &mut action_rx).await;
    });

    action_tx.send(open(7))?;

    match event_rx.recv().await {
        Some(Event::Stream(7, StreamEvent::Token(text))) => assert_eq!(text, "X is"),
        _ => bail!("Wrong enum"),
    }
    match event_rx.recv().await {
        Some(Event::Stream(7, StreamEvent::Done)) => {}
        _ => bail!("Wrong enum"),
    }

    drop(action_tx);
    service.await??;

    return Ok(());
}

#[tokio::test]
async fn it_turns_worker_failures_into_error_events() -> Result<()> {
    let backend = Arc::new(FailingBackend {});
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let service = tokio::spawn(async move {
        return ActionsService::start(backend, event_tx, &mut action_rx).await;
    });

    action_tx.send(open(3))?;

    match event_rx.recv().await {
        Some(Event::Stream(3, StreamEvent::Error(Some(detail)))) => {
            assert_eq!(detail, "connection refused");
        }
        _ => bail!("Wrong enum"),
    }

    drop(action_tx);
    service.await??;

    return Ok(());
}

#[tokio::test]
async fn it_aborts_the_stream_on_close() -> Result<()> {
    let dropped = Arc::new(AtomicBool::new(false));
    let backend = Arc::new(PendingBackend {
        dropped: dropped.clone(),
    });
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let service = tokio::spawn(async move {
        return ActionsService::start(backend, event_tx, &mut action_rx).await;
    });

    action_tx.send(open(1))?;
    assert!(matches!(event_rx.recv().await, Some(Event::Stream(1, _))));
    assert!(!dropped.load(Ordering::SeqCst));

    action_tx.send(Action::StreamClose(1))?;
    assert!(wait_for(&dropped).await);

    drop(action_tx);
    service.await??;

    return Ok(());
}

#[tokio::test]
async fn it_keeps_the_stream_on_close_for_another_session() -> Result<()> {
    let dropped = Arc::new(AtomicBool::new(false));
    let backend = Arc::new(PendingBackend {
        dropped: dropped.clone(),
    });
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let service = tokio::spawn(async move {
        return ActionsService::start(backend, event_tx, &mut action_rx).await;
    });

    action_tx.send(open(2))?;
    assert!(matches!(event_rx.recv().await, Some(Event::Stream(2, _))));

    action_tx.send(Action::StreamClose(1))?;
    assert!(!wait_for(&dropped).await);

    drop(action_tx);
    service.await??;
    assert!(wait_for(&dropped).await);

    return Ok(());
}

#[tokio::test]
async fn it_supersedes_an_open_stream() -> Result<()> {
    let dropped = Arc::new(AtomicBool::new(false));
    let backend = Arc::new(PendingBackend {
        dropped: dropped.clone(),
    });
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let service = tokio::spawn(async move {
        return ActionsService::start(backend, event_tx, &mut action_rx).await;
    });

    action_tx.send(open(1))?;
    assert!(matches!(event_rx.recv().await, Some(Event::Stream(1, _))));

    action_tx.send(open(2))?;
    assert!(wait_for(&dropped).await);
    assert!(matches!(event_rx.recv().await, Some(Event::Stream(2, _))));

    drop(action_tx);
    service.await??;

    return Ok(());
}

#[test]
fn it_lists_every_slash_command_in_help() {
    let text = help_text();
    for command in ["/stop", "/sources", "/copy", "/quit", "/help"] {
        assert!(text.contains(command));
    }
}
