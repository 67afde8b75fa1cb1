use anyhow::Result;
use mockito::Matcher;
use test_utils::event_stream_error_fixture;
use test_utils::event_stream_fixture;
use tokio::sync::mpsc;

use super::Rag;
use crate::domain::models::Backend;
use crate::domain::models::Event;
use crate::domain::models::Source;
use crate::domain::models::StreamEvent;
use crate::domain::models::StreamRequest;

impl Rag {
    fn with_url(url: String) -> Rag {
        return Rag {
            url,
            stream_path: "/chat/stream-get".to_string(),
            timeout: "200".to_string(),
        };
    }
}

fn request(message: &str) -> StreamRequest {
    return StreamRequest {
        session_id: 1,
        message: message.to_string(),
    };
}

fn stream_events(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<StreamEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::Stream(session_id, stream_event) = event {
            assert_eq!(session_id, 1);
            events.push(stream_event);
        }
    }

    return events;
}

fn stream_mock(server: &mut mockito::Server, message: &str, body: &str) -> mockito::Mock {
    return server
        .mock("GET", "/chat/stream-get")
        .match_query(Matcher::UrlEncoded(
            "message".to_string(),
            message.to_string(),
        ))
        .match_header("accept", "text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create();
}

mod health_check {
    use super::*;

    #[tokio::test]
    async fn it_successfully_health_checks() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/health").with_status(200).create();

        let backend = Rag::with_url(server.url());
        let res = backend.health_check().await;

        assert!(res.is_ok());
        mock.assert();
    }

    #[tokio::test]
    async fn it_health_checks_with_a_trailing_slash() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/health").with_status(200).create();

        let backend = Rag::with_url(format!("{}/", server.url()));
        let res = backend.health_check().await;

        assert!(res.is_ok());
        mock.assert();
    }

    #[tokio::test]
    async fn it_fails_health_checks() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/health").with_status(500).create();

        let backend = Rag::with_url(server.url());
        let res = backend.health_check().await;

        assert!(res.is_err());
        mock.assert();
    }

    #[tokio::test]
    async fn it_fails_health_checks_when_unreachable() {
        let backend = Rag::with_url("http://127.0.0.1:1".to_string());
        let res = backend.health_check().await;

        assert!(res.is_err());
    }
}

mod stream_url {
    use super::*;

    #[test]
    fn it_form_encodes_the_message() -> Result<()> {
        let backend = Rag::with_url("http://localhost:8000".to_string());
        let url = backend.stream_url("What is X? & why")?;

        assert_eq!(
            url.as_str(),
            "http://localhost:8000/chat/stream-get?message=What+is+X%3F+%26+why"
        );
        return Ok(());
    }

    #[test]
    fn it_uses_the_configured_path() -> Result<()> {
        let backend = Rag {
            url: "http://localhost:8000/".to_string(),
            stream_path: "/v2/ask".to_string(),
            timeout: "200".to_string(),
        };
        let url = backend.stream_url("hi")?;

        assert_eq!(url.as_str(), "http://localhost:8000/v2/ask?message=hi");
        return Ok(());
    }

    #[test]
    fn it_fails_on_an_invalid_base_url() {
        let backend = Rag::with_url("not a url".to_string());
        assert!(backend.stream_url("hi").is_err());
    }
}

mod stream_answer {
    use super::*;

    #[tokio::test]
    async fn it_streams_an_answer() -> Result<()> {
        let mut server = mockito::Server::new();
        let mock = stream_mock(&mut server, "What is RAG?", event_stream_fixture());

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let backend = Rag::with_url(server.url());
        backend.stream_answer(request("What is RAG?"), &tx).await?;

        mock.assert();
        let events = stream_events(&mut rx);
        assert_eq!(
            events,
            vec![
                StreamEvent::Sources(vec![
                    Source {
                        source: Some("handbook.pdf".to_string()),
                        chunk_index: Some(2),
                        distance: Some(0.1234),
                    },
                    Source {
                        source: Some("faq.pdf".to_string()),
                        chunk_index: Some(0),
                        distance: Some(0.4567),
                    },
                ]),
                StreamEvent::Token("Retrieval".to_string()),
                StreamEvent::Token("Retrieval augmented".to_string()),
                StreamEvent::Token(
                    "Retrieval augmented generation grounds answers in documents.".to_string()
                ),
                StreamEvent::Done,
            ]
        );

        return Ok(());
    }

    #[tokio::test]
    async fn it_forwards_server_errors() -> Result<()> {
        let mut server = mockito::Server::new();
        let mock = stream_mock(&mut server, "What is X?", event_stream_error_fixture());

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let backend = Rag::with_url(server.url());
        backend.stream_answer(request("What is X?"), &tx).await?;

        mock.assert();
        assert_eq!(
            stream_events(&mut rx),
            vec![
                StreamEvent::Sources(vec![]),
                StreamEvent::Error(Some("CUDA out of memory".to_string())),
            ]
        );

        return Ok(());
    }

    #[tokio::test]
    async fn it_skips_malformed_payloads() -> Result<()> {
        let body = [
            "event: token",
            "data: {not json",
            "",
            "event: heartbeat",
            "data: {}",
            "",
            "event: token",
            "data: {\"text\": \"ok\"}",
            "",
            "event: done",
            "data: {}",
            "",
            "",
        ]
        .join("\n");

        let mut server = mockito::Server::new();
        let mock = stream_mock(&mut server, "What is X?", &body);

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let backend = Rag::with_url(server.url());
        backend.stream_answer(request("What is X?"), &tx).await?;

        mock.assert();
        assert_eq!(
            stream_events(&mut rx),
            vec![StreamEvent::Token("ok".to_string()), StreamEvent::Done]
        );

        return Ok(());
    }

    #[tokio::test]
    async fn it_stops_reading_after_done() -> Result<()> {
        let body = "event: done\ndata: {}\n\nevent: token\ndata: {\"text\": \"late\"}\n\n";

        let mut server = mockito::Server::new();
        let mock = stream_mock(&mut server, "What is X?", body);

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let backend = Rag::with_url(server.url());
        backend.stream_answer(request("What is X?"), &tx).await?;

        mock.assert();
        assert_eq!(stream_events(&mut rx), vec![StreamEvent::Done]);

        return Ok(());
    }

    #[tokio::test]
    async fn it_fails_on_error_status() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/chat/stream-get")
            .match_query(Matcher::Any)
            .with_status(500)
            .create();

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let backend = Rag::with_url(server.url());
        let res = backend.stream_answer(request("What is X?"), &tx).await;

        mock.assert();
        assert!(res.is_err());
        assert!(stream_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn it_fails_when_the_stream_ends_early() {
        let body = "event: token\ndata: {\"text\": \"X is\"}\n\nevent: token\ndata: {\"text\": \"X is a";

        let mut server = mockito::Server::new();
        let mock = stream_mock(&mut server, "What is X?", body);

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let backend = Rag::with_url(server.url());
        let res = backend.stream_answer(request("What is X?"), &tx).await;

        mock.assert();
        assert!(res.is_err());
        assert_eq!(
            stream_events(&mut rx),
            vec![StreamEvent::Token("X is".to_string())]
        );
    }

    #[tokio::test]
    async fn it_fails_when_unreachable() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let backend = Rag::with_url("http://127.0.0.1:1".to_string());
        let res = backend.stream_answer(request("What is X?"), &tx).await;

        assert!(res.is_err());
        assert!(stream_events(&mut rx).is_empty());
    }
}
