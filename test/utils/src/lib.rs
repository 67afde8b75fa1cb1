/// A complete event stream as emitted by the RAG backend for a single
/// question, including a keep-alive comment and cumulative token snapshots.
pub fn event_stream_fixture() -> &'static str {
    return r#"
: ping - 2024-01-01 00:00:00.000000

event: sources
data: {"request_id": "req-1", "sources": [{"source": "handbook.pdf", "chunk_index": 2, "distance": 0.1234}, {"source": "faq.pdf", "chunk_index": 0, "distance": 0.4567}]}

event: token
data: {"text": "Retrieval"}

event: token
data: {"text": "Retrieval augmented"}

event: token
data: {"text": "Retrieval augmented generation grounds answers in documents."}

event: done
data: {"request_id": "req-1"}

"#
    .trim_start();
}

/// An event stream where the backend fails before producing any text.
pub fn event_stream_error_fixture() -> &'static str {
    return r#"
event: sources
data: {"request_id": "req-2", "sources": []}

event: error
data: {"message": "CUDA out of memory"}

"#
    .trim_start();
}
