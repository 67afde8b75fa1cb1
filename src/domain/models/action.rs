use super::Message;
use super::StreamRequest;

pub enum Action {
    CopyMessages(Vec<Message>),
    StreamClose(u64),
    StreamOpen(StreamRequest),
}
