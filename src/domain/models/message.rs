#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use std::time::Duration;

use super::Author;
use super::Source;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    Normal,
    Error,
}

#[derive(Clone, Debug)]
pub struct Message {
    pub author: Author,
    pub text: String,
    mtype: MessageType,
    sources: Option<Vec<Source>>,
    elapsed: Option<Duration>,
}

impl Message {
    pub fn new(author: Author, text: &str) -> Message {
        return Message::new_with_type(author, MessageType::Normal, text);
    }

    pub fn new_with_type(author: Author, mtype: MessageType, text: &str) -> Message {
        return Message {
            author,
            text: text.to_string().replace('\t', "  "),
            mtype,
            sources: None,
            elapsed: None,
        };
    }

    pub fn message_type(&self) -> MessageType {
        return self.mtype;
    }

    pub fn set_message_type(&mut self, mtype: MessageType) {
        self.mtype = mtype;
    }

    /// Replaces the whole text. Streamed answers arrive as cumulative
    /// snapshots, so there is no append.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.replace('\t', "  ");
    }

    pub fn sources(&self) -> Option<&[Source]> {
        return self.sources.as_deref();
    }

    pub fn set_sources(&mut self, sources: Vec<Source>) {
        if sources.is_empty() {
            self.sources = None;
            return;
        }

        self.sources = Some(sources);
    }

    pub fn elapsed(&self) -> Option<Duration> {
        return self.elapsed;
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = Some(elapsed);
    }

    pub fn transcript(&self) -> String {
        let mut res = format!("{}: {}", self.author.to_string(), self.text);
        if let Some(sources) = self.sources() {
            let formatted = sources
                .iter()
                .map(|source| {
                    return format!("- {}", source.display());
                })
                .collect::<Vec<String>>()
                .join("\n");

            res = format!("{res}\n\nSources:\n{formatted}");
        }

        return res;
    }
}
