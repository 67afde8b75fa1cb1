#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;

/// A dispatched server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental decoder for a `text/event-stream` body, fed one line at a
/// time with the line terminator already removed.
#[derive(Default)]
pub struct SseDecoder {
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    /// Returns a frame once a blank line ends an event that carried data.
    pub fn push_line(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = value.to_string(),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }

        return None;
    }

    /// Drops whatever is buffered without dispatching it. An unterminated
    /// event at the end of a stream is incomplete.
    pub fn discard(&mut self) -> bool {
        let had_partial = !self.data.is_empty() || !self.event.is_empty();
        self.event.clear();
        self.data.clear();
        return had_partial;
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = std::mem::take(&mut self.event);
        if self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        let event = if event.is_empty() {
            "message".to_string()
        } else {
            event
        };

        return Some(SseFrame { event, data });
    }
}
