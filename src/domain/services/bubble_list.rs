use std::collections::HashMap;
use std::time::Duration;

use ratatui::backend::Backend;
use ratatui::prelude::Rect;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::Bubble;
use super::BubbleAlignment;
use super::BubbleOptions;
use crate::domain::models::Author;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::Source;

#[cfg(test)]
#[path = "bubble_list_test.rs"]
mod tests;

/// Everything that changes how a message renders. A cached bubble is only
/// reused while its fingerprint is unchanged.
#[derive(PartialEq)]
struct BubbleFingerprint {
    text: String,
    mtype: MessageType,
    sources: Option<Vec<Source>>,
    elapsed: Option<Duration>,
    options: BubbleOptions,
}

impl BubbleFingerprint {
    fn new(message: &Message, options: BubbleOptions) -> BubbleFingerprint {
        return BubbleFingerprint {
            text: message.text.to_string(),
            mtype: message.message_type(),
            sources: message.sources().map(|sources| return sources.to_vec()),
            elapsed: message.elapsed(),
            options,
        };
    }
}

struct BubbleCacheEntry<'a> {
    fingerprint: BubbleFingerprint,
    lines: Vec<Line<'a>>,
}

pub struct BubbleList<'a> {
    cache: HashMap<usize, BubbleCacheEntry<'a>>,
    line_width: usize,
    lines_len: usize,
}

impl<'a> Default for BubbleList<'a> {
    fn default() -> BubbleList<'a> {
        return BubbleList::new();
    }
}

impl<'a> BubbleList<'a> {
    pub fn new() -> BubbleList<'a> {
        return BubbleList {
            cache: HashMap::new(),
            line_width: 0,
            lines_len: 0,
        };
    }

    /// Rebuilds the rendered lines. `streaming_index` is the message an answer
    /// is currently being streamed into, if any.
    pub fn set_messages(
        &mut self,
        messages: &[Message],
        line_width: usize,
        streaming_index: Option<usize>,
        show_sources: bool,
    ) {
        if self.line_width != line_width {
            self.cache.clear();
            self.line_width = line_width;
        }

        self.cache.retain(|idx, _| return *idx < messages.len());

        self.lines_len = messages
            .iter()
            .enumerate()
            .map(|(idx, message)| {
                let options = BubbleOptions {
                    streaming: streaming_index == Some(idx),
                    show_sources,
                };
                let fingerprint = BubbleFingerprint::new(message, options);

                if let Some(cache_entry) = self.cache.get(&idx) {
                    if cache_entry.fingerprint == fingerprint {
                        return cache_entry.lines.len();
                    }
                }

                let mut align = BubbleAlignment::Left;
                if message.author == Author::User {
                    align = BubbleAlignment::Right;
                }

                let bubble_lines = Bubble::new(message, align, line_width, options).as_lines();
                let bubble_line_len = bubble_lines.len();

                self.cache.insert(
                    idx,
                    BubbleCacheEntry {
                        fingerprint,
                        lines: bubble_lines,
                    },
                );

                return bubble_line_len;
            })
            .sum();
    }

    pub fn len(&self) -> usize {
        return self.lines_len;
    }

    pub fn is_empty(&self) -> bool {
        return self.lines_len == 0;
    }

    pub fn render<B: Backend>(&self, frame: &mut Frame<B>, rect: Rect, scroll: u16) {
        let mut indexes: Vec<usize> = self.cache.keys().cloned().collect();
        indexes.sort();
        let lines: Vec<Line<'a>> = indexes
            .iter()
            .filter_map(|idx| {
                return self.cache.get(idx);
            })
            .flat_map(|entry| {
                return entry.lines.to_owned();
            })
            .collect();

        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default())
                .scroll((scroll, 0)),
            rect,
        );
    }
}
