#[cfg(test)]
#[path = "bubble_test.rs"]
mod tests;

use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;

use crate::domain::models::Author;
use crate::domain::models::Message;
use crate::domain::models::MessageType;

#[derive(PartialEq, Eq)]
pub enum BubbleAlignment {
    Left,
    Right,
}

/// View-only flags that change how a message bubble is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BubbleOptions {
    pub streaming: bool,
    pub show_sources: bool,
}

pub struct Bubble<'a> {
    alignment: BubbleAlignment,
    message: &'a Message,
    window_max_width: usize,
    options: BubbleOptions,
}

pub struct BubbleConfig {
    pub bubble_padding: usize,
    pub border_elements_length: usize,
    pub outer_padding_percentage: f32,
}

fn repeat_from_subtractions(text: &str, subtractions: Vec<usize>) -> String {
    let count = subtractions
        .into_iter()
        .map(|e| {
            return e as i64;
        })
        .reduce(|a, b| {
            return a - b;
        })
        .unwrap_or(0);

    if count <= 0 {
        return "".to_string();
    }

    return [text].repeat(count as usize).join("");
}

fn char_len(text: &str) -> usize {
    return text.chars().count();
}

/// Word wraps a single line. Words longer than the line are hard broken.
fn wrap_line(line: &str, max_line_length: usize) -> Vec<String> {
    if line.trim().is_empty() {
        return vec!["".to_string()];
    }

    let max_line_length = max_line_length.max(1);
    let mut lines: Vec<String> = vec![];
    let mut current = String::new();

    for word in line.split(' ') {
        let chars = word.chars().collect::<Vec<char>>();
        for piece in chars.chunks(max_line_length) {
            let piece = piece.iter().collect::<String>();
            let current_len = char_len(&current);

            if current.is_empty() {
                current = piece;
            } else if current_len + 1 + char_len(&piece) > max_line_length {
                lines.push(current);
                current = piece;
            } else {
                current = format!("{current} {piece}");
            }
        }
    }

    lines.push(current);
    return lines;
}

impl<'a> Bubble<'_> {
    pub fn new(
        message: &'a Message,
        alignment: BubbleAlignment,
        window_max_width: usize,
        options: BubbleOptions,
    ) -> Bubble {
        return Bubble {
            alignment,
            message,
            window_max_width,
            options,
        };
    }

    pub fn style_config() -> BubbleConfig {
        return BubbleConfig {
            // Unicode character border + padding.
            bubble_padding: 8,
            // left border + left padding + (text, not counted) + right padding + right border +
            // scrollbar.
            border_elements_length: 5,
            outer_padding_percentage: 0.04,
        };
    }

    pub fn as_lines(&self) -> Vec<Line<'a>> {
        let content = self.content_lines();
        let max_line_length = self.get_max_line_length(&content);

        let lines = content
            .iter()
            .flat_map(|(line, style)| {
                return wrap_line(line, max_line_length)
                    .into_iter()
                    .map(|wrapped| {
                        return self
                            .spans_to_line(vec![Span::styled(wrapped, *style)], max_line_length);
                    })
                    .collect::<Vec<Line<'a>>>();
            })
            .collect::<Vec<Line<'a>>>();

        return self.wrap_lines_in_buddle(lines, max_line_length);
    }

    /// Message text followed by the footer: citations, then either the
    /// streaming indicator or the time the answer took.
    fn content_lines(&self) -> Vec<(String, Style)> {
        let footer_style = Style {
            fg: Some(Color::DarkGray),
            ..Style::default()
        };

        let mut lines = self
            .message
            .text
            .lines()
            .map(|line| {
                return (line.to_string(), Style::default());
            })
            .collect::<Vec<(String, Style)>>();

        let mut footer: Vec<String> = vec![];
        if let Some(sources) = self.message.sources() {
            let noun = if sources.len() == 1 {
                "source"
            } else {
                "sources"
            };

            if self.options.show_sources {
                footer.push(format!("▾ {} {noun}:", sources.len()));
                for (idx, source) in sources.iter().enumerate() {
                    footer.push(format!("[{}] {}", idx + 1, source.display()));
                }
            } else {
                footer.push(format!(
                    "▸ {} {noun} (/sources to expand)",
                    sources.len()
                ));
            }
        }

        if self.options.streaming {
            footer.push("streaming...".to_string());
        } else if let Some(elapsed) = self.message.elapsed() {
            footer.push(format!("answered in {:.2}s", elapsed.as_secs_f64()));
        }

        if !footer.is_empty() && !lines.is_empty() {
            lines.push(("".to_string(), Style::default()));
        }
        lines.extend(footer.into_iter().map(|line| {
            return (line, footer_style);
        }));

        if lines.is_empty() {
            lines.push(("".to_string(), Style::default()));
        }

        return lines;
    }

    fn spans_to_line(&self, mut spans: Vec<Span<'a>>, max_line_length: usize) -> Line<'a> {
        let line_str_len: usize = spans.iter().map(|e| return char_len(&e.content)).sum();
        let fill = repeat_from_subtractions(" ", vec![max_line_length, line_str_len]);
        let formatted_line_length =
            line_str_len + fill.len() + Bubble::style_config().bubble_padding;

        let mut wrapped_spans = vec![self.highlight_span("│ ".to_string())];
        wrapped_spans.append(&mut spans);
        wrapped_spans.push(self.highlight_span(format!("{fill} │")));

        let outer_bubble_padding =
            repeat_from_subtractions(" ", vec![self.window_max_width, formatted_line_length]);

        if self.alignment == BubbleAlignment::Left {
            wrapped_spans.push(Span::from(outer_bubble_padding));
            return Line::from(wrapped_spans);
        }

        let mut line_spans = vec![Span::from(outer_bubble_padding)];
        line_spans.extend(wrapped_spans);

        return Line::from(line_spans);
    }

    fn get_max_line_length(&self, content: &[(String, Style)]) -> usize {
        let style_config = Bubble::style_config();
        // Add a minimum 4% of padding on the side.
        let min_bubble_padding_length = ((self.window_max_width as f32
            * style_config.outer_padding_percentage)
            .ceil()) as usize;

        // Border elements + minimum bubble padding.
        let line_border_width = style_config.border_elements_length + min_bubble_padding_length;
        let available = self
            .window_max_width
            .saturating_sub(line_border_width)
            .max(1);

        let mut max_line_length = content
            .iter()
            .map(|(line, _)| {
                return char_len(line);
            })
            .max()
            .unwrap_or(0);

        if max_line_length > available {
            max_line_length = available;
        }

        let username = self.message.author.to_string();
        if max_line_length < char_len(&username) {
            max_line_length = char_len(&username);
        }

        return max_line_length;
    }

    fn wrap_lines_in_buddle(&self, lines: Vec<Line<'a>>, max_line_length: usize) -> Vec<Line<'a>> {
        let username = self.message.author.to_string();
        // Add 2 for the vertical bars.
        let inner_bar = ["─"]
            .repeat((max_line_length + 2).saturating_sub(char_len(&username)))
            .join("");
        let top_bar = format!("╭{username}{inner_bar}╮");
        let bottom_bar = format!("╰{}╯", ["─"].repeat(max_line_length + 2).join(""));
        let bar_bubble_padding = repeat_from_subtractions(
            " ",
            vec![
                self.window_max_width,
                max_line_length,
                Bubble::style_config().bubble_padding,
            ],
        );

        if self.alignment == BubbleAlignment::Left {
            let mut res = vec![self.highlight_line(format!("{top_bar}{bar_bubble_padding}"))];
            res.extend(lines);
            res.push(self.highlight_line(format!("{bottom_bar}{bar_bubble_padding}")));
            return res;
        }

        let mut res = vec![self.highlight_line(format!("{bar_bubble_padding}{top_bar}"))];
        res.extend(lines);
        res.push(self.highlight_line(format!("{bar_bubble_padding}{bottom_bar}")));
        return res;
    }

    fn highlight_span(&self, text: String) -> Span<'a> {
        if self.message.message_type() == MessageType::Error {
            return Span::styled(
                text,
                Style {
                    fg: Some(Color::Red),
                    ..Style::default()
                },
            );
        } else if self.message.author == Author::App {
            return Span::styled(
                text,
                Style {
                    fg: Some(Color::Rgb(138, 85, 63)), // Brown
                    ..Style::default()
                },
            );
        }

        return Span::from(text);
    }

    fn highlight_line(&self, text: String) -> Line<'a> {
        return Line::from(self.highlight_span(text));
    }
}
