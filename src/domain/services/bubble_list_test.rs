use std::time::Duration;

use super::BubbleList;
use crate::domain::models::Author;
use crate::domain::models::Message;
use crate::domain::models::Source;

fn messages() -> Vec<Message> {
    return vec![
        Message::new(Author::Assistant, "Hi there!"),
        Message::new(Author::User, "What is X?"),
        Message::new(Author::Assistant, ""),
    ];
}

#[test]
fn it_has_no_cached_lines() {
    let bubble_list = BubbleList::new();

    assert_eq!(bubble_list.cache.len(), 0);
    assert!(bubble_list.is_empty());
}

#[test]
fn it_caches_lines() {
    let mut bubble_list = BubbleList::new();
    bubble_list.set_messages(&messages(), 50, None, false);

    assert_eq!(bubble_list.cache.len(), 3);
}

#[test]
fn it_returns_correct_length() {
    let mut bubble_list = BubbleList::new();
    bubble_list.set_messages(&messages(), 50, None, false);

    assert_eq!(bubble_list.len(), 9);
}

#[test]
fn it_rerenders_the_streaming_message() {
    let mut msgs = messages();
    let mut bubble_list = BubbleList::new();
    bubble_list.set_messages(&msgs, 50, Some(2), false);
    assert_eq!(bubble_list.len(), 9);

    msgs[2].set_text("X is a thing.\nIt has two lines.");
    bubble_list.set_messages(&msgs, 50, Some(2), false);
    // Two text lines, a blank line, then the streaming indicator.
    assert_eq!(bubble_list.len(), 12);

    msgs[2].set_elapsed(Duration::from_millis(300));
    bubble_list.set_messages(&msgs, 50, None, false);
    assert_eq!(bubble_list.len(), 12);
}

#[test]
fn it_rerenders_when_sources_are_toggled() {
    let mut msgs = messages();
    msgs[2].set_text("X is a thing.");
    msgs[2].set_sources(vec![Source::default(), Source::default()]);

    let mut bubble_list = BubbleList::new();
    bubble_list.set_messages(&msgs, 50, None, false);
    assert_eq!(bubble_list.len(), 11);

    bubble_list.set_messages(&msgs, 50, None, true);
    // Header plus one line per source replaces the collapsed summary.
    assert_eq!(bubble_list.len(), 13);
}

fn cached_text(bubble_list: &BubbleList, idx: usize) -> String {
    return bubble_list
        .cache
        .get(&idx)
        .unwrap()
        .lines
        .iter()
        .flat_map(|line| return line.spans.iter())
        .map(|span| return span.content.to_string())
        .collect::<Vec<String>>()
        .join("");
}

#[test]
fn it_rerenders_when_sources_are_replaced() {
    let mut msgs = vec![Message::new(Author::Assistant, "X is a thing.")];
    msgs[0].set_sources(vec![Source {
        source: Some("alpha.pdf".to_string()),
        chunk_index: Some(1),
        distance: Some(0.1),
    }]);

    let mut bubble_list = BubbleList::new();
    bubble_list.set_messages(&msgs, 50, Some(0), true);
    assert!(cached_text(&bubble_list, 0).contains("alpha.pdf"));

    msgs[0].set_sources(vec![Source {
        source: Some("beta.pdf".to_string()),
        chunk_index: Some(1),
        distance: Some(0.1),
    }]);
    bubble_list.set_messages(&msgs, 50, Some(0), true);

    let text = cached_text(&bubble_list, 0);
    assert!(text.contains("beta.pdf"));
    assert!(!text.contains("alpha.pdf"));
}

#[test]
fn it_clears_cache_on_resize() {
    let mut bubble_list = BubbleList::new();
    bubble_list.set_messages(&messages(), 50, None, false);
    bubble_list.set_messages(&messages()[..1], 80, None, false);

    assert_eq!(bubble_list.cache.len(), 1);
    assert_eq!(bubble_list.len(), 3);
}
