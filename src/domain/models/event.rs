use tui_textarea::Input;

use super::Message;
use super::StreamEvent;

pub enum Event {
    AppMessage(Message),
    KeyboardCharInput(Input),
    KeyboardCTRLC(),
    KeyboardCTRLR(),
    KeyboardEnter(),
    KeyboardPaste(String),
    Stream(u64, StreamEvent),
    UIScrollDown(),
    UIScrollUp(),
    UIScrollPageDown(),
    UIScrollPageUp(),
    UITick(),
}
