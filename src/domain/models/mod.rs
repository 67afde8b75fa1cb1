mod action;
mod author;
mod backend;
mod conversation;
mod event;
mod loading;
mod message;
mod session;
mod slash_commands;
mod source;
mod stream_event;
mod textarea;

pub use action::*;
pub use author::*;
pub use backend::*;
pub use conversation::*;
pub use event::*;
pub use loading::*;
pub use message::*;
pub use session::*;
pub use slash_commands::*;
pub use source::*;
pub use stream_event::*;
pub use textarea::*;
