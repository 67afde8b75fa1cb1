#[cfg(test)]
#[path = "app_state_test.rs"]
mod tests;

use anyhow::Result;
use ratatui::prelude::Rect;
use tokio::sync::mpsc;

use super::actions::help_text;
use super::BubbleList;
use super::Scroll;
use super::SessionController;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::Author;
use crate::domain::models::Backend;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::SlashCommand;
use crate::domain::models::StreamEvent;

pub struct AppState<'a> {
    pub bubble_list: BubbleList<'a>,
    pub controller: SessionController,
    pub last_known_height: u16,
    pub last_known_width: u16,
    pub scroll: Scroll,
    pub show_sources: bool,
}

impl<'a> AppState<'a> {
    pub async fn new(backend: &(dyn Backend + Send + Sync)) -> Result<AppState<'a>> {
        let mut app_state = AppState {
            bubble_list: BubbleList::new(),
            controller: SessionController::default(),
            last_known_height: 0,
            last_known_width: 0,
            scroll: Scroll::default(),
            show_sources: false,
        };

        app_state.controller.push_notice(Message::new(
            Author::App,
            "Hey there! Ask me anything about your documents. Type /help to see what else I can do.",
        ));

        if let Err(err) = backend.health_check().await {
            tracing::warn!(error = ?err, "Backend health check failed");
            let backend_url = Config::get(ConfigKey::BackendURL);
            app_state.controller.push_notice(Message::new_with_type(
                Author::App,
                MessageType::Error,
                &format!("Hey, it looks like the backend at {backend_url} isn't reachable. You should double check it is running before asking anything, otherwise every answer will fail.\n\nError: {err}"),
            ));
        }

        return Ok(app_state);
    }

    /// Asks `text`. Returns false when nothing was sent, so the caller can
    /// keep the input around.
    pub fn send(&mut self, text: &str, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        let sent = self.controller.send(text, tx)?;
        if sent {
            self.sync_dependants();
            self.scroll.last();
        }

        return Ok(sent);
    }

    pub fn stop(&mut self, tx: &mpsc::UnboundedSender<Action>) -> Result<()> {
        self.controller.stop(tx)?;
        self.sync_dependants();
        return Ok(());
    }

    /// Asks the last user question again.
    pub fn resubmit(&mut self, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        if self.controller.is_streaming() {
            return Ok(false);
        }

        let text = match self.controller.conversation().last_user_text() {
            Some(text) => text.to_string(),
            None => return Ok(false),
        };

        return self.send(&text, tx);
    }

    pub fn handle_stream_event(
        &mut self,
        session_id: u64,
        event: StreamEvent,
        tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<()> {
        self.controller.handle_stream_event(session_id, event, tx)?;
        self.sync_dependants();
        return Ok(());
    }

    /// Returns `(should_break, should_continue)` for the UI loop.
    pub fn handle_slash_commands(
        &mut self,
        input_str: &str,
        tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<(bool, bool)> {
        let command = match SlashCommand::parse(input_str) {
            Some(command) => command,
            None => return Ok((false, false)),
        };

        if command.is_quit() {
            return Ok((true, false));
        }

        if command.is_stop() {
            self.stop(tx)?;
            return Ok((false, true));
        }

        if command.is_sources() {
            self.show_sources = !self.show_sources;
            self.sync_dependants();
            return Ok((false, true));
        }

        if command.is_copy() {
            let conversation = self.controller.conversation();
            let messages = if command.args.iter().any(|arg| return arg == "all") {
                conversation.messages().to_vec()
            } else {
                conversation.last_answer().into_iter().cloned().collect()
            };

            tx.send(Action::CopyMessages(messages))?;
            return Ok((false, true));
        }

        if command.is_help() {
            self.add_message(Message::new(Author::App, &help_text()));
            return Ok((false, true));
        }

        return Ok((false, false));
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.last_known_width = rect.width;
        self.last_known_height = rect.height;
        self.sync_dependants();
    }

    pub fn add_message(&mut self, message: Message) {
        self.controller.push_notice(message);
        self.sync_dependants();
        self.scroll.last();
    }

    fn sync_dependants(&mut self) {
        let streaming_index = self
            .controller
            .active_assistant()
            .map(|handle| return handle.index());

        self.bubble_list.set_messages(
            self.controller.conversation().messages(),
            self.last_known_width as usize,
            streaming_index,
            self.show_sources,
        );

        self.scroll
            .set_state(self.bubble_list.len() as u16, self.last_known_height);

        if self.controller.is_streaming() {
            self.scroll.last();
        }
    }
}
