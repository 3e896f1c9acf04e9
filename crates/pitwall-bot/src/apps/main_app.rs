//! Root of the tree: `/start`, `/menu` and the entry into live timing.

use std::sync::Arc;

use anyhow::Result;
use pitwall_core::chat::OutgoingMessage;
use pitwall_core::keyboard::ReplyKeyboard;
use pitwall_core::menu::{Menu, StaticMenu};
use pitwall_core::{Accepter, Action, ChatSink, Children};

use super::{AppContext, LiveApp, reply};
use crate::commands::{BotCommand, parse_command};
use crate::i18n::{Localizer, Msg};
use crate::servers::Server;

pub struct MainApp {
    sink: Arc<dyn ChatSink>,
    loc: Localizer,
    root: Arc<dyn Menu>,
    live: Arc<LiveApp>,
    children: Children,
}

impl MainApp {
    pub fn new(ctx: &AppContext, servers: Vec<Server>) -> Result<Arc<Self>> {
        let root: Arc<dyn Menu> = Arc::new(StaticMenu(
            ReplyKeyboard::new().row([ctx.text(Msg::ButtonLive)]),
        ));
        let live = LiveApp::new(ctx, servers, Arc::downgrade(&root))?;
        let children = [Arc::clone(&live) as Arc<dyn Accepter>].into_iter().collect();
        Ok(Arc::new(Self {
            sink: Arc::clone(&ctx.sink),
            loc: ctx.loc,
            root,
            live,
            children,
        }))
    }

    pub fn live(&self) -> &Arc<LiveApp> {
        &self.live
    }

    /// Stops every updater in the tree and waits for them.
    pub async fn shutdown(&self) {
        self.live.shutdown().await;
    }

    fn start_text(&self) -> String {
        format!(
            "{}\n\n{}\n\n/menu - {}\n",
            self.loc.get(Msg::Greeting),
            self.loc.get(Msg::CommandIntro),
            self.loc.get(Msg::MenuCommandHelp),
        )
    }
}

impl Accepter for MainApp {
    fn accept_command(&self, command: &str) -> Option<Action> {
        let text = match parse_command(command) {
            Some(BotCommand::Start) => self.start_text(),
            Some(BotCommand::Menu) => format!("{}\n\n", self.loc.get(Msg::MenuTitle)),
            None => return self.children.command(command),
        };
        let message = OutgoingMessage::text(text).reply_keyboard(self.root.menu());
        Some(reply(&self.sink, message))
    }

    fn accept_callback(&self, payload: &str) -> Option<Action> {
        self.children.callback(payload)
    }

    fn accept_button(&self, label: &str) -> Option<Action> {
        self.children.button(label)
    }
}

#[cfg(test)]
mod tests {
    use pitwall_core::chat::Markup;

    use super::*;
    use crate::apps::testing::{CHAT, harness, target};

    fn servers() -> Vec<Server> {
        vec![Server {
            id: "S1".to_string(),
            url: "http://host".to_string(),
            name: "Sprint".to_string(),
            ..Server::default()
        }]
    }

    #[tokio::test]
    async fn start_greets_with_root_keyboard() {
        let h = harness();
        let app = MainApp::new(&h.ctx, servers()).unwrap();

        let action = app.accept_command("/start@pitwall_bot").expect("claimed");
        action.run(target()).await.unwrap();

        let sent = h.sink.sent();
        assert_eq!(sent.len(), 1);
        let (chat_id, message) = &sent[0];
        assert_eq!(*chat_id, CHAT);
        assert!(message.text.contains("/menu - Show the bot menu"));
        assert_eq!(
            message.markup,
            Markup::Reply(ReplyKeyboard::new().row(["Live"]))
        );
        app.shutdown().await;
    }

    #[tokio::test]
    async fn menu_command() {
        let h = harness();
        let app = MainApp::new(&h.ctx, servers()).unwrap();

        app.accept_command("/menu").expect("claimed").run(target()).await.unwrap();
        assert_eq!(h.sink.last().unwrap().text, "Bot menu.\n\n");
        app.shutdown().await;
    }

    #[tokio::test]
    async fn walks_down_and_back_up_the_tree() {
        let h = harness();
        let app = MainApp::new(&h.ctx, servers()).unwrap();

        app.accept_button("Live").expect("live").run(target()).await.unwrap();
        assert!(matches!(h.sink.last().unwrap().markup, Markup::Reply(ref k) if k.contains("🔴 Sprint")));

        app.accept_button("Back to menu")
            .expect("back")
            .run(target())
            .await
            .unwrap();
        assert_eq!(
            h.sink.last().unwrap().markup,
            Markup::Reply(ReplyKeyboard::new().row(["Live"]))
        );
        app.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_command_is_not_owned() {
        let h = harness();
        let app = MainApp::new(&h.ctx, servers()).unwrap();

        assert!(app.accept_command("/help").is_none());
        assert!(app.accept_callback("nobody:home").is_none());
        assert!(h.sink.sent().is_empty());
        app.shutdown().await;
    }
}
