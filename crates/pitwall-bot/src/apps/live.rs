//! Server list with live status markers.

use std::sync::{Arc, Weak};

use anyhow::Result;
use pitwall_core::chat::OutgoingMessage;
use pitwall_core::keyboard::ReplyKeyboard;
use pitwall_core::menu::{ApplicationMenu, Menu};
use pitwall_core::model::LiveSessionInfoData;
use pitwall_core::topics::{self, SESSION_INFO};
use pitwall_core::{Accepter, Action, Cached, ChatSink, ChatTarget, Children, UpdaterSet};

use super::{AppContext, ROOT_MENU_NAME, ServerApp, SettingsApp, back};
use crate::i18n::Msg;
use crate::servers::Server;

pub struct LiveApp {
    sink: Arc<dyn ChatSink>,
    menu: ApplicationMenu,
    state: Arc<Cached<Vec<Server>, ReplyKeyboard>>,
    servers: Vec<Arc<ServerApp>>,
    children: Children,
    updaters: UpdaterSet,
}

impl LiveApp {
    pub fn new(ctx: &AppContext, servers: Vec<Server>, parent: Weak<dyn Menu>) -> Result<Arc<Self>> {
        let menu = ApplicationMenu::new(
            ctx.text(Msg::ButtonLive),
            ROOT_MENU_NAME,
            parent,
            ctx.back_prefix(),
        );
        let back_label = menu.back_label().to_string();
        let settings_title = ctx.text(Msg::ButtonSettings);
        let state = Arc::new(Cached::new(servers, move |servers: &Vec<Server>| {
            ReplyKeyboard::new()
                .chunked(servers.iter().map(Server::status_and_name), 2)
                .row([back_label.clone(), settings_title.to_string()])
        }));

        let updaters = UpdaterSet::new(&ctx.cancel);
        let server_list = state.snapshot();
        for server in &server_list {
            let subscription = ctx
                .hub
                .session_info
                .subscribe(&topics::topic(SESSION_INFO, &server.id))?;
            let target = Arc::clone(&state);
            updaters.spawn(subscription, move |data: LiveSessionInfoData| {
                target.update(|servers| {
                    for server in servers.iter_mut().filter(|s| s.id == data.server_id) {
                        server.apply(&data);
                    }
                });
            });
        }

        let own_menu: Weak<Cached<Vec<Server>, ReplyKeyboard>> = Arc::downgrade(&state);
        let mut children = Children::new();
        let mut server_apps = Vec::with_capacity(server_list.len());
        for server in &server_list {
            let app = ServerApp::new(ctx, server, own_menu.clone())?;
            children.push(Arc::clone(&app) as Arc<dyn Accepter>);
            server_apps.push(app);
        }
        children.push(SettingsApp::new(ctx, menu.clone()) as Arc<dyn Accepter>);

        Ok(Arc::new(Self {
            sink: Arc::clone(&ctx.sink),
            menu,
            state,
            servers: server_apps,
            children,
            updaters,
        }))
    }

    pub fn keyboard(&self) -> ReplyKeyboard {
        self.state.view()
    }

    pub fn servers(&self) -> Vec<Server> {
        self.state.snapshot()
    }

    pub async fn shutdown(&self) {
        self.updaters.shutdown().await;
        for server in &self.servers {
            server.shutdown().await;
        }
    }

    fn open(&self) -> Action {
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let name = self.menu.name().to_string();
        Action::new(move |target: ChatTarget| async move {
            let message = OutgoingMessage::text(format!("{name}\n")).reply_keyboard(state.view());
            sink.send(target.chat_id, message).await
        })
    }
}

impl Accepter for LiveApp {
    fn accept_command(&self, command: &str) -> Option<Action> {
        self.children.command(command)
    }

    fn accept_callback(&self, payload: &str) -> Option<Action> {
        self.children.callback(payload)
    }

    fn accept_button(&self, label: &str) -> Option<Action> {
        if label == self.menu.name() {
            return Some(self.open());
        }
        if self.menu.is_back(label) {
            return Some(back(&self.sink, &self.menu));
        }
        self.children.button(label)
    }
}

#[cfg(test)]
mod tests {
    use pitwall_core::chat::Markup;
    use pitwall_core::menu::StaticMenu;
    use pitwall_core::model::SessionInfo;

    use super::*;
    use crate::apps::testing::{Harness, harness, settle, target};

    fn servers() -> Vec<Server> {
        ["S1", "S2", "S3"]
            .into_iter()
            .map(|id| Server {
                id: id.to_string(),
                url: format!("http://{id}"),
                name: format!("Server {id}"),
                ..Server::default()
            })
            .collect()
    }

    fn root() -> Arc<dyn Menu> {
        Arc::new(StaticMenu(ReplyKeyboard::new().row(["Live"])))
    }

    fn live(h: &Harness, root: &Arc<dyn Menu>) -> Arc<LiveApp> {
        LiveApp::new(&h.ctx, servers(), Arc::downgrade(root)).unwrap()
    }

    #[tokio::test]
    async fn keyboard_lists_servers_two_per_row() {
        let h = harness();
        let root = root();
        let app = live(&h, &root);

        let action = app.accept_button("Live").expect("claimed");
        action.run(target()).await.unwrap();

        let message = h.sink.last().unwrap();
        assert_eq!(message.text, "Live\n");
        let Markup::Reply(keyboard) = message.markup else {
            panic!("expected reply keyboard");
        };
        assert_eq!(
            keyboard.rows,
            vec![
                vec!["🔴 Server S1".to_string(), "🔴 Server S2".to_string()],
                vec!["🔴 Server S3".to_string()],
                vec!["Back to menu".to_string(), "Settings".to_string()],
            ]
        );
        app.shutdown().await;
    }

    #[tokio::test]
    async fn session_info_updates_status_and_name() {
        let h = harness();
        let root = root();
        let app = live(&h, &root);

        h.ctx.hub.publish_session_info(LiveSessionInfoData {
            server_id: "S2".to_string(),
            session_info: SessionInfo {
                server_name: "Endurance".to_string(),
                web_socket_running: true,
                receiving_data: true,
                ..SessionInfo::default()
            },
            ..LiveSessionInfoData::default()
        });
        settle().await;

        assert!(app.keyboard().contains("🟢 Endurance"));
        assert!(app.keyboard().contains("🔴 Server S1"));
        assert_eq!(app.servers()[1].name, "Endurance");
        app.shutdown().await;
    }

    #[tokio::test]
    async fn server_label_routes_to_its_server_app() {
        let h = harness();
        let root = root();
        let app = live(&h, &root);

        let action = app.accept_button("🔴 Server S3").expect("claimed");
        action.run(target()).await.unwrap();

        assert_eq!(h.sink.last().unwrap().text, "Server Server S3 is offline");
        app.shutdown().await;
    }

    #[tokio::test]
    async fn shared_back_label_goes_to_root() {
        let h = harness();
        let root = root();
        let app = live(&h, &root);

        let action = app.accept_button("Back to menu").expect("claimed");
        action.run(target()).await.unwrap();

        let message = h.sink.last().unwrap();
        assert_eq!(message.text, "OK");
        assert_eq!(
            message.markup,
            Markup::Reply(ReplyKeyboard::new().row(["Live"]))
        );
        app.shutdown().await;
    }

    #[tokio::test]
    async fn server_back_returns_live_keyboard() {
        let h = harness();
        let root = root();
        let app = live(&h, &root);

        let action = app.accept_button("Back to LiveTiming").expect("claimed");
        action.run(target()).await.unwrap();

        assert_eq!(h.sink.last().unwrap().markup, Markup::Reply(app.keyboard()));
        app.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_events_are_declined() {
        let h = harness();
        let root = root();
        let app = live(&h, &root);

        assert!(app.accept_button("Nothing here").is_none());
        assert!(app.accept_callback("show_live_timing:S9:BestLap").is_none());
        assert!(app.accept_command("/start").is_none());
        app.shutdown().await;
    }
}
