//! Per-server menu: session summary plus the grid and stint views.

use std::sync::{Arc, Weak};

use anyhow::Result;
use pitwall_core::chat::OutgoingMessage;
use pitwall_core::keyboard::ReplyKeyboard;
use pitwall_core::menu::{ApplicationMenu, Menu};
use pitwall_core::model::{LiveSessionInfoData, Resource};
use pitwall_core::topics::{self, SESSION_INFO, THUMBNAIL};
use pitwall_core::{Accepter, Action, Cached, ChatSink, ChatTarget, Children, UpdaterSet};
use tracing::debug;

use super::{AppContext, GridApp, LIVE_APP_NAME, StintApp, back};
use crate::format::seconds_to_hours_and_minutes;
use crate::i18n::{Localizer, Msg};
use crate::servers::{Server, reported_name, sanitize_server_name};

/// Sessions with at least this many laps are shown as unlimited.
const UNLIMITED_LAPS: i64 = 100;

#[derive(Debug, Clone, Default)]
struct ServerSnapshot {
    name: String,
    session: LiveSessionInfoData,
    thumbnail: Resource,
}

pub struct ServerApp {
    sink: Arc<dyn ChatSink>,
    loc: Localizer,
    menu: ApplicationMenu,
    server_id: String,
    state: Arc<Cached<ServerSnapshot, ReplyKeyboard>>,
    grid: Arc<GridApp>,
    stint: Arc<StintApp>,
    children: Children,
    updaters: UpdaterSet,
}

impl ServerApp {
    pub fn new(ctx: &AppContext, server: &Server, parent: Weak<dyn Menu>) -> Result<Arc<Self>> {
        let session = ctx
            .hub
            .session_info
            .subscribe(&topics::topic(SESSION_INFO, &server.id))?;
        let thumbnail = ctx
            .hub
            .track_thumbnail
            .subscribe(&topics::topic(THUMBNAIL, &server.id))?;

        let menu = ApplicationMenu::new(
            server.status_and_name(),
            LIVE_APP_NAME,
            parent,
            ctx.back_prefix(),
        );
        let stint_title = ctx.text(Msg::ButtonStint);
        let grid_title = ctx.text(Msg::ButtonGrid);
        let info_title = ctx.text(Msg::ButtonInfo);
        let back_label = menu.back_label().to_string();
        let initial = ServerSnapshot {
            name: server.name.clone(),
            ..ServerSnapshot::default()
        };
        let state = Arc::new(Cached::new(initial, move |s: &ServerSnapshot| {
            ReplyKeyboard::new()
                .row([
                    format!("{stint_title} {}", s.name),
                    format!("{grid_title} {}", s.name),
                ])
                .row([back_label.clone(), format!("{info_title} {}", s.name)])
        }));

        let updaters = UpdaterSet::new(&ctx.cancel);
        let target = Arc::clone(&state);
        let fallback = server.name.clone();
        updaters.spawn(session, move |session: LiveSessionInfoData| {
            target.update(|s| {
                s.name = reported_name(&session).unwrap_or(fallback.as_str()).to_string();
                s.session = session;
            });
        });
        let target = Arc::clone(&state);
        updaters.spawn(thumbnail, move |thumbnail| {
            target.update(|s| s.thumbnail = thumbnail);
        });

        let own_menu: Weak<Cached<ServerSnapshot, ReplyKeyboard>> = Arc::downgrade(&state);
        let grid = GridApp::new(ctx, server, own_menu.clone())?;
        let stint = StintApp::new(ctx, server, own_menu)?;
        let children = [
            Arc::clone(&grid) as Arc<dyn Accepter>,
            Arc::clone(&stint) as Arc<dyn Accepter>,
        ]
        .into_iter()
        .collect();

        Ok(Arc::new(Self {
            sink: Arc::clone(&ctx.sink),
            loc: ctx.loc,
            menu,
            server_id: server.id.clone(),
            state,
            grid,
            stint,
            children,
            updaters,
        }))
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Keyboard shown while this server is selected.
    pub fn keyboard(&self) -> ReplyKeyboard {
        self.state.view()
    }

    pub async fn shutdown(&self) {
        self.updaters.shutdown().await;
        self.grid.shutdown().await;
        self.stint.shutdown().await;
    }

    fn is_info_button(&self, label: &str) -> bool {
        let label = sanitize_server_name(label);
        let name = self.state.read(|s, _| s.name.clone());
        label == name || label == format!("{} {name}", self.loc.get(Msg::ButtonInfo))
    }

    fn render_info(&self) -> Action {
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let loc = self.loc;
        let menu = self.menu.clone();
        Action::new(move |target: ChatTarget| async move {
            let (snapshot, keyboard) = state.read(|s, keyboard| (s.clone(), keyboard.clone()));
            let info = &snapshot.session.session_info;
            let message = if !info.web_socket_running {
                OutgoingMessage::text(loc.format(Msg::ServerOffline, &[&snapshot.name]))
                    .reply_keyboard(menu.prev_menu())
            } else if !info.receiving_data {
                OutgoingMessage::text(loc.format(Msg::ServerNoData, &[&snapshot.name]))
                    .reply_keyboard(menu.prev_menu())
            } else {
                let text = info_text(&loc, &snapshot);
                let message = if snapshot.thumbnail.is_zero() {
                    debug!(server = %snapshot.name, "no track thumbnail available");
                    OutgoingMessage::text(text)
                } else {
                    OutgoingMessage::photo(snapshot.thumbnail.clone(), text)
                };
                message.reply_keyboard(keyboard)
            };
            sink.send(target.chat_id, message).await
        })
    }
}

fn info_text(loc: &Localizer, snapshot: &ServerSnapshot) -> String {
    let info = &snapshot.session.session_info;
    let laps = if info.maximum_laps < UNLIMITED_LAPS {
        info.maximum_laps.to_string()
    } else {
        loc.get(Msg::NotLimited).to_string()
    };
    format!(
        "{name}:\n\
         ‣ {track}: {track_name} ({distance:.0}m)\n\
         ‣ {time_left}: {left}\n\
         ‣ {session}: {session_name} ({laps_label}: {laps})\n\
         ‣ {cars}: {vehicles}\n\
         ‣ {rain}: {raining:.1}% (min: {min:.1}%. max: {max:.1}%)\n\
         ‣ {temp}: {track_temp:.0}ºC/{ambient:.0}ºC\n",
        name = snapshot.name,
        track = loc.get(Msg::Track),
        track_name = info.track_name,
        distance = info.lap_distance,
        time_left = loc.get(Msg::TimeLeft),
        left = seconds_to_hours_and_minutes(info.time_left()),
        session = loc.get(Msg::Session),
        session_name = info.session,
        laps_label = loc.get(Msg::Laps),
        cars = loc.get(Msg::CarsInSession),
        vehicles = info.number_of_vehicles,
        rain = loc.get(Msg::Rain),
        raining = info.raining,
        min = info.min_path_wetness,
        max = info.max_path_wetness,
        temp = loc.get(Msg::Temperature),
        track_temp = info.track_temp,
        ambient = info.ambient_temp,
    )
}

impl Accepter for ServerApp {
    fn accept_command(&self, command: &str) -> Option<Action> {
        self.children.command(command)
    }

    fn accept_callback(&self, payload: &str) -> Option<Action> {
        self.children.callback(payload)
    }

    fn accept_button(&self, label: &str) -> Option<Action> {
        if self.is_info_button(label) {
            return Some(self.render_info());
        }
        if self.menu.is_back(label) {
            return Some(back(&self.sink, &self.menu));
        }
        self.children.button(label)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pitwall_core::chat::Markup;
    use pitwall_core::menu::StaticMenu;
    use pitwall_core::model::{LiveStandingData, LiveStandingHistoryData, SessionInfo};

    use super::*;
    use crate::apps::testing::{Harness, harness, settle, target};

    fn server(id: &str) -> Server {
        Server {
            id: id.to_string(),
            url: "http://host".to_string(),
            name: "Sprint".to_string(),
            ..Server::default()
        }
    }

    fn online(laps: i64) -> LiveSessionInfoData {
        LiveSessionInfoData {
            server_id: "S1".to_string(),
            server_name: "Sprint".to_string(),
            session_info: SessionInfo {
                track_name: "Monza".to_string(),
                session: "RACE1".to_string(),
                lap_distance: 5793.0,
                maximum_laps: laps,
                number_of_vehicles: 20,
                web_socket_running: true,
                receiving_data: true,
                ..SessionInfo::default()
            },
        }
    }

    fn root() -> Arc<dyn Menu> {
        Arc::new(StaticMenu(ReplyKeyboard::new().row(["🟢 Sprint"])))
    }

    fn app(h: &Harness, root: &Arc<dyn Menu>) -> Arc<ServerApp> {
        ServerApp::new(&h.ctx, &server("S1"), Arc::downgrade(root)).unwrap()
    }

    #[tokio::test]
    async fn offline_server_reports_and_returns_to_parent_menu() {
        let h = harness();
        let root = root();
        let app = app(&h, &root);

        let action = app.accept_button("🔴 Sprint").expect("claimed");
        action.run(target()).await.unwrap();

        let message = h.sink.last().unwrap();
        assert_eq!(message.text, "Server Sprint is offline");
        assert_eq!(
            message.markup,
            Markup::Reply(ReplyKeyboard::new().row(["🟢 Sprint"]))
        );
        app.shutdown().await;
    }

    #[tokio::test]
    async fn info_with_thumbnail_is_a_photo() {
        let h = harness();
        let root = root();
        let app = app(&h, &root);
        h.ctx.hub.publish_session_info(online(120));
        h.ctx.hub.publish_track_thumbnail(
            "S1",
            Resource::new("monza", "image/png", Bytes::from_static(b"png")),
        );
        settle().await;

        let action = app.accept_button("Info Sprint").expect("claimed");
        action.run(target()).await.unwrap();

        let message = h.sink.last().unwrap();
        assert!(message.photo.is_some());
        assert!(message.text.contains("‣ Track: Monza (5793m)"));
        assert!(message.text.contains("(Laps: Not Limited)"));
        let Markup::Reply(keyboard) = message.markup else {
            panic!("expected reply keyboard");
        };
        assert!(keyboard.contains("Stint Sprint"));
        assert!(keyboard.contains("Back to LiveTiming"));
        app.shutdown().await;
    }

    #[tokio::test]
    async fn limited_race_shows_lap_count_as_text() {
        let h = harness();
        let root = root();
        let app = app(&h, &root);
        h.ctx.hub.publish_session_info(online(25));
        settle().await;

        let action = app.accept_button("🟢 Sprint").expect("claimed");
        action.run(target()).await.unwrap();

        let message = h.sink.last().unwrap();
        assert!(message.photo.is_none());
        assert!(message.text.contains("(Laps: 25)"));
        app.shutdown().await;
    }

    #[tokio::test]
    async fn grid_callback_is_owned_by_grid_child() {
        let h = harness();
        let root = root();
        let app = app(&h, &root);

        let action = app
            .accept_callback("show_live_timing:S1:BestLap")
            .expect("claimed");
        action.run(target().with_message(3)).await.unwrap();
        assert_eq!(
            h.sink.last().unwrap().text,
            "There are no drivers in the session"
        );

        assert!(app.accept_callback("show_live_timing:S2:BestLap").is_none());
        assert!(app.accept_callback("garbage").is_none());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn back_returns_to_live_menu() {
        let h = harness();
        let root = root();
        let app = app(&h, &root);

        let action = app.accept_button("Back to LiveTiming").expect("claimed");
        action.run(target()).await.unwrap();

        let message = h.sink.last().unwrap();
        assert_eq!(message.text, "OK");
        assert_eq!(
            message.markup,
            Markup::Reply(ReplyKeyboard::new().row(["🟢 Sprint"]))
        );
        app.shutdown().await;
    }

    #[tokio::test]
    async fn child_back_shows_server_keyboard() {
        let h = harness();
        let root = root();
        let app = app(&h, &root);

        let action = app.accept_button("Back to S1").expect("claimed by a child");
        action.run(target()).await.unwrap();

        assert_eq!(h.sink.last().unwrap().markup, Markup::Reply(app.keyboard()));
        assert_eq!(app.server_id(), "S1");
        app.shutdown().await;
    }

    #[tokio::test]
    async fn child_buttons_follow_session_name_when_streams_disagree() {
        let h = harness();
        let root = root();
        let app = app(&h, &root);
        let mut session = online(25);
        session.server_name = "Sprint Europe".to_string();
        h.ctx.hub.publish_session_info(session);
        h.ctx.hub.publish_standings(LiveStandingData {
            server_id: "S1".to_string(),
            server_name: "Sprint EU".to_string(),
            drivers: Vec::new(),
        });
        h.ctx.hub.publish_standing_history(LiveStandingHistoryData {
            server_id: "S1".to_string(),
            server_name: "Sprint (EU)".to_string(),
            ..LiveStandingHistoryData::default()
        });
        settle().await;

        let keyboard = app.keyboard();
        assert!(keyboard.contains("Grid Sprint Europe"));
        assert!(keyboard.contains("Stint Sprint Europe"));
        assert!(app.accept_button("Grid Sprint Europe").is_some());
        assert!(app.accept_button("Stint Sprint Europe").is_some());
        assert!(app.accept_button("Grid Sprint EU").is_none());
        app.shutdown().await;
    }
}
