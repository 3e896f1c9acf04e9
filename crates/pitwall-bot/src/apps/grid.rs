//! Live timing table for one server.

use std::sync::{Arc, Weak};

use anyhow::Result;
use pitwall_core::chat::OutgoingMessage;
use pitwall_core::keyboard::{InlineButton, InlineKeyboard};
use pitwall_core::menu::{ApplicationMenu, Menu};
use pitwall_core::model::{DriverStanding, LiveSessionInfoData, LiveStandingData};
use pitwall_core::topics::{self, DRIVERS_SESSION, SESSION_INFO};
use pitwall_core::{Accepter, Action, CallbackData, Cached, ChatSink, ChatTarget, UpdaterSet};

use super::{AppContext, back};
use crate::format::{
    driver_code_name, render_table, sectors_cell, seconds_to_diff, seconds_to_hours_and_minutes,
    seconds_to_minutes, split_sectors, top_speed,
};
use crate::i18n::{Localizer, Msg};
use crate::servers::{Server, reported_name};

pub const SHOW_LIVE_TIMING: &str = "show_live_timing";

const SYMBOL_TIMES: &str = "⏱";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridView {
    #[default]
    BestLap,
    BestLapSectors,
    LastLap,
    LastLapSectors,
    Optimum,
    OptimumSectors,
    Status,
    Info,
    Gap,
}

impl GridView {
    pub const ALL: [GridView; 9] = [
        GridView::BestLap,
        GridView::BestLapSectors,
        GridView::LastLap,
        GridView::LastLapSectors,
        GridView::Optimum,
        GridView::OptimumSectors,
        GridView::Status,
        GridView::Info,
        GridView::Gap,
    ];

    /// Stable key carried in callback payloads.
    pub fn key(self) -> &'static str {
        match self {
            GridView::BestLap => "BestLap",
            GridView::BestLapSectors => "BestLapSectors",
            GridView::LastLap => "LastLap",
            GridView::LastLapSectors => "LastLapSectors",
            GridView::Optimum => "Optimum",
            GridView::OptimumSectors => "OptimumSectors",
            GridView::Status => "Status",
            GridView::Info => "Info",
            GridView::Gap => "Gap",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|view| view.key() == key)
    }

    fn label(self, loc: &Localizer) -> &'static str {
        loc.get(match self {
            GridView::BestLap => Msg::BestLap,
            GridView::BestLapSectors => Msg::BestLapSectors,
            GridView::LastLap => Msg::LastLap,
            GridView::LastLapSectors => Msg::LastLapSectors,
            GridView::Optimum => Msg::OptimumLap,
            GridView::OptimumSectors => Msg::OptimumLapSectors,
            GridView::Status => Msg::Status,
            GridView::Info => Msg::Info,
            GridView::Gap => Msg::Gap,
        })
    }

    fn header(self, loc: &Localizer) -> Vec<&'static str> {
        let driver = loc.get(Msg::Driver);
        match self {
            GridView::Status => vec![driver, loc.get(Msg::Sectors), "S"],
            GridView::Info => vec![driver, loc.get(Msg::HeaderName), loc.get(Msg::HeaderLap)],
            GridView::LastLap => vec![driver, loc.get(Msg::HeaderLast), loc.get(Msg::HeaderBest)],
            GridView::Optimum => {
                vec![driver, loc.get(Msg::HeaderOptimum), loc.get(Msg::HeaderBest)]
            }
            GridView::BestLap => {
                vec![driver, loc.get(Msg::HeaderBest), loc.get(Msg::HeaderTopSpeed)]
            }
            GridView::BestLapSectors
            | GridView::LastLapSectors
            | GridView::OptimumSectors
            | GridView::Gap => vec![driver, self.label(loc)],
        }
    }

    fn row(self, driver: &DriverStanding, leader: &DriverStanding) -> Vec<String> {
        let code = driver_code_name(&driver.driver_name);
        match self {
            GridView::Status => {
                // Current lap splits while the lap is in progress, else the last lap.
                let sectors = if driver.current_sector_time1 > 0.0 {
                    split_sectors(driver.current_sector_time1, driver.current_sector_time2, 0.0)
                } else {
                    split_sectors(
                        driver.last_sector_time1,
                        driver.last_sector_time2,
                        driver.last_lap_time,
                    )
                };
                let state = if driver.in_garage_stall || driver.pitting {
                    "P"
                } else {
                    ""
                };
                vec![code, sectors_cell(sectors), state.to_string()]
            }
            GridView::Info => vec![
                code,
                driver.driver_name.clone(),
                driver.laps_completed.to_string(),
            ],
            GridView::Gap => {
                let gap = if std::ptr::eq(driver, leader) {
                    seconds_to_minutes(driver.best_lap_time)
                } else if driver.best_lap_time > 0.0 && leader.best_lap_time > 0.0 {
                    seconds_to_diff(driver.best_lap_time - leader.best_lap_time)
                } else {
                    "-".to_string()
                };
                vec![code, gap]
            }
            GridView::BestLap => {
                let speed = (driver.best_lap > 0)
                    .then(|| driver.top_speed_per_lap.get(&driver.best_lap))
                    .flatten()
                    .map_or_else(|| "-".to_string(), |&kph| top_speed(kph));
                vec![code, seconds_to_minutes(driver.best_lap_time), speed]
            }
            GridView::LastLap => vec![
                code,
                seconds_to_minutes(driver.last_lap_time),
                seconds_to_minutes(driver.best_lap_time),
            ],
            GridView::Optimum => {
                let sectors = [
                    driver.best_sector_time1,
                    driver.best_sector_time2,
                    driver.best_sector_time3,
                ];
                let optimum = if sectors.iter().all(|&s| s > 0.0) {
                    sectors.iter().sum::<f64>()
                } else {
                    -1.0
                };
                vec![
                    code,
                    seconds_to_minutes(optimum),
                    seconds_to_minutes(driver.best_lap_time),
                ]
            }
            GridView::OptimumSectors => vec![
                code,
                sectors_cell([
                    driver.best_sector_time1,
                    driver.best_sector_time2,
                    driver.best_sector_time3,
                ]),
            ],
            GridView::BestLapSectors => vec![
                code,
                sectors_cell(split_sectors(
                    driver.best_lap_sector_time1,
                    driver.best_lap_sector_time2,
                    driver.best_lap_time,
                )),
            ],
            GridView::LastLapSectors => vec![
                code,
                sectors_cell(split_sectors(
                    driver.last_sector_time1,
                    driver.last_sector_time2,
                    driver.last_lap_time,
                )),
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GridSnapshot {
    standings: LiveStandingData,
    session: LiveSessionInfoData,
}

pub struct GridApp {
    sink: Arc<dyn ChatSink>,
    loc: Localizer,
    menu: ApplicationMenu,
    server_id: String,
    /// Derived view: the label of the button that opens this grid.
    state: Arc<Cached<GridSnapshot, String>>,
    updaters: UpdaterSet,
}

impl GridApp {
    pub fn new(ctx: &AppContext, server: &Server, parent: Weak<dyn Menu>) -> Result<Arc<Self>> {
        let standings = ctx
            .hub
            .standings
            .subscribe(&topics::topic(DRIVERS_SESSION, &server.id))?;
        let session = ctx
            .hub
            .session_info
            .subscribe(&topics::topic(SESSION_INFO, &server.id))?;

        let title = ctx.text(Msg::ButtonGrid);
        let fallback = server.name.clone();
        let state = Arc::new(Cached::new(GridSnapshot::default(), move |s: &GridSnapshot| {
            let name = reported_name(&s.session).unwrap_or(fallback.as_str());
            format!("{title} {name}")
        }));

        let updaters = UpdaterSet::new(&ctx.cancel);
        let target = Arc::clone(&state);
        updaters.spawn(standings, move |standings| {
            target.update(|s| s.standings = standings);
        });
        let target = Arc::clone(&state);
        updaters.spawn(session, move |session| {
            target.update(|s| s.session = session);
        });

        Ok(Arc::new(Self {
            sink: Arc::clone(&ctx.sink),
            loc: ctx.loc,
            menu: ApplicationMenu::new("", server.id.clone(), parent, ctx.back_prefix()),
            server_id: server.id.clone(),
            state,
            updaters,
        }))
    }

    pub fn button_label(&self) -> String {
        self.state.view()
    }

    pub async fn shutdown(&self) {
        self.updaters.shutdown().await;
    }

    fn render(&self, view: GridView) -> Action {
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let loc = self.loc;
        let server_id = self.server_id.clone();
        Action::new(move |target: ChatTarget| async move {
            let snapshot = state.snapshot();
            let message =
                grid_message(&loc, &server_id, &snapshot, view).editing(target.message_id);
            sink.send(target.chat_id, message).await
        })
    }
}

fn grid_message(
    loc: &Localizer,
    server_id: &str,
    snapshot: &GridSnapshot,
    view: GridView,
) -> OutgoingMessage {
    let standings = &snapshot.standings;
    let Some(leader) = standings.drivers.first() else {
        return OutgoingMessage::text(loc.get(Msg::NoDriversInSession));
    };

    let rows: Vec<Vec<String>> = standings
        .drivers
        .iter()
        .map(|driver| view.row(driver, leader))
        .collect();
    let table = render_table(&view.header(loc), &rows);
    let info = &snapshot.session.session_info;
    let title = loc.format(
        Msg::GridTitle,
        &[
            &seconds_to_hours_and_minutes(info.time_left()),
            &standings.server_name,
        ],
    );

    OutgoingMessage::text(format!("{title}\n\n{table}"))
        .preformatted()
        .inline_keyboard(grid_keyboard(loc, server_id, &snapshot.session))
}

fn grid_keyboard(loc: &Localizer, server_id: &str, session: &LiveSessionInfoData) -> InlineKeyboard {
    let button = |view: GridView, symbol: Option<&str>| {
        let label = match symbol {
            Some(symbol) => format!("{} {symbol}", view.label(loc)),
            None => view.label(loc).to_string(),
        };
        InlineButton::callback(
            label,
            CallbackData::encode(SHOW_LIVE_TIMING, server_id, &[view.key()]),
        )
    };

    let mut last_row = vec![
        button(GridView::Status, None),
        button(GridView::Info, None),
        button(GridView::Gap, None),
    ];
    let info = &session.session_info;
    if !info.live_map_domain.is_empty() {
        last_row.push(InlineButton::url(loc.get(Msg::LiveMap), info.live_map_url()));
    }

    InlineKeyboard::new()
        .row(vec![
            button(GridView::BestLap, Some(SYMBOL_TIMES)),
            button(GridView::BestLapSectors, None),
        ])
        .row(vec![
            button(GridView::LastLap, Some(SYMBOL_TIMES)),
            button(GridView::LastLapSectors, None),
        ])
        .row(vec![
            button(GridView::Optimum, Some(SYMBOL_TIMES)),
            button(GridView::OptimumSectors, None),
        ])
        .row(last_row)
}

impl Accepter for GridApp {
    fn accept_callback(&self, payload: &str) -> Option<Action> {
        let data = CallbackData::for_owner(payload, SHOW_LIVE_TIMING, &self.server_id)?;
        let view = data
            .arg(0)
            .and_then(GridView::from_key)
            .unwrap_or_default();
        Some(self.render(view))
    }

    fn accept_button(&self, label: &str) -> Option<Action> {
        if label == self.state.view() {
            return Some(self.render(GridView::default()));
        }
        if self.menu.is_back(label) {
            return Some(back(&self.sink, &self.menu));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pitwall_core::chat::{Markup, TextFormat};
    use pitwall_core::keyboard::ReplyKeyboard;
    use pitwall_core::menu::StaticMenu;

    use super::*;
    use crate::apps::testing::{CHAT, harness, settle, target};

    fn server() -> Server {
        Server {
            id: "S1".to_string(),
            name: "Sprint".to_string(),
            ..Server::default()
        }
    }

    fn driver(name: &str, best: f64) -> DriverStanding {
        DriverStanding {
            driver_name: name.to_string(),
            best_lap: 3,
            best_lap_time: best,
            top_speed_per_lap: HashMap::from([(3, 301.27)]),
            ..Default::default()
        }
    }

    fn standings() -> LiveStandingData {
        LiveStandingData {
            server_id: "S1".to_string(),
            server_name: "Sprint".to_string(),
            drivers: vec![driver("Jane Doe", 83.456), driver("Max Power", 84.0)],
        }
    }

    #[test]
    fn view_keys_round_trip() {
        for view in GridView::ALL {
            assert_eq!(GridView::from_key(view.key()), Some(view));
        }
        assert_eq!(GridView::from_key("Nope"), None);
    }

    #[test]
    fn gap_rows_measure_from_leader() {
        let data = standings();
        let leader = &data.drivers[0];
        assert_eq!(GridView::Gap.row(leader, leader)[1], "1:23.456");
        assert_eq!(GridView::Gap.row(&data.drivers[1], leader)[1], "+0.544");
        assert_eq!(GridView::BestLap.row(leader, leader)[2], "301.3 km/h");
    }

    #[tokio::test]
    async fn button_renders_table_with_inline_keyboard() {
        let h = harness();
        let root: Arc<dyn Menu> = Arc::new(StaticMenu(ReplyKeyboard::new()));
        let grid = GridApp::new(&h.ctx, &server(), Arc::downgrade(&root)).unwrap();
        assert_eq!(grid.button_label(), "Grid Sprint");

        h.ctx.hub.publish_standings(standings());
        settle().await;

        let action = grid.accept_button("Grid Sprint").expect("claimed");
        action.run(target()).await.unwrap();

        let (chat, message) = h.sink.sent().pop().unwrap();
        assert_eq!(chat, CHAT);
        assert_eq!(message.format, TextFormat::Preformatted);
        assert!(message.text.contains("DOE"));
        assert!(message.text.contains("Server: \"Sprint\""));
        assert_eq!(message.edit, None);
        let Markup::Inline(keyboard) = message.markup else {
            panic!("expected inline keyboard");
        };
        assert!(keyboard.callback_data().any(|d| d == "show_live_timing:S1:Gap"));
        grid.shutdown().await;
    }

    #[tokio::test]
    async fn callback_edits_in_place() {
        let h = harness();
        let root: Arc<dyn Menu> = Arc::new(StaticMenu(ReplyKeyboard::new()));
        let grid = GridApp::new(&h.ctx, &server(), Arc::downgrade(&root)).unwrap();
        h.ctx.hub.publish_standings(standings());
        settle().await;

        let action = grid.accept_callback("show_live_timing:S1:Gap").expect("claimed");
        action.run(target().with_message(55)).await.unwrap();

        let message = h.sink.last().unwrap();
        assert_eq!(message.edit, Some(55));
        assert!(message.text.contains("+0.544"));
        grid.shutdown().await;
    }

    #[tokio::test]
    async fn foreign_owner_and_kind_are_declined() {
        let h = harness();
        let root: Arc<dyn Menu> = Arc::new(StaticMenu(ReplyKeyboard::new()));
        let grid = GridApp::new(&h.ctx, &server(), Arc::downgrade(&root)).unwrap();

        assert!(grid.accept_callback("show_live_timing:S2:BestLap").is_none());
        assert!(grid.accept_callback("show_drivers:S1:Times:Jane").is_none());
        assert!(grid.accept_button("Grid Other").is_none());
        assert!(h.sink.sent().is_empty());
        grid.shutdown().await;
    }

    #[tokio::test]
    async fn empty_grid_sends_notice() {
        let h = harness();
        let root: Arc<dyn Menu> = Arc::new(StaticMenu(ReplyKeyboard::new()));
        let grid = GridApp::new(&h.ctx, &server(), Arc::downgrade(&root)).unwrap();

        let action = grid.accept_button("Grid Sprint").expect("claimed");
        action.run(target()).await.unwrap();
        assert_eq!(
            h.sink.last().unwrap().text,
            "There are no drivers in the session"
        );
        grid.shutdown().await;
    }
}
