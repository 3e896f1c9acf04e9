//! Per-driver lap history for one server.

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Result;
use pitwall_core::chat::OutgoingMessage;
use pitwall_core::keyboard::{InlineButton, InlineKeyboard};
use pitwall_core::menu::{ApplicationMenu, Menu};
use pitwall_core::model::{LiveSessionInfoData, LiveStandingHistoryData, StandingHistoryDriverData};
use pitwall_core::topics::{self, SESSION_INFO, STINT_DATA};
use pitwall_core::{Accepter, Action, CallbackData, Cached, ChatSink, ChatTarget, UpdaterSet};
use tracing::debug;

use super::{AppContext, back};
use crate::fetch::{FetchOutcome, ImageFetcher, car_image_within};
use crate::format::{
    render_table, sectors_cell, seconds_to_hours_and_minutes, seconds_to_minutes, split_sectors,
    top_speed,
};
use crate::i18n::{Localizer, Msg};
use crate::servers::{Server, reported_name};

pub const SHOW_DRIVERS: &str = "show_drivers";
pub const SHOW_CARS: &str = "show_cars";

const SYMBOL_TIMES: &str = "⏱";
const SYMBOL_SECTORS: &str = "🔂";
const SYMBOL_PHOTO: &str = "📸";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StintView {
    #[default]
    Times,
    Sectors,
}

impl StintView {
    pub fn key(self) -> &'static str {
        match self {
            StintView::Times => "Times",
            StintView::Sectors => "Sectors",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        [StintView::Times, StintView::Sectors]
            .into_iter()
            .find(|view| view.key() == key)
    }

    fn label(self, loc: &Localizer) -> &'static str {
        match self {
            StintView::Times => loc.get(Msg::Times),
            StintView::Sectors => loc.get(Msg::Sectors),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StintSnapshot {
    history: LiveStandingHistoryData,
    session: LiveSessionInfoData,
}

pub struct StintApp {
    sink: Arc<dyn ChatSink>,
    loc: Localizer,
    fetcher: Arc<dyn ImageFetcher>,
    fetch_timeout: Duration,
    menu: ApplicationMenu,
    server_id: String,
    server_url: String,
    /// Derived view: the label of the button that opens this app.
    state: Arc<Cached<StintSnapshot, String>>,
    updaters: UpdaterSet,
}

impl StintApp {
    pub fn new(ctx: &AppContext, server: &Server, parent: Weak<dyn Menu>) -> Result<Arc<Self>> {
        let history = ctx
            .hub
            .standing_history
            .subscribe(&topics::topic(STINT_DATA, &server.id))?;
        let session = ctx
            .hub
            .session_info
            .subscribe(&topics::topic(SESSION_INFO, &server.id))?;

        let title = ctx.text(Msg::ButtonStint);
        let fallback = server.name.clone();
        let state = Arc::new(Cached::new(StintSnapshot::default(), move |s: &StintSnapshot| {
            let name = reported_name(&s.session).unwrap_or(fallback.as_str());
            format!("{title} {name}")
        }));

        let updaters = UpdaterSet::new(&ctx.cancel);
        let target = Arc::clone(&state);
        updaters.spawn(history, move |history| {
            target.update(|s| s.history = history);
        });
        let target = Arc::clone(&state);
        updaters.spawn(session, move |session| {
            target.update(|s| s.session = session);
        });

        Ok(Arc::new(Self {
            sink: Arc::clone(&ctx.sink),
            loc: ctx.loc,
            fetcher: Arc::clone(&ctx.fetcher),
            fetch_timeout: ctx.fetch_timeout,
            menu: ApplicationMenu::new("", server.id.clone(), parent, ctx.back_prefix()),
            server_id: server.id.clone(),
            server_url: server.url.clone(),
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

    fn render_drivers(&self) -> Action {
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let loc = self.loc;
        let server_id = self.server_id.clone();
        Action::new(move |target: ChatTarget| async move {
            let history = state.read(|s, _| s.history.clone());
            let message = if history.driver_names.is_empty() {
                OutgoingMessage::text(loc.get(Msg::NoDriversInSession))
            } else {
                drivers_message(&loc, &server_id, &history.driver_names)
            };
            sink.send(target.chat_id, message).await
        })
    }

    fn render_stint(&self, view: StintView, driver: String) -> Action {
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let loc = self.loc;
        let server_id = self.server_id.clone();
        Action::new(move |target: ChatTarget| async move {
            let snapshot = state.snapshot();
            let message = match snapshot.history.drivers_data.get(&driver) {
                None => OutgoingMessage::text(loc.format(Msg::NoDataForDriver, &[&driver])),
                Some(laps) if laps.is_empty() => {
                    OutgoingMessage::text(loc.get(Msg::NoLapsInSession))
                }
                Some(laps) => {
                    stint_message(&loc, &server_id, &snapshot, &driver, laps, view)
                        .editing(target.message_id)
                }
            };
            sink.send(target.chat_id, message).await
        })
    }

    fn render_car(&self, driver: String) -> Action {
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let loc = self.loc;
        let fetcher = Arc::clone(&self.fetcher);
        let timeout = self.fetch_timeout;
        let server_url = self.server_url.clone();
        Action::new(move |target: ChatTarget| async move {
            let first_lap = state.read(|s, _| {
                s.history
                    .drivers_data
                    .get(&driver)
                    .and_then(|laps| laps.first())
                    .filter(|lap| !lap.car_id.is_empty())
                    .cloned()
            });
            let Some(lap) = first_lap else {
                let notice = loc.format(Msg::NoDataForDriver, &[&driver]);
                return sink.send(target.chat_id, OutgoingMessage::text(notice)).await;
            };

            let message =
                match car_image_within(&fetcher, &server_url, &lap.car_id, timeout).await {
                    FetchOutcome::Ready(image) => OutgoingMessage::photo(image, car_caption(&loc, &lap)),
                    FetchOutcome::Failed(err) => OutgoingMessage::text(
                        loc.format(Msg::CarImageFailed, &[&driver, &format!("{err:#}")]),
                    ),
                    FetchOutcome::TimedOut => {
                        OutgoingMessage::text(loc.format(Msg::CarImageTimeout, &[&driver]))
                    }
                };
            sink.send(target.chat_id, message).await
        })
    }
}

fn drivers_message(loc: &Localizer, server_id: &str, drivers: &[String]) -> OutgoingMessage {
    let buttons = drivers
        .iter()
        .map(|driver| {
            InlineButton::callback(
                driver.clone(),
                CallbackData::encode(SHOW_DRIVERS, server_id, &[StintView::Times.key(), driver]),
            )
        })
        .collect();
    OutgoingMessage::text(format!("{}\n\n", loc.get(Msg::ChooseDriver)))
        .inline_keyboard(InlineKeyboard::new().chunked(buttons, 2))
}

fn stint_message(
    loc: &Localizer,
    server_id: &str,
    snapshot: &StintSnapshot,
    driver: &str,
    laps: &[StandingHistoryDriverData],
    view: StintView,
) -> OutgoingMessage {
    let lap_header = loc.get(Msg::HeaderLap);
    let (header, rows): (Vec<&str>, Vec<Vec<String>>) = match view {
        StintView::Times => (
            vec![lap_header, view.label(loc), loc.get(Msg::HeaderTopSpeed)],
            laps.iter()
                .enumerate()
                .map(|(idx, lap)| {
                    let speed = if lap.lap_time > 0.0 {
                        top_speed(lap.top_speed)
                    } else {
                        "-".to_string()
                    };
                    vec![
                        (idx + 1).to_string(),
                        seconds_to_minutes(lap.lap_time),
                        speed,
                    ]
                })
                .collect(),
        ),
        StintView::Sectors => (
            vec![lap_header, view.label(loc)],
            laps.iter()
                .enumerate()
                .map(|(idx, lap)| {
                    let sectors = split_sectors(lap.sector_time1, lap.sector_time2, lap.lap_time);
                    vec![(idx + 1).to_string(), sectors_cell(sectors)]
                })
                .collect(),
        ),
    };

    let title = loc.format(
        Msg::StintTitle,
        &[
            &seconds_to_hours_and_minutes(snapshot.session.session_info.time_left()),
            driver,
            &snapshot.history.server_name,
        ],
    );
    let table = render_table(&header, &rows);
    OutgoingMessage::text(format!("{title}\n\n{table}"))
        .preformatted()
        .inline_keyboard(stint_keyboard(loc, server_id, driver))
}

fn stint_keyboard(loc: &Localizer, server_id: &str, driver: &str) -> InlineKeyboard {
    let view_button = |view: StintView, symbol: &str| {
        InlineButton::callback(
            format!("{} {symbol}", view.label(loc)),
            CallbackData::encode(SHOW_DRIVERS, server_id, &[view.key(), driver]),
        )
    };
    InlineKeyboard::new()
        .row(vec![
            view_button(StintView::Times, SYMBOL_TIMES),
            view_button(StintView::Sectors, SYMBOL_SECTORS),
        ])
        .row(vec![InlineButton::callback(
            format!("{} {SYMBOL_PHOTO}", loc.get(Msg::Car)),
            CallbackData::encode(SHOW_CARS, server_id, &[driver]),
        )])
}

fn car_caption(loc: &Localizer, lap: &StandingHistoryDriverData) -> String {
    format!(
        "‣ {}: {}\n‣ {}: {}\n‣ {}: {}",
        loc.get(Msg::Car),
        lap.vehicle_name,
        loc.get(Msg::Class),
        lap.car_class,
        loc.get(Msg::Driver),
        lap.driver_name,
    )
}

impl Accepter for StintApp {
    fn accept_callback(&self, payload: &str) -> Option<Action> {
        if let Some(data) = CallbackData::for_owner(payload, SHOW_DRIVERS, &self.server_id) {
            let view = data
                .arg(0)
                .and_then(StintView::from_key)
                .unwrap_or_default();
            // Driver names may themselves contain the separator.
            let driver = data.args.get(1..).unwrap_or_default().join(":");
            debug!(server_id = %self.server_id, driver = %driver, "stint requested");
            return Some(self.render_stint(view, driver));
        }
        if let Some(data) = CallbackData::for_owner(payload, SHOW_CARS, &self.server_id) {
            return Some(self.render_car(data.args.join(":")));
        }
        None
    }

    fn accept_button(&self, label: &str) -> Option<Action> {
        if label == self.state.view() {
            return Some(self.render_drivers());
        }
        if self.menu.is_back(label) {
            return Some(back(&self.sink, &self.menu));
        }
        None
    }
}
