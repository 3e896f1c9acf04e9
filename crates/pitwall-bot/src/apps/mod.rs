//! The menu tree: one node per feature, each owning its cached state.
//!
//! ```text
//! MainApp ── LiveApp ─┬─ ServerApp(S1) ─┬─ GridApp
//!                     │                 └─ StintApp
//!                     ├─ ServerApp(S2) ...
//!                     └─ SettingsApp
//! ```

use std::sync::Arc;
use std::time::Duration;

use pitwall_core::chat::OutgoingMessage;
use pitwall_core::menu::ApplicationMenu;
use pitwall_core::{Action, ChatSink, Hub};
use tokio_util::sync::CancellationToken;

use crate::fetch::ImageFetcher;
use crate::i18n::{Localizer, Msg};
use crate::settings_store::SettingsStore;

mod grid;
mod live;
mod main_app;
mod server;
mod settings;
mod stint;

pub use grid::{GridApp, GridView};
pub use live::LiveApp;
pub use main_app::MainApp;
pub use server::ServerApp;
pub use settings::SettingsApp;
pub use stint::{StintApp, StintView};

pub(crate) const LIVE_APP_NAME: &str = "LiveTiming";
pub(crate) const ROOT_MENU_NAME: &str = "menu";

/// Collaborators shared by every node of the tree.
pub struct AppContext {
    pub hub: Hub,
    pub sink: Arc<dyn ChatSink>,
    pub loc: Localizer,
    pub settings: Arc<dyn SettingsStore>,
    pub fetcher: Arc<dyn ImageFetcher>,
    /// Bound on fetches triggered by a user action.
    pub fetch_timeout: Duration,
    /// Parent of every updater task in the tree.
    pub cancel: CancellationToken,
}

impl AppContext {
    pub fn text(&self, msg: Msg) -> &'static str {
        self.loc.get(msg)
    }

    pub fn back_prefix(&self) -> &'static str {
        self.loc.get(Msg::BackTo)
    }
}

/// Action that sends a fixed message to whoever triggered it.
pub(crate) fn reply(sink: &Arc<dyn ChatSink>, message: OutgoingMessage) -> Action {
    let sink = Arc::clone(sink);
    Action::new(move |target| async move { sink.send(target.chat_id, message).await })
}

/// "OK" plus the keyboard of the menu this node was opened from.
///
/// The parent keyboard is read when the action runs, not when it is built.
pub(crate) fn back(sink: &Arc<dyn ChatSink>, menu: &ApplicationMenu) -> Action {
    let sink = Arc::clone(sink);
    let menu = menu.clone();
    Action::new(move |target| async move {
        let message = OutgoingMessage::text("OK").reply_keyboard(menu.prev_menu());
        sink.send(target.chat_id, message).await
    })
}
