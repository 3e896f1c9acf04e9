//! Per-user notification preferences.

use std::sync::Arc;

use pitwall_core::chat::OutgoingMessage;
use pitwall_core::keyboard::{InlineButton, InlineKeyboard};
use pitwall_core::menu::ApplicationMenu;
use pitwall_core::{Accepter, Action, CallbackData, ChatSink, ChatTarget};
use tracing::warn;

use super::{AppContext, back};
use crate::i18n::{Localizer, Msg};
use crate::settings_store::{Notifications, SessionKind, SettingsStore};

pub const NOTIFICATIONS: &str = "notifications";

pub struct SettingsApp {
    sink: Arc<dyn ChatSink>,
    loc: Localizer,
    settings: Arc<dyn SettingsStore>,
    /// Shared with the live menu: settings has no keyboard of its own.
    menu: ApplicationMenu,
    title: String,
}

impl SettingsApp {
    pub fn new(ctx: &AppContext, menu: ApplicationMenu) -> Arc<Self> {
        Arc::new(Self {
            sink: Arc::clone(&ctx.sink),
            loc: ctx.loc,
            settings: Arc::clone(&ctx.settings),
            menu,
            title: ctx.text(Msg::ButtonSettings).to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    fn render(&self, edit: bool) -> Action {
        let sink = Arc::clone(&self.sink);
        let settings = Arc::clone(&self.settings);
        let loc = self.loc;
        let menu = self.menu.clone();
        Action::new(move |target: ChatTarget| async move {
            let message = notifications_message(&loc, settings.as_ref(), &menu, target);
            let message = if edit {
                message.editing(target.message_id)
            } else {
                message
            };
            sink.send(target.chat_id, message).await
        })
    }

    fn toggle(&self, owner: String, kind: SessionKind) -> Action {
        let sink = Arc::clone(&self.sink);
        let settings = Arc::clone(&self.settings);
        let loc = self.loc;
        let menu = self.menu.clone();
        Action::new(move |target: ChatTarget| async move {
            if owner != target.user_id.to_string() {
                let notice = OutgoingMessage::text(loc.get(Msg::NotificationsForeignUser));
                return sink.send(target.chat_id, notice).await;
            }
            if let Err(err) = settings.toggle_notification(target.user_id, target.chat_id, kind) {
                warn!(user_id = target.user_id, "notification toggle failed: {err:#}");
                let notice = OutgoingMessage::text(loc.get(Msg::NotificationToggleFailed))
                    .reply_keyboard(menu.prev_menu());
                return sink.send(target.chat_id, notice).await;
            }
            let message = notifications_message(&loc, settings.as_ref(), &menu, target)
                .editing(target.message_id);
            sink.send(target.chat_id, message).await
        })
    }
}

fn notifications_message(
    loc: &Localizer,
    settings: &dyn SettingsStore,
    menu: &ApplicationMenu,
    target: ChatTarget,
) -> OutgoingMessage {
    match settings.list_notifications(target.user_id) {
        Ok(notifications) => OutgoingMessage::text(loc.get(Msg::NotificationsTitle))
            .inline_keyboard(notifications_keyboard(target.user_id, &notifications)),
        Err(err) => {
            warn!(user_id = target.user_id, "reading notifications failed: {err:#}");
            OutgoingMessage::text(loc.get(Msg::NotificationsReadFailed))
                .reply_keyboard(menu.prev_menu())
        }
    }
}

fn notifications_keyboard(user_id: i64, notifications: &Notifications) -> InlineKeyboard {
    let owner = user_id.to_string();
    let buttons = SessionKind::ALL
        .into_iter()
        .map(|kind| {
            InlineButton::callback(
                format!("{} {}", kind.label(), notifications.symbol(kind)),
                CallbackData::encode(NOTIFICATIONS, &owner, &[kind.session_type()]),
            )
        })
        .collect();
    InlineKeyboard::new().chunked(buttons, 2)
}

impl Accepter for SettingsApp {
    fn accept_callback(&self, payload: &str) -> Option<Action> {
        let data = CallbackData::parse(payload).filter(|data| data.kind == NOTIFICATIONS)?;
        let kind = data.arg(0).and_then(SessionKind::from_session_type)?;
        Some(self.toggle(data.owner.to_string(), kind))
    }

    fn accept_button(&self, label: &str) -> Option<Action> {
        if label == self.title {
            return Some(self.render(false));
        }
        if self.menu.is_back(label) {
            return Some(back(&self.sink, &self.menu));
        }
        None
    }
}
