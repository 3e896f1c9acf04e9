//! Turns raw updates into routable events.

use std::collections::HashSet;

use pitwall_core::ChatTarget;
use tracing::debug;

use crate::commands::is_command;
use crate::telegram::{CallbackQuery, Message, Update};
use crate::types::{EventKind, IncomingEvent};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Ingested {
    Event(IncomingEvent),
    /// Sender is not on the allowlist; the chat gets a refusal.
    Denied {
        chat_id: i64,
        callback_query_id: Option<String>,
    },
    Ignored,
}

/// An empty allowlist admits everyone.
pub(crate) fn is_allowed(allowlist: &HashSet<i64>, user_id: i64) -> bool {
    allowlist.is_empty() || allowlist.contains(&user_id)
}

pub(crate) fn parse_update(update: Update, allowlist: &HashSet<i64>) -> Ingested {
    if let Some(query) = update.callback_query {
        return parse_callback(query, allowlist);
    }
    if let Some(message) = update.message {
        return parse_message(message, allowlist);
    }
    debug!(update_id = update.update_id, "ignoring update without message or callback");
    Ingested::Ignored
}

fn parse_message(message: Message, allowlist: &HashSet<i64>) -> Ingested {
    let chat_id = message.chat.id;
    let Some(user) = message.from else {
        debug!(chat_id, "ignoring message without sender");
        return Ingested::Ignored;
    };
    if user.is_bot {
        return Ingested::Ignored;
    }
    if !is_allowed(allowlist, user.id) {
        debug!(user_id = user.id, chat_id, "denied user");
        return Ingested::Denied {
            chat_id,
            callback_query_id: None,
        };
    }

    let Some(text) = message.text.filter(|text| !text.trim().is_empty()) else {
        debug!(chat_id, "ignoring message without text");
        return Ingested::Ignored;
    };
    let kind = if is_command(&text) {
        EventKind::Command(text.trim().to_string())
    } else {
        EventKind::Button(text)
    };
    Ingested::Event(IncomingEvent {
        target: ChatTarget::new(chat_id, user.id),
        kind,
    })
}

fn parse_callback(query: CallbackQuery, allowlist: &HashSet<i64>) -> Ingested {
    let Some(message) = query.message else {
        debug!(query_id = %query.id, "ignoring callback without message");
        return Ingested::Ignored;
    };
    let chat_id = message.chat.id;
    if !is_allowed(allowlist, query.from.id) {
        debug!(user_id = query.from.id, chat_id, "denied user");
        return Ingested::Denied {
            chat_id,
            callback_query_id: Some(query.id),
        };
    }
    let Some(payload) = query.data else {
        return Ingested::Ignored;
    };
    Ingested::Event(IncomingEvent {
        target: ChatTarget::new(chat_id, query.from.id).with_message(message.message_id),
        kind: EventKind::Callback {
            query_id: query.id,
            payload,
        },
    })
}
