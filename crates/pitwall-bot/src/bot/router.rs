//! Hands events to the root of the menu tree and runs what it returns.

use anyhow::Result;
use pitwall_core::{Accepter, Action, OutgoingMessage};
use tracing::{debug, warn};

use crate::bot::context::BotContext;
use crate::types::{EventKind, IncomingEvent};

const ACCESS_DENIED: &str = "Access denied.";

/// Asks the tree who owns `kind`; `None` when nobody does.
pub(crate) fn route(root: &dyn Accepter, kind: &EventKind) -> Option<Action> {
    match kind {
        EventKind::Command(command) => root.accept_command(command),
        EventKind::Button(label) => root.accept_button(label),
        EventKind::Callback { payload, .. } => root.accept_callback(payload),
    }
}

pub(crate) async fn handle_event(context: &BotContext, event: IncomingEvent) -> Result<()> {
    if let EventKind::Callback { query_id, .. } = &event.kind
        && let Err(err) = context.client().answer_callback_query(query_id).await
    {
        warn!("callback acknowledgement failed: {err:#}");
    }

    let Some(action) = route(context.root(), &event.kind) else {
        debug!(chat_id = event.target.chat_id, event = ?event.kind, "no owner for event");
        return Ok(());
    };
    action.run(event.target).await
}

pub(crate) async fn deny(context: &BotContext, chat_id: i64, callback_query_id: Option<&str>) {
    if let Some(query_id) = callback_query_id
        && let Err(err) = context.client().answer_callback_query(query_id).await
    {
        warn!("callback acknowledgement failed: {err:#}");
    }
    if let Err(err) = context
        .sink()
        .send(chat_id, OutgoingMessage::text(ACCESS_DENIED))
        .await
    {
        warn!(chat_id, "access denied reply failed: {err:#}");
    }
}
