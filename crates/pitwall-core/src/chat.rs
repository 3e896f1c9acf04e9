//! The outbound contract with the chat transport.
//!
//! The routing tree only builds [`OutgoingMessage`] values; a [`ChatSink`]
//! turns them into whatever the messaging platform expects.

use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use futures_util::future::BoxFuture;

use crate::keyboard::{InlineKeyboard, ReplyKeyboard};
use crate::model::Resource;

/// Who an action answers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatTarget {
    pub chat_id: i64,
    pub user_id: i64,
    /// Message that carried a callback; used for in-place edits.
    pub message_id: Option<i64>,
}

impl ChatTarget {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self {
            chat_id,
            user_id,
            message_id: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Markup {
    #[default]
    None,
    Reply(ReplyKeyboard),
    Inline(InlineKeyboard),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextFormat {
    #[default]
    Plain,
    /// Monospaced block, for tables.
    Preformatted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub format: TextFormat,
    pub markup: Markup,
    /// Replace this message instead of sending a new one.
    pub edit: Option<i64>,
    /// Send as a photo with `text` as caption.
    pub photo: Option<Resource>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn photo(photo: Resource, caption: impl Into<String>) -> Self {
        Self {
            text: caption.into(),
            photo: Some(photo),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn reply_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.markup = Markup::Reply(keyboard);
        self
    }

    #[must_use]
    pub fn inline_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.markup = Markup::Inline(keyboard);
        self
    }

    #[must_use]
    pub fn preformatted(mut self) -> Self {
        self.format = TextFormat::Preformatted;
        self
    }

    #[must_use]
    pub fn editing(mut self, message_id: Option<i64>) -> Self {
        self.edit = message_id;
        self
    }
}

pub trait ChatSink: Send + Sync {
    fn send(&self, chat_id: i64, message: OutgoingMessage) -> BoxFuture<'_, Result<()>>;
}

/// Sink that keeps every message in memory.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(i64, OutgoingMessage)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(i64, OutgoingMessage)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|(_, message)| message.clone())
    }
}

impl ChatSink for RecordingSink {
    fn send(&self, chat_id: i64, message: OutgoingMessage) -> BoxFuture<'_, Result<()>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((chat_id, message));
        Box::pin(async { Ok(()) })
    }
}
