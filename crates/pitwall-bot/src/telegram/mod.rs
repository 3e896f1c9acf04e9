use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::future::BoxFuture;
use pitwall_core::chat::{Markup, OutgoingMessage};
use pitwall_core::model::Resource;
use pitwall_core::{ChatSink, Config};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::commands::TelegramCommandSpec;

mod markup;
mod types;

pub use types::{CallbackQuery, Message, Update};

use self::markup::{ReplyMarkup, render_text, reply_markup};

pub struct TelegramSettings {
    pub bot_token: String,
    /// Empty means every user is allowed.
    pub allowlist_user_ids: HashSet<i64>,
}

impl TelegramSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let Some(bot_token) = config.bot_token() else {
            bail!(
                "telegram.bot_token, PITWALL_TELEGRAM_BOT_TOKEN or TELEGRAM_BOT_TOKEN is required"
            );
        };
        Ok(Self {
            bot_token,
            allowlist_user_ids: config.telegram.allowlist_user_ids.iter().copied().collect(),
        })
    }
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            token,
        }
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: Some(vec!["message", "callback_query"]),
        };
        self.post("getUpdates", &request).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            reply_markup,
        };
        let _: Message = self.post("sendMessage", &request).await?;
        Ok(())
    }

    /// Only inline keyboards survive an edit.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<&str>,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let request = EditMessageTextRequest {
            chat_id,
            message_id,
            text,
            parse_mode,
            reply_markup,
        };
        // Telegram answers with the message, or `true` for inline messages.
        let _: Value = self.post("editMessageText", &request).await?;
        Ok(())
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo: &Resource,
        caption: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let part = Part::bytes(photo.data.to_vec())
            .file_name(photo.name.clone())
            .mime_str(&photo.mime_type)
            .with_context(|| format!("Invalid image mime type {}", photo.mime_type))?;
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", part);
        if let Some(markup) = reply_markup {
            let markup = serde_json::to_string(markup).context("Failed to encode reply markup")?;
            form = form.text("reply_markup", markup);
        }

        let response = self
            .http
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .context("Telegram request failed")?;
        let _: Message = decode(response).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let request = AnswerCallbackQueryRequest { callback_query_id };
        let _: bool = self.post("answerCallbackQuery", &request).await?;
        Ok(())
    }

    pub async fn set_my_commands(&self, specs: &[TelegramCommandSpec]) -> Result<()> {
        let request = SetMyCommandsRequest {
            commands: specs
                .iter()
                .map(|spec| BotCommandEntry {
                    command: spec.command,
                    description: spec.description,
                })
                .collect(),
        };
        let _: bool = self.post("setMyCommands", &request).await?;
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, method: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let payload: TelegramResponse<T> = response
        .json()
        .await
        .context("Failed to decode Telegram response")?;

    if !payload.ok {
        let description = payload
            .description
            .unwrap_or_else(|| "Telegram API error".to_string());
        bail!("{}", description);
    }

    payload
        .result
        .context("Telegram response carried no result")
}

/// [`ChatSink`] backed by the Bot API.
pub struct TelegramSink {
    client: TelegramClient,
}

impl TelegramSink {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }

    async fn deliver(&self, chat_id: i64, message: OutgoingMessage) -> Result<()> {
        let markup = reply_markup(&message.markup);
        if let Some(photo) = &message.photo {
            return self
                .client
                .send_photo(chat_id, photo, &message.text, markup.as_ref())
                .await;
        }

        let (text, parse_mode) = render_text(&message.text, message.format);
        match message.edit {
            Some(message_id) if !matches!(message.markup, Markup::Reply(_)) => {
                self.client
                    .edit_message_text(chat_id, message_id, &text, parse_mode, markup.as_ref())
                    .await
            }
            edit => {
                if edit.is_some() {
                    debug!(chat_id, "reply keyboards cannot be edited in place; sending");
                }
                self.client
                    .send_message(chat_id, &text, parse_mode, markup.as_ref())
                    .await
            }
        }
    }
}

impl ChatSink for TelegramSink {
    fn send(&self, chat_id: i64, message: OutgoingMessage) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.deliver(chat_id, message))
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_updates: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
}

#[derive(Debug, Serialize)]
struct EditMessageTextRequest<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackQueryRequest<'a> {
    callback_query_id: &'a str,
}

#[derive(Debug, Serialize)]
struct SetMyCommandsRequest {
    commands: Vec<BotCommandEntry>,
}

#[derive(Debug, Serialize)]
struct BotCommandEntry {
    command: &'static str,
    description: &'static str,
}
