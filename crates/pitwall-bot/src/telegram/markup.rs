//! Wire shape of keyboards and message bodies.

use pitwall_core::chat::{Markup, TextFormat};
use pitwall_core::keyboard::{InlineButton, InlineKeyboard, ReplyKeyboard};
use serde::Serialize;

pub(crate) const PARSE_MODE_HTML: &str = "HTML";

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
    },
    Inline {
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct KeyboardButton {
    text: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct InlineKeyboardButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl From<&ReplyKeyboard> for ReplyMarkup {
    fn from(keyboard: &ReplyKeyboard) -> Self {
        ReplyMarkup::Keyboard {
            keyboard: keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|label| KeyboardButton { text: label.clone() })
                        .collect()
                })
                .collect(),
            resize_keyboard: true,
        }
    }
}

impl From<&InlineKeyboard> for ReplyMarkup {
    fn from(keyboard: &InlineKeyboard) -> Self {
        ReplyMarkup::Inline {
            inline_keyboard: keyboard
                .rows
                .iter()
                .map(|row| row.iter().map(inline_button).collect())
                .collect(),
        }
    }
}

fn inline_button(button: &InlineButton) -> InlineKeyboardButton {
    match button {
        InlineButton::Callback { text, data } => InlineKeyboardButton {
            text: text.clone(),
            callback_data: Some(data.clone()),
            url: None,
        },
        InlineButton::Url { text, url } => InlineKeyboardButton {
            text: text.clone(),
            callback_data: None,
            url: Some(url.clone()),
        },
    }
}

pub(crate) fn reply_markup(markup: &Markup) -> Option<ReplyMarkup> {
    match markup {
        Markup::None => None,
        Markup::Reply(keyboard) => Some(keyboard.into()),
        Markup::Inline(keyboard) => Some(keyboard.into()),
    }
}

/// Body text and parse mode for a message.
///
/// Tables go out as an HTML `<pre>` block so columns stay aligned.
pub(crate) fn render_text(text: &str, format: TextFormat) -> (String, Option<&'static str>) {
    match format {
        TextFormat::Plain => (text.to_string(), None),
        TextFormat::Preformatted => (
            format!("<pre>{}</pre>", escape_html(text)),
            Some(PARSE_MODE_HTML),
        ),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reply_keyboard_shape() {
        let markup = reply_markup(&Markup::Reply(ReplyKeyboard::new().row(["Live"]))).unwrap();
        assert_eq!(
            serde_json::to_value(markup).unwrap(),
            json!({"keyboard": [[{"text": "Live"}]], "resize_keyboard": true})
        );
    }

    #[test]
    fn inline_keyboard_shape() {
        let keyboard = InlineKeyboard::new().row(vec![
            InlineButton::callback("Gap", "show_live_timing:S1:Gap"),
            InlineButton::url("Map", "https://maps.example/live"),
        ]);
        let markup = reply_markup(&Markup::Inline(keyboard)).unwrap();
        assert_eq!(
            serde_json::to_value(markup).unwrap(),
            json!({"inline_keyboard": [[
                {"text": "Gap", "callback_data": "show_live_timing:S1:Gap"},
                {"text": "Map", "url": "https://maps.example/live"}
            ]]})
        );
    }

    #[test]
    fn no_markup() {
        assert!(reply_markup(&Markup::None).is_none());
    }

    #[test]
    fn preformatted_text_is_escaped_html() {
        let (text, mode) = render_text("A<B & C>D", TextFormat::Preformatted);
        assert_eq!(text, "<pre>A&lt;B &amp; C&gt;D</pre>");
        assert_eq!(mode, Some("HTML"));

        let (text, mode) = render_text("plain <b>", TextFormat::Plain);
        assert_eq!(text, "plain <b>");
        assert_eq!(mode, None);
    }
}
