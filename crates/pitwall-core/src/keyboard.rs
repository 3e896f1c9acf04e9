//! Transport-neutral keyboard layouts.

use serde::Serialize;

/// Persistent reply keyboard: rows of button labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Lays `labels` out `per_row` to a row.
    #[must_use]
    pub fn chunked<I, S>(mut self, labels: I, per_row: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        for chunk in labels.chunks(per_row.max(1)) {
            self.rows.push(chunk.to_vec());
        }
        self
    }

    pub fn contains(&self, label: &str) -> bool {
        self.rows.iter().flatten().any(|l| l == label)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InlineButton {
    Callback { text: String, data: String },
    Url { text: String, url: String },
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Callback {
            text: text.into(),
            data: data.into(),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            text: text.into(),
            url: url.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Callback { text, .. } | Self::Url { text, .. } => text,
        }
    }
}

/// Keyboard attached to a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    #[must_use]
    pub fn chunked(mut self, buttons: Vec<InlineButton>, per_row: usize) -> Self {
        for chunk in buttons.chunks(per_row.max(1)) {
            self.rows.push(chunk.to_vec());
        }
        self
    }

    pub fn callback_data(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().filter_map(|button| match button {
            InlineButton::Callback { data, .. } => Some(data.as_str()),
            InlineButton::Url { .. } => None,
        })
    }
}
