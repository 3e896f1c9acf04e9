//! Back-navigation between menu nodes.
//!
//! A child keeps a weak reference to the menu it was opened from. The
//! reference is only used to render the previous keyboard, never to walk
//! into children.

use std::sync::Weak;

use crate::cached::Cached;
use crate::keyboard::ReplyKeyboard;

pub trait Menu: Send + Sync {
    /// Keyboard this node currently shows.
    fn menu(&self) -> ReplyKeyboard;
}

/// Fixed keyboard, used by the root menu.
pub struct StaticMenu(pub ReplyKeyboard);

impl Menu for StaticMenu {
    fn menu(&self) -> ReplyKeyboard {
        self.0.clone()
    }
}

/// Nodes whose keyboard is the derived view of their cached state.
impl<S: Send> Menu for Cached<S, ReplyKeyboard> {
    fn menu(&self) -> ReplyKeyboard {
        self.view()
    }
}

#[derive(Clone)]
pub struct ApplicationMenu {
    name: String,
    from: String,
    back_label: String,
    parent: Weak<dyn Menu>,
}

impl ApplicationMenu {
    /// `back_prefix` is the localized "Back to" text; the back button reads
    /// `"{back_prefix} {from}"`.
    pub fn new(
        name: impl Into<String>,
        from: impl Into<String>,
        parent: Weak<dyn Menu>,
        back_prefix: &str,
    ) -> Self {
        let from = from.into();
        Self {
            name: name.into(),
            back_label: format!("{back_prefix} {from}"),
            from,
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn back_label(&self) -> &str {
        &self.back_label
    }

    pub fn is_back(&self, label: &str) -> bool {
        label == self.back_label
    }

    /// Keyboard of the parent menu; empty once the parent is gone.
    pub fn prev_menu(&self) -> ReplyKeyboard {
        self.parent
            .upgrade()
            .map(|parent| parent.menu())
            .unwrap_or_default()
    }
}
