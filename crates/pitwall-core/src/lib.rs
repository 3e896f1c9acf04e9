//! Event distribution and command routing for the pitwall bot.
//!
//! Telemetry producers publish typed values into a [`broker::Broker`] under
//! opaque string topics. Each app component keeps a [`cached::Cached`]
//! snapshot that background updater tasks refresh from their
//! subscriptions. User events (commands, button labels, callback payloads)
//! are routed through a tree of [`accepter::Accepter`] nodes until one of
//! them claims the event.

pub mod accepter;
pub mod broker;
pub mod cached;
pub mod chat;
pub mod config;
pub mod keyboard;
pub mod logging;
pub mod menu;
pub mod model;
pub mod topics;

pub use accepter::{Accepter, Action, CallbackData, Children};
pub use broker::{Broker, Subscription};
pub use cached::{Cached, UpdaterSet};
pub use chat::{ChatSink, ChatTarget, OutgoingMessage};
pub use config::Config;
pub use menu::{ApplicationMenu, Menu};
pub use topics::Hub;
