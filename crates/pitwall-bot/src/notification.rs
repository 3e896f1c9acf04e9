//! "New session started" broadcasts to subscribed users.

use std::sync::Arc;

use anyhow::Result;
use pitwall_core::model::ServerStarted;
use pitwall_core::topics::FIRST_DRIVER_ENTERED;
use pitwall_core::{ChatSink, Hub, OutgoingMessage, Subscription};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::i18n::{Localizer, Msg};
use crate::settings_store::{SessionKind, SettingsStore};

pub struct NotificationManager {
    started: Subscription<ServerStarted>,
    sink: Arc<dyn ChatSink>,
    settings: Arc<dyn SettingsStore>,
    loc: Localizer,
}

impl NotificationManager {
    /// Subscribes immediately so no start published after this call is missed.
    pub fn new(
        hub: &Hub,
        sink: Arc<dyn ChatSink>,
        settings: Arc<dyn SettingsStore>,
        loc: Localizer,
    ) -> Result<Self> {
        Ok(Self {
            started: hub.first_driver_entered.subscribe(FIRST_DRIVER_ENTERED)?,
            sink,
            settings,
            loc,
        })
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => break,
                next = self.started.recv() => next,
            };
            let Some(started) = next else {
                break;
            };
            self.notify(&started).await;
        }
        debug!("notification manager stopped");
    }

    /// Returns how many chats were notified.
    async fn notify(&self, started: &ServerStarted) -> usize {
        let Some(kind) = SessionKind::from_session_type(&started.session_type) else {
            debug!(session_type = %started.session_type, "session type is not notifiable");
            return 0;
        };
        let recipients = match self.settings.users_for_session(kind) {
            Ok(recipients) => recipients,
            Err(err) => {
                warn!("listing users for {} failed: {err:#}", kind.label());
                return 0;
            }
        };
        info!(
            server = %started.server_name,
            session_type = kind.session_type(),
            recipients = recipients.len(),
            "notifying session start"
        );

        let text = format!("{}\n{started}", self.loc.get(Msg::NewSessionStarted));
        let mut delivered = 0;
        for recipient in recipients {
            let message = OutgoingMessage::text(text.clone());
            match self.sink.send(recipient.chat_id, message).await {
                Ok(()) => delivered += 1,
                Err(err) => warn!(
                    user_id = recipient.user_id,
                    chat_id = recipient.chat_id,
                    "session start notification failed: {err:#}"
                ),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use pitwall_core::chat::RecordingSink;

    use super::*;
    use crate::settings_store::MemorySettingsStore;

    fn started(session_type: &str) -> ServerStarted {
        ServerStarted {
            server_id: "S1".to_string(),
            server_name: "Sprint".to_string(),
            session_type: session_type.to_string(),
            track_name: "Monza".to_string(),
            started_at: None,
        }
    }

    fn setup() -> (Hub, Arc<RecordingSink>, Arc<MemorySettingsStore>) {
        let settings = Arc::new(MemorySettingsStore::new());
        settings.toggle_notification(1, 100, SessionKind::Race).unwrap();
        settings.toggle_notification(2, 200, SessionKind::Race).unwrap();
        settings.toggle_notification(3, 300, SessionKind::Qual).unwrap();
        (Hub::new(), Arc::new(RecordingSink::new()), settings)
    }

    #[tokio::test]
    async fn race_start_reaches_race_subscribers_only() {
        let (hub, sink, settings) = setup();
        let manager = NotificationManager::new(
            &hub,
            Arc::clone(&sink) as Arc<dyn ChatSink>,
            settings,
            Localizer::default(),
        )
        .unwrap();

        assert_eq!(manager.notify(&started("RACE1")).await, 2);
        let sent = sink.sent();
        let chats: Vec<i64> = sent.iter().map(|(chat, _)| *chat).collect();
        assert_eq!(chats, vec![100, 200]);
        assert_eq!(sent[0].1.text, "New session started:\nSprint - RACE1 (Monza)");
    }

    #[tokio::test]
    async fn later_sessions_are_not_notified() {
        let (hub, sink, settings) = setup();
        let manager = NotificationManager::new(
            &hub,
            Arc::clone(&sink) as Arc<dyn ChatSink>,
            settings,
            Localizer::default(),
        )
        .unwrap();

        assert_eq!(manager.notify(&started("race2")).await, 0);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn runs_until_cancelled() {
        let (hub, sink, settings) = setup();
        let manager = NotificationManager::new(
            &hub,
            Arc::clone(&sink) as Arc<dyn ChatSink>,
            settings,
            Localizer::default(),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let handle = manager.spawn(cancel.clone());

        assert_eq!(hub.publish_first_driver_entered(started("qual1")), 1);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(sink.sent()[0].0, 300);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(hub.first_driver_entered.subscriber_count(FIRST_DRIVER_ENTERED), 0);
    }
}
