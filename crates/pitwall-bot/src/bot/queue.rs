use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::bot::context::BotContext;
use crate::bot::router::handle_event;
use crate::types::IncomingEvent;

/// Queue key: chat id. Events of one chat run in arrival order; different
/// chats run concurrently.
type QueueKey = i64;

pub(crate) type ChatQueueMap = Arc<Mutex<HashMap<QueueKey, mpsc::UnboundedSender<IncomingEvent>>>>;

/// A chat worker with nothing to do for this long leaves the map.
const CHAT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

pub(crate) fn new_chat_queues() -> ChatQueueMap {
    Arc::new(Mutex::new(HashMap::new()))
}

pub(crate) async fn dispatch_event(
    queues: &ChatQueueMap,
    context: &Arc<BotContext>,
    event: IncomingEvent,
) {
    let key = event.target.chat_id;
    let sender = {
        let mut queues_guard = queues.lock().await;
        if let Some(sender) = queues_guard.get(&key) {
            sender.clone()
        } else {
            let (sender, receiver) = mpsc::unbounded_channel();
            spawn_queue_worker(key, receiver, Arc::clone(context), Arc::clone(queues));
            queues_guard.insert(key, sender.clone());
            sender
        }
    };

    // The worker may have just gone idle and closed its queue.
    if let Err(err) = sender.send(event) {
        let event = err.0;
        let (sender, receiver) = mpsc::unbounded_channel();
        spawn_queue_worker(key, receiver, Arc::clone(context), Arc::clone(queues));
        {
            let mut queues_guard = queues.lock().await;
            queues_guard.insert(key, sender.clone());
        }
        if sender.send(event).is_err() {
            warn!(chat_id = key, "chat queue closed, event dropped");
        }
    }
}

fn spawn_queue_worker(
    key: QueueKey,
    mut receiver: mpsc::UnboundedReceiver<IncomingEvent>,
    context: Arc<BotContext>,
    queues: ChatQueueMap,
) {
    tokio::spawn(async move {
        loop {
            match timeout(CHAT_IDLE_TIMEOUT, receiver.recv()).await {
                Ok(Some(event)) => run_event(&context, key, event).await,
                Ok(None) => return,
                Err(_elapsed) => {
                    let mut queues_guard = queues.lock().await;
                    receiver.close();
                    if queues_guard
                        .get(&key)
                        .is_some_and(mpsc::UnboundedSender::is_closed)
                    {
                        queues_guard.remove(&key);
                    }
                    debug!(chat_id = key, "chat queue idle, worker stopped");
                    break;
                }
            }
        }

        // Events accepted before the close still run.
        while let Some(event) = receiver.recv().await {
            run_event(&context, key, event).await;
        }
    });
}

async fn run_event(context: &BotContext, key: QueueKey, event: IncomingEvent) {
    if let Err(err) = handle_event(context, event).await {
        warn!(chat_id = key, "event handling failed: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pitwall_core::{Accepter, ChatTarget};

    use super::*;
    use crate::apps::MainApp;
    use crate::apps::testing::{CHAT, USER, harness, settle};
    use crate::servers::Server;
    use crate::telegram::TelegramClient;
    use crate::types::EventKind;

    fn button(label: &str) -> IncomingEvent {
        IncomingEvent {
            target: ChatTarget::new(CHAT, USER),
            kind: EventKind::Button(label.to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_chat_workers_are_evicted_and_respawned() {
        let h = harness();
        let servers = vec![Server {
            id: "S1".to_string(),
            name: "Sprint".to_string(),
            ..Server::default()
        }];
        let root = MainApp::new(&h.ctx, servers).unwrap();
        let context = Arc::new(BotContext::new(
            TelegramClient::new("test-token".to_string()),
            Arc::clone(&h.ctx.sink),
            Arc::clone(&root) as Arc<dyn Accepter>,
            HashSet::new(),
        ));
        let queues = new_chat_queues();

        dispatch_event(&queues, &context, button("Live")).await;
        settle().await;
        assert_eq!(queues.lock().await.len(), 1);
        assert_eq!(h.sink.sent().len(), 1);

        tokio::time::sleep(CHAT_IDLE_TIMEOUT + Duration::from_secs(1)).await;
        settle().await;
        assert!(queues.lock().await.is_empty());

        dispatch_event(&queues, &context, button("Live")).await;
        settle().await;
        assert_eq!(queues.lock().await.len(), 1);
        assert_eq!(h.sink.sent().len(), 2);
        root.shutdown().await;
    }
}
