use std::collections::HashSet;
use std::sync::Arc;

use pitwall_core::{Accepter, ChatSink};

use crate::telegram::TelegramClient;

pub(crate) struct BotContext {
    client: TelegramClient,
    sink: Arc<dyn ChatSink>,
    root: Arc<dyn Accepter>,
    allowlist_user_ids: HashSet<i64>,
}

impl BotContext {
    pub(crate) fn new(
        client: TelegramClient,
        sink: Arc<dyn ChatSink>,
        root: Arc<dyn Accepter>,
        allowlist_user_ids: HashSet<i64>,
    ) -> Self {
        Self {
            client,
            sink,
            root,
            allowlist_user_ids,
        }
    }

    pub(crate) fn client(&self) -> &TelegramClient {
        &self.client
    }

    pub(crate) fn sink(&self) -> &Arc<dyn ChatSink> {
        &self.sink
    }

    pub(crate) fn root(&self) -> &dyn Accepter {
        self.root.as_ref()
    }

    pub(crate) fn allowlist_user_ids(&self) -> &HashSet<i64> {
        &self.allowlist_user_ids
    }
}
