//! Telegram front end for live racing-session telemetry.
//!
//! Telemetry producers publish into a [`Hub`]; the menu tree in [`apps`]
//! keeps cached views of it and answers user events routed from the
//! Telegram update loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use pitwall_core::{Accepter, ChatSink, Config, Hub};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::apps::{AppContext, MainApp};
use crate::bot::{BotContext, deny, dispatch_event, new_chat_queues};
use crate::fetch::HttpImageFetcher;
use crate::i18n::Localizer;
use crate::ingest::{Ingested, parse_update};
use crate::notification::NotificationManager;
use crate::servers::Server;
use crate::settings_store::TomlSettingsStore;
use crate::telegram::{TelegramClient, TelegramSettings, TelegramSink};

pub mod apps;
mod bot;
mod commands;
pub mod fetch;
pub mod format;
pub mod i18n;
mod ingest;
pub mod notification;
pub mod servers;
pub mod settings_store;
mod telegram;
mod types;

/// Runs the bot with a private hub; nothing publishes telemetry into it.
pub async fn run(config: Config) -> Result<()> {
    run_with_hub(config, Hub::new()).await
}

/// Runs the bot against `hub` until Ctrl-C, then stops every background task.
pub async fn run_with_hub(config: Config, hub: Hub) -> Result<()> {
    let settings = TelegramSettings::from_config(&config)?;
    let client = TelegramClient::new(settings.bot_token);
    let sink: Arc<dyn ChatSink> = Arc::new(TelegramSink::new(client.clone()));
    let store = Arc::new(TomlSettingsStore::open(&config.settings_path())?);
    let loc = Localizer::from_code(&config.language);
    let cancel = CancellationToken::new();

    let ctx = AppContext {
        hub: hub.clone(),
        sink: Arc::clone(&sink),
        loc,
        settings: Arc::clone(&store) as _,
        fetcher: Arc::new(HttpImageFetcher::new()),
        fetch_timeout: config.fetch_timeout(),
        cancel: cancel.clone(),
    };
    let servers: Vec<Server> = config.servers.iter().map(Server::from).collect();
    let root = MainApp::new(&ctx, servers)?;
    let notifier =
        NotificationManager::new(&hub, Arc::clone(&sink), store, loc)?.spawn(cancel.clone());

    if let Err(err) = client
        .set_my_commands(&commands::telegram_command_specs())
        .await
    {
        warn!("registering bot commands failed: {err:#}");
    }

    info!(
        servers = config.servers.len(),
        allowlisted_users = settings.allowlist_user_ids.len(),
        language = ?loc.language(),
        "pitwall bot started, polling for updates"
    );
    let context = Arc::new(BotContext::new(
        client,
        sink,
        Arc::clone(&root) as Arc<dyn Accepter>,
        settings.allowlist_user_ids,
    ));
    run_bot(&context).await;

    cancel.cancel();
    root.shutdown().await;
    if let Err(err) = notifier.await {
        warn!("notification task ended abnormally: {err}");
    }
    info!("pitwall bot stopped");
    Ok(())
}

async fn run_bot(context: &Arc<BotContext>) {
    let chat_queues = new_chat_queues();
    let mut offset: Option<i64> = None;
    let poll_timeout = Duration::from_secs(30);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let current_offset = offset;
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down Telegram bot");
                break;
            }
            updates = context.client().get_updates(current_offset, poll_timeout) => {
                let updates = match updates {
                    Ok(updates) => updates,
                    Err(err) => {
                        warn!("Telegram polling error: {err:#}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = Some(update.update_id + 1);
                    match parse_update(update, context.allowlist_user_ids()) {
                        Ingested::Event(event) => {
                            dispatch_event(&chat_queues, context, event).await;
                        }
                        Ingested::Denied { chat_id, callback_query_id } => {
                            deny(context, chat_id, callback_query_id.as_deref()).await;
                        }
                        Ingested::Ignored => {}
                    }
                }
            }
        }
    }
}
