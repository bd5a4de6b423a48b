use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::info;

use gptbot_core::{
    config::Config,
    handlers::{BotSettings, ChatBot},
    messaging::port::MessagingPort,
    model::client::CompletionBackend,
    security::AccessPolicy,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub chat_bot: Arc<ChatBot>,
    /// Used to recognise replies to the bot's own messages.
    pub bot_user_id: UserId,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    backend: Arc<dyn CompletionBackend>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    let handle = me.username().to_string();
    info!("🤖 Bot @{handle} has started...");
    info!(
        backend = backend.name(),
        owners = cfg.owner_ids.len(),
        groups = cfg.group_ids.len(),
        chat_cmd = %cfg.chat_cmd,
        "relay configured"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let chat_bot = ChatBot::new(
        BotSettings::from_config(&cfg, handle),
        AccessPolicy::new(&cfg.owner_ids, &cfg.group_ids),
        messenger,
        backend,
    );

    let state = Arc::new(AppState {
        chat_bot: Arc::new(chat_bot),
        bot_user_id: me.user.id,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
