use std::sync::Arc;

use gptbot_core::config::Config;
use gptbot_openai::{ChatGptClient, ChatGptSettings};

#[tokio::main]
async fn main() -> Result<(), gptbot_core::Error> {
    let cfg = Arc::new(Config::load()?);
    gptbot_core::logging::init("gptbot", cfg.debug_level)?;

    let backend = Arc::new(ChatGptClient::new(ChatGptSettings::from_config(&cfg))?);
    tracing::info!(model = %cfg.openai_model, "🔮 ChatGPT API has started...");

    gptbot_telegram::router::run_polling(cfg, backend)
        .await
        .map_err(|e| gptbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
