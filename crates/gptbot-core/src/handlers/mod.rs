//! Inbound event dispatch.
//!
//! Every text event is classified, then routed:
//! - the configured chat command and plain text go to the chat turn
//! - any other command goes to the command dispatcher
//!
//! Handlers return transport errors to the adapter for logging; a failed turn
//! never touches another chat's state.

use std::{sync::Arc, time::Duration};

use tracing::{trace, warn};

use crate::{
    classify::{classify, Intent},
    config::Config,
    messaging::{port::MessagingPort, types::InboundEvent},
    model::client::CompletionBackend,
    security::{AccessDecision, AccessPolicy},
    session::ConversationStore,
    streaming::{Clock, SystemClock},
    Result,
};

mod chat;
mod commands;

pub use commands::BotCommand;

/// Runtime settings the handlers need, resolved at startup.
#[derive(Clone, Debug)]
pub struct BotSettings {
    /// This bot's handle, without `@`.
    pub bot_handle: String,
    pub chat_cmd: String,
    pub query_timeout: Duration,
    pub streaming_throttle: Duration,
}

impl BotSettings {
    pub fn from_config(cfg: &Config, bot_handle: impl Into<String>) -> Self {
        Self {
            bot_handle: bot_handle.into(),
            chat_cmd: cfg.chat_cmd.clone(),
            query_timeout: cfg.query_timeout,
            streaming_throttle: cfg.streaming_throttle,
        }
    }
}

/// Message dispatch and per-chat session engine.
pub struct ChatBot {
    settings: BotSettings,
    policy: AccessPolicy,
    conversations: ConversationStore,
    messenger: Arc<dyn MessagingPort>,
    backend: Arc<dyn CompletionBackend>,
    clock: Arc<dyn Clock>,
}

impl ChatBot {
    pub fn new(
        settings: BotSettings,
        policy: AccessPolicy,
        messenger: Arc<dyn MessagingPort>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            settings,
            policy,
            conversations: ConversationStore::new(),
            messenger,
            backend,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn handle_event(&self, event: &InboundEvent) -> Result<()> {
        trace!(?event, "inbound event");

        match classify(event, &self.settings.bot_handle) {
            Intent::Command { name, body, .. } if name == self.settings.chat_cmd => {
                self.handle_chat(event, &body, true).await
            }
            Intent::Command {
                name,
                mention_present,
                ..
            } => self.handle_command(event, &name, mention_present).await,
            Intent::PlainText { body } => self.handle_chat(event, &body, false).await,
        }
    }

    /// Apply the access policy; on denial send the rejection notice and log.
    async fn authorize(&self, event: &InboundEvent) -> Result<bool> {
        match self.policy.check(&event.chat, event.sender.as_ref()) {
            AccessDecision::Allowed => Ok(true),
            AccessDecision::Denied { notice, subject } => {
                warn!(chat_id = event.chat.id.0, "⚠️ Authentication failed for {subject}.");
                self.messenger
                    .send_text(event.chat.id, notice, None)
                    .await?;
                Ok(false)
            }
        }
    }
}
