use tracing::{debug, info, warn};

use crate::{
    domain::ChatId,
    messaging::types::{ChatAction, InboundEvent},
    security::describe_sender,
    Result,
};

use super::ChatBot;

pub const RESET_NOTICE: &str = "🔄 The chat thread has been reset. New chat thread started.";
pub const RELOAD_NOTICE: &str = "🔄 Session refreshed.";
pub const RELOAD_DENIED_NOTICE: &str =
    "⛔️ Sorry, you do not have the permission to run this command.";
pub const UNSUPPORTED_NOTICE: &str = "⚠️ Unsupported command. Run /help to see the usage.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Help,
    Reset,
    Reload,
    Unsupported(String),
}

impl BotCommand {
    /// Parse a mention-stripped command token such as `/reset`.
    pub fn parse(name: &str) -> Self {
        match name {
            "/help" | "/start" => BotCommand::Help,
            "/reset" => BotCommand::Reset,
            "/reload" => BotCommand::Reload,
            other => BotCommand::Unsupported(other.to_string()),
        }
    }
}

impl ChatBot {
    pub(super) async fn handle_command(
        &self,
        event: &InboundEvent,
        name: &str,
        mention_present: bool,
    ) -> Result<()> {
        let user = describe_sender(event.sender.as_ref(), &event.chat);
        debug!(
            "👨‍💻️ User {user} issued command \"{name}\" in {} (mention_present={mention_present}).",
            event.chat
        );

        // Commands in groups must be addressed to us explicitly.
        if !event.chat.is_private() && !mention_present {
            return Ok(());
        }

        if !self.authorize(event).await? {
            return Ok(());
        }

        let chat_id = event.chat.id;
        match BotCommand::parse(name) {
            BotCommand::Help => {
                self.messenger
                    .send_text(chat_id, &self.help_text(), None)
                    .await?;
            }
            BotCommand::Reset => {
                self.typing(chat_id).await;
                self.conversations.reset(chat_id).await;
                self.messenger.send_text(chat_id, RESET_NOTICE, None).await?;
                info!(chat_id = chat_id.0, "🔄 Chat thread reset by {user}.");
            }
            BotCommand::Reload => {
                if !self.policy.is_owner(event.sender.as_ref().map(|s| s.id)) {
                    self.messenger
                        .send_text(chat_id, RELOAD_DENIED_NOTICE, None)
                        .await?;
                    warn!(
                        chat_id = chat_id.0,
                        "⚠️ Permission denied for \"{name}\" from {user}."
                    );
                    return Ok(());
                }
                self.typing(chat_id).await;
                self.messenger.send_text(chat_id, RELOAD_NOTICE, None).await?;
                info!(chat_id = chat_id.0, "🔄 Session refreshed by {user}.");
            }
            BotCommand::Unsupported(_) => {
                self.messenger
                    .send_text(chat_id, UNSUPPORTED_NOTICE, None)
                    .await?;
            }
        }
        Ok(())
    }

    fn help_text(&self) -> String {
        let chat_cmd = &self.settings.chat_cmd;
        let handle = &self.settings.bot_handle;
        format!(
            "To chat with me, you can:\n\
             \u{20} • send messages directly (not supported in groups)\n\
             \u{20} • send messages that start with {chat_cmd}\n\
             \u{20} • reply to my last message\n\n\
             Command list:\n\
             (When using a command in a group, make sure to include a mention after the command, like /help@{handle}).\n\
             \u{20} • /help Show help information.\n\
             \u{20} • /reset Reset the current chat thread and start a new one.\n\
             \u{20} • /reload (admin required) Refresh the ChatGPT session."
        )
    }

    async fn typing(&self, chat_id: ChatId) {
        if let Err(e) = self
            .messenger
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
        {
            debug!(chat_id = chat_id.0, error = %e, "typing signal failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        handlers::{
            testing::{group_event, private_event, FakeBackend, Script},
            BotSettings,
        },
        messaging::fake::FakeMessenger,
        security::{AccessPolicy, GROUP_DENIED_NOTICE, PRIVATE_DENIED_NOTICE},
        streaming::testing::ManualClock,
    };
    use std::time::Duration;

    fn bot(policy: AccessPolicy) -> (ChatBot, Arc<FakeMessenger>, Arc<FakeBackend>) {
        let clock = Arc::new(ManualClock::new());
        let api = Arc::new(FakeMessenger::new());
        let backend = Arc::new(FakeBackend::new(
            clock.clone(),
            vec![
                Script::reply("first", "conv", "t1"),
                Script::reply("second", "conv2", "t2"),
            ],
        ));
        let settings = BotSettings {
            bot_handle: "gptbot".to_string(),
            chat_cmd: "/chat".to_string(),
            query_timeout: Duration::from_secs(5),
            streaming_throttle: Duration::from_millis(1500),
        };
        let bot = ChatBot::new(settings, policy, api.clone(), backend.clone()).with_clock(clock);
        (bot, api, backend)
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(BotCommand::parse("/help"), BotCommand::Help);
        assert_eq!(BotCommand::parse("/start"), BotCommand::Help);
        assert_eq!(BotCommand::parse("/reset"), BotCommand::Reset);
        assert_eq!(BotCommand::parse("/reload"), BotCommand::Reload);
        assert_eq!(
            BotCommand::parse("/help@otherbot"),
            BotCommand::Unsupported("/help@otherbot".to_string())
        );
    }

    #[tokio::test]
    async fn help_in_private_chat() {
        let (bot, api, _) = bot(AccessPolicy::default());
        bot.handle_event(&private_event(1, "/help")).await.unwrap();

        let sent = api.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("send messages that start with /chat"));
        assert!(sent[0].contains("/help@gptbot"));
    }

    #[tokio::test]
    async fn group_command_without_mention_is_ignored() {
        let (bot, api, _) = bot(AccessPolicy::default());
        bot.handle_event(&group_event(-100, 1, "/help")).await.unwrap();
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn group_command_with_mention_is_answered() {
        let (bot, api, _) = bot(AccessPolicy::default());
        bot.handle_event(&group_event(-100, 1, "/help@gptbot"))
            .await
            .unwrap();
        assert_eq!(api.sent_texts().len(), 1);
    }

    #[tokio::test]
    async fn unauthorized_group_gets_rejection() {
        let (bot, api, _) = bot(AccessPolicy::new(&[], &[-200]));
        bot.handle_event(&group_event(-100, 1, "/help@gptbot"))
            .await
            .unwrap();
        assert_eq!(api.sent_texts(), vec![GROUP_DENIED_NOTICE.to_string()]);
    }

    #[tokio::test]
    async fn unauthorized_private_user_gets_rejection() {
        let (bot, api, _) = bot(AccessPolicy::new(&[1], &[]));
        bot.handle_event(&private_event(2, "/reset")).await.unwrap();
        assert_eq!(api.sent_texts(), vec![PRIVATE_DENIED_NOTICE.to_string()]);
    }

    #[tokio::test]
    async fn unsupported_command_notice() {
        let (bot, api, _) = bot(AccessPolicy::default());
        bot.handle_event(&private_event(1, "/dance")).await.unwrap();
        assert_eq!(api.sent_texts(), vec![UNSUPPORTED_NOTICE.to_string()]);
    }

    #[tokio::test]
    async fn reset_clears_continuation_for_next_turn() {
        let (bot, api, backend) = bot(AccessPolicy::new(&[1], &[]));

        bot.handle_event(&private_event(1, "hello")).await.unwrap();
        assert!(bot.conversations.snapshot(crate::domain::ChatId(1)).await.is_some());

        bot.handle_event(&private_event(1, "/reset")).await.unwrap();
        assert!(api.sent_texts().contains(&RESET_NOTICE.to_string()));

        bot.handle_event(&private_event(1, "again")).await.unwrap();
        let reqs = backend.requests();
        assert_eq!(reqs.len(), 2);
        assert!(reqs[1].continuation.is_none());
    }

    #[tokio::test]
    async fn reload_by_non_owner_is_denied_and_state_kept() {
        // Open access for chatting, but no owners: nobody may reload.
        let (bot, api, _) = bot(AccessPolicy::default());
        bot.handle_event(&private_event(5, "hello")).await.unwrap();
        let before = bot.conversations.snapshot(crate::domain::ChatId(5)).await;
        assert!(before.is_some());

        bot.handle_event(&private_event(5, "/reload")).await.unwrap();

        assert_eq!(
            api.sent_texts().last().cloned(),
            Some(RELOAD_DENIED_NOTICE.to_string())
        );
        assert_eq!(
            bot.conversations.snapshot(crate::domain::ChatId(5)).await,
            before
        );
    }

    #[tokio::test]
    async fn reload_by_owner_confirms() {
        let (bot, api, _) = bot(AccessPolicy::new(&[1], &[]));
        bot.handle_event(&private_event(1, "/reload")).await.unwrap();
        assert_eq!(api.sent_texts(), vec![RELOAD_NOTICE.to_string()]);
        assert_eq!(api.action_count(), 1);
    }
}
