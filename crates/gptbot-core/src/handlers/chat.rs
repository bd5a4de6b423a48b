use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::{
    errors::Error,
    messaging::types::InboundEvent,
    model::types::{Completion, CompletionRequest},
    security::describe_sender,
    streaming::ReplyStream,
    Result,
};

use super::ChatBot;

pub const BACKEND_FAILURE_NOTICE: &str =
    "⚠️ Sorry, I'm having trouble connecting to the server, please try again later.";

impl ChatBot {
    /// Run one chat turn: placeholder, streamed partials, final answer, commit.
    ///
    /// `explicit` is true when the text came in through the chat command.
    pub(super) async fn handle_chat(
        &self,
        event: &InboundEvent,
        body: &str,
        explicit: bool,
    ) -> Result<()> {
        let chat_id = event.chat.id;

        // In groups the bot only answers the chat command or replies to itself.
        let replies_to_bot = event.reply_to.as_ref().is_some_and(|r| r.to_bot);
        if !event.chat.is_private() && !explicit && !replies_to_bot {
            return Ok(());
        }

        if !self.authorize(event).await? {
            return Ok(());
        }

        let prompt = body.trim();
        if prompt.is_empty() {
            return Ok(());
        }

        let user = describe_sender(event.sender.as_ref(), &event.chat);
        debug!(chat_id = chat_id.0, "👨‍💻️ User {user} sent: {prompt}");

        let stream = ReplyStream::start(
            self.messenger.clone(),
            self.clock.clone(),
            chat_id,
            event.message_id,
            self.settings.streaming_throttle,
        )
        .await?;

        // Held until the turn commits or fails.
        let mut conversation = self.conversations.lock(chat_id).await;
        let req = CompletionRequest {
            prompt: prompt.to_string(),
            continuation: conversation.snapshot(),
        };

        let (tx, rx) = mpsc::unbounded_channel::<(Instant, String)>();
        let pump = tokio::spawn(stream.pump(rx));

        let result: Result<Completion> = {
            let clock = self.clock.clone();
            let mut on_partial = move |text: &str| {
                let _ = tx.send((clock.now(), text.to_string()));
            };
            match tokio::time::timeout(
                self.settings.query_timeout,
                self.backend.complete(req, &mut on_partial),
            )
            .await
            {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout(self.settings.query_timeout)),
            }
        };

        // A lost reply stream fails the turn like a backend error would.
        let outcome = match pump.await {
            Ok(stream) => result.map(|completion| (stream, completion)),
            Err(e) => Err(Error::External(format!("reply stream task failed: {e}"))),
        };

        match outcome {
            Ok((mut stream, completion)) => {
                stream.finish(&completion.text).await;
                conversation.advance(completion.conversation_id, completion.turn_id);
                info!(
                    chat_id = chat_id.0,
                    backend = self.backend.name(),
                    "🤖 Replied to {user} ({} chars).",
                    completion.text.chars().count()
                );
                debug!(chat_id = chat_id.0, "🤖 Reply: {}", completion.text);
                Ok(())
            }
            Err(e) => {
                error!(
                    chat_id = chat_id.0,
                    backend = self.backend.name(),
                    error = %e,
                    "⛔️ Completion failed for {user}."
                );
                drop(conversation);
                self.messenger
                    .send_text(chat_id, BACKEND_FAILURE_NOTICE, None)
                    .await?;
                Ok(())
            }
        }
    }
}
