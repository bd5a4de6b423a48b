use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{ChatAction, MessagingCapabilities, TextFormat},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation; the core never talks to teloxide
/// directly, which keeps the dispatch logic testable with fakes.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Send a new plain-text message, optionally threaded under `reply_to`.
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef>;

    async fn edit_text(&self, msg: MessageRef, text: &str, format: TextFormat) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;
}
