use crate::domain::{Chat, MessageId, Sender};

/// Cross-messenger incoming text event.
///
/// Telegram-specific fields (entities, reply markup) are reduced to what the
/// classifier needs by the Telegram adapter.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub chat: Chat,
    pub sender: Option<Sender>,
    pub message_id: MessageId,
    pub text: String,
    /// Span of the first bot-command entity, as reported by the transport.
    pub command: Option<CommandSpan>,
    pub reply_to: Option<ReplyRef>,
}

/// Entity span in UTF-16 code units (Telegram Bot API convention).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpan {
    pub offset: usize,
    pub length: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplyRef {
    pub message_id: MessageId,
    /// The replied-to message was sent by this bot.
    pub to_bot: bool,
}

/// Outgoing "chat action" (typing indicator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

/// How the transport should render outgoing text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Light markup (Telegram legacy Markdown).
    Markdown,
}

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    /// Longest text a single message may carry, in characters.
    pub max_message_len: usize,
}
