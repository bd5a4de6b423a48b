//! Telegram update handlers.
//!
//! Each text message is translated into a framework-agnostic `InboundEvent`
//! and handed to the core `ChatBot`. Non-text messages are ignored.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{Message, MessageEntityKind},
};
use tracing::{error, trace};

use gptbot_core::{
    domain::{Chat, ChatId, ChatKind, MessageId, Sender, UserId},
    messaging::types::{CommandSpan, InboundEvent, ReplyRef},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = to_inbound_event(&msg, state.bot_user_id) else {
        trace!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let chat_bot = state.chat_bot.clone();
    // One task per update so a long turn never stalls the dispatcher.
    tokio::spawn(async move {
        if let Err(e) = chat_bot.handle_event(&event).await {
            error!(chat_id = event.chat.id.0, error = %e, "handler failed");
        }
    });
    Ok(())
}

/// Build the core event for a text message; `None` for anything else.
pub fn to_inbound_event(
    msg: &Message,
    bot_user_id: teloxide::types::UserId,
) -> Option<InboundEvent> {
    let text = msg.text()?;

    let kind = if msg.chat.is_private() {
        ChatKind::Private
    } else {
        ChatKind::Group
    };

    let command = msg
        .entities()
        .and_then(|ents| {
            ents.iter()
                .find(|e| matches!(e.kind, MessageEntityKind::BotCommand))
        })
        .map(|e| CommandSpan {
            offset: e.offset,
            length: e.length,
        });

    let reply_to = msg.reply_to_message().map(|r| ReplyRef {
        message_id: MessageId(r.id.0),
        to_bot: r.from().is_some_and(|u| u.id == bot_user_id),
    });

    Some(InboundEvent {
        chat: Chat {
            id: ChatId(msg.chat.id.0),
            kind,
            title: msg.chat.title().map(str::to_string),
        },
        sender: msg.from().map(|u| Sender {
            id: UserId(u.id.0 as i64),
            username: u.username.clone(),
        }),
        message_id: MessageId(msg.id.0),
        text: text.to_string(),
        command,
        reply_to,
    })
}
