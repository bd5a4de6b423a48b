//! Inbound text classification: plain text vs. a leading bot command.

use crate::messaging::types::InboundEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    PlainText {
        body: String,
    },
    Command {
        /// Command token without the `@<bot>` suffix, e.g. `/help`.
        name: String,
        /// The token was addressed to this bot with `@<bot>`.
        mention_present: bool,
        /// Text after the command token, trimmed.
        body: String,
    },
}

impl Intent {
    pub fn body(&self) -> &str {
        match self {
            Intent::PlainText { body } | Intent::Command { body, .. } => body,
        }
    }
}

/// Classify an inbound event against the bot's own handle (without `@`).
///
/// Only a command entity starting at offset 0 counts; command-like tokens later
/// in the text stay inside the body untouched.
pub fn classify(event: &InboundEvent, bot_handle: &str) -> Intent {
    let text = event.text.as_str();

    let command_end = event
        .command
        .filter(|span| span.offset == 0 && span.length > 0)
        .and_then(|span| utf16_prefix_byte_len(text, span.length));

    let Some(end) = command_end else {
        return Intent::PlainText {
            body: text.to_string(),
        };
    };

    let token = &text[..end];
    let (name, mention_present) = match strip_mention(token, bot_handle) {
        Some(name) => (name, true),
        None => (token, false),
    };

    Intent::Command {
        name: name.to_string(),
        mention_present,
        body: text[end..].trim().to_string(),
    }
}

/// Strip a trailing `@<handle>` (Telegram handles are case-insensitive).
fn strip_mention<'a>(token: &'a str, bot_handle: &str) -> Option<&'a str> {
    if bot_handle.is_empty() {
        return None;
    }
    let at = token.rfind('@')?;
    let (name, suffix) = token.split_at(at);
    suffix[1..]
        .eq_ignore_ascii_case(bot_handle)
        .then_some(name)
}

/// Byte length of the prefix of `text` spanning `units` UTF-16 code units.
///
/// `None` if the span ends inside a character or past the end of the text.
fn utf16_prefix_byte_len(text: &str, units: usize) -> Option<usize> {
    let mut seen = 0usize;
    for (idx, ch) in text.char_indices() {
        if seen == units {
            return Some(idx);
        }
        seen += ch.len_utf16();
        if seen > units {
            return None;
        }
    }
    (seen == units).then_some(text.len())
}
