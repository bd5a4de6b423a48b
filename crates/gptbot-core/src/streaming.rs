//! Streaming reply: one placeholder message edited as the backend streams.
//!
//! - placeholder sent immediately as a threaded reply
//! - partial edits bounded by a minimum interval (superseded text is dropped)
//! - identical edits skipped
//! - final edit always issued, markdown first with a plain-text fallback

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{ChatAction, TextFormat},
    },
    Result,
};

pub const PLACEHOLDER_TEXT: &str = "🤔";
pub const EMPTY_RESPONSE_TEXT: &str = "(empty response)";

/// Time source for the throttle.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Minimum-interval gate for partial edits.
#[derive(Clone, Debug)]
pub struct EditThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl EditThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    pub fn should_emit(&self, now: Instant) -> bool {
        match self.last_emit {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.last_emit = Some(now);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EditOutcome {
    Skipped,
    Applied,
    Failed,
}

/// The placeholder message of one turn and what it currently displays.
pub struct ReplyStream {
    messenger: Arc<dyn MessagingPort>,
    clock: Arc<dyn Clock>,
    message: MessageRef,
    displayed: String,
    throttle: EditThrottle,
    max_len: usize,
}

impl ReplyStream {
    /// Send the placeholder (threaded under `reply_to`) and start the throttle clock.
    pub async fn start(
        messenger: Arc<dyn MessagingPort>,
        clock: Arc<dyn Clock>,
        chat_id: ChatId,
        reply_to: MessageId,
        interval: Duration,
    ) -> Result<Self> {
        let message = messenger
            .send_text(chat_id, PLACEHOLDER_TEXT, Some(reply_to))
            .await?;

        let mut throttle = EditThrottle::new(interval);
        throttle.record(clock.now());

        let max_len = messenger.capabilities().max_message_len.max(16);
        let stream = Self {
            messenger,
            clock,
            message,
            displayed: PLACEHOLDER_TEXT.to_string(),
            throttle,
            max_len,
        };
        stream.typing().await;
        Ok(stream)
    }

    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    /// Offer a partial answer; dropped unless the throttle interval has elapsed.
    pub async fn on_partial(&mut self, text: &str) {
        let now = self.clock.now();
        self.on_partial_at(text, now).await
    }

    /// Like [`Self::on_partial`], for a partial that arrived at `now`.
    pub async fn on_partial_at(&mut self, text: &str, now: Instant) {
        if !self.throttle.should_emit(now) {
            return;
        }
        self.throttle.record(now);

        let display = truncate_with_ellipsis(text, self.max_len);
        if self.apply_edit(&display, TextFormat::Plain).await != EditOutcome::Skipped {
            self.typing().await;
        }
    }

    /// Consume timestamped partial answers until the sender side is dropped.
    pub async fn pump(mut self, mut rx: UnboundedReceiver<(Instant, String)>) -> Self {
        while let Some((at, text)) = rx.recv().await {
            self.on_partial_at(&text, at).await;
        }
        self
    }

    /// Show the complete answer. Always attempted, regardless of the throttle.
    ///
    /// Text beyond the message limit continues in new messages.
    pub async fn finish(&mut self, text: &str) {
        let text = if text.trim().is_empty() {
            EMPTY_RESPONSE_TEXT
        } else {
            text
        };

        let chunks = split_text(text, self.max_len);
        let Some((first, rest)) = chunks.split_first() else {
            return;
        };

        let mut outcome = self.apply_edit(first, TextFormat::Markdown).await;
        if outcome == EditOutcome::Failed {
            debug!(
                chat_id = self.message.chat_id.0,
                "markdown edit rejected, retrying as plain text"
            );
            outcome = self.apply_edit(first, TextFormat::Plain).await;
        }
        if outcome == EditOutcome::Applied {
            self.typing().await;
        }

        for chunk in rest {
            if let Err(e) = self
                .messenger
                .send_text(self.message.chat_id, chunk, None)
                .await
            {
                warn!(
                    chat_id = self.message.chat_id.0,
                    error = %e,
                    "failed to send continuation message"
                );
            }
        }
    }

    async fn apply_edit(&mut self, text: &str, format: TextFormat) -> EditOutcome {
        // Telegram rejects edits that leave the text unchanged, whatever the parse mode.
        if self.displayed == text {
            return EditOutcome::Skipped;
        }

        match self.messenger.edit_text(self.message, text, format).await {
            Ok(()) => {}
            Err(e) if e.is_not_modified() => {}
            Err(e) => {
                warn!(
                    chat_id = self.message.chat_id.0,
                    message_id = self.message.message_id.0,
                    error = %e,
                    "edit message failed"
                );
                return EditOutcome::Failed;
            }
        }

        self.displayed = text.to_string();
        EditOutcome::Applied
    }

    async fn typing(&self) {
        if let Err(e) = self
            .messenger
            .send_chat_action(self.message.chat_id, ChatAction::Typing)
            .await
        {
            debug!(chat_id = self.message.chat_id.0, error = %e, "typing signal failed");
        }
    }
}

fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", s.chars().take(keep).collect::<String>())
}

fn split_text(s: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut count = 0usize;

    for ch in s.chars() {
        if count >= max_chars {
            out.push(std::mem::take(&mut cur));
            count = 0;
        }
        cur.push(ch);
        count += 1;
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        pub fn set(&self, at: Duration) {
            *self.offset.lock().unwrap() = at;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }
}
