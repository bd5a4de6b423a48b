//! In-memory `MessagingPort` used by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities, TextFormat},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Send {
        chat_id: ChatId,
        text: String,
        reply_to: Option<MessageId>,
    },
    Edit {
        msg: MessageRef,
        text: String,
        format: TextFormat,
    },
    Action(ChatId),
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    calls: Mutex<Vec<Call>>,
    /// Number of upcoming edit calls that fail.
    failing_edits: Mutex<usize>,
    reject_markdown: bool,
    panic_on_edit: bool,
    max_message_len: usize,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(100),
            max_message_len: 4096,
            ..Default::default()
        }
    }

    pub fn rejecting_markdown() -> Self {
        Self {
            reject_markdown: true,
            ..Self::new()
        }
    }

    /// Edits panic, taking down whichever task issued them.
    pub fn panicking_on_edit() -> Self {
        Self {
            panic_on_edit: true,
            ..Self::new()
        }
    }

    pub fn with_max_len(max_message_len: usize) -> Self {
        Self {
            max_message_len,
            ..Self::new()
        }
    }

    pub fn fail_next_edits(&self, n: usize) {
        *self.failing_edits.lock().unwrap() = n;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edit_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn action_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Action(_)))
            .count()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: self.max_message_len,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef> {
        self.calls.lock().unwrap().push(Call::Send {
            chat_id,
            text: text.to_string(),
            reply_to,
        });
        let mut guard = self.next_id.lock().unwrap();
        let id = *guard;
        *guard += 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id),
        })
    }

    async fn edit_text(&self, msg: MessageRef, text: &str, format: TextFormat) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Edit {
            msg,
            text: text.to_string(),
            format,
        });
        if self.panic_on_edit {
            panic!("edit_text called on a panicking messenger");
        }
        {
            let mut failing = self.failing_edits.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(Error::External("telegram error: network down".to_string()));
            }
        }
        if self.reject_markdown && format == TextFormat::Markdown {
            return Err(Error::External(
                "telegram error: Bad Request: can't parse entities".to_string(),
            ));
        }
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, _action: ChatAction) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Action(chat_id));
        Ok(())
    }
}
