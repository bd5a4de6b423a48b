use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{domain::ChatId, model::types::Continuation};

/// One chat's conversational thread.
///
/// Both continuation ids are stored as a single optional value, so a reader
/// sees either the pair from one completed turn or nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationState {
    current: Option<Continuation>,
}

impl ConversationState {
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn advance(&mut self, conversation_id: impl Into<String>, turn_id: impl Into<String>) {
        self.current = Some(Continuation {
            conversation_id: conversation_id.into(),
            turn_id: turn_id.into(),
        });
    }

    pub fn snapshot(&self) -> Option<Continuation> {
        self.current.clone()
    }
}

/// Per-chat conversation states, each behind its own async mutex.
///
/// A turn holds its chat's guard from backend call to commit, so turns in one
/// chat run one at a time while other chats proceed independently.
#[derive(Default)]
pub struct ConversationStore {
    inner: Mutex<HashMap<i64, Arc<Mutex<ConversationState>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, chat_id: ChatId) -> OwnedMutexGuard<ConversationState> {
        let slot = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id.0)
                .or_insert_with(|| Arc::new(Mutex::new(ConversationState::default())))
                .clone()
        };
        slot.lock_owned().await
    }

    pub async fn reset(&self, chat_id: ChatId) {
        self.lock(chat_id).await.reset();
    }

    pub async fn snapshot(&self, chat_id: ChatId) -> Option<Continuation> {
        self.lock(chat_id).await.snapshot()
    }
}
