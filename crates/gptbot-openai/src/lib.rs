//! OpenAI adapter (streaming chat completions).
//!
//! Uses the `chat/completions` endpoint with `stream: true`. The API itself is
//! stateless, so every turn is kept in an in-memory store and the context of a
//! continued thread is rebuilt by walking the parent chain of its last turn.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use gptbot_core::{
    config::Config,
    errors::Error,
    model::{
        client::CompletionBackend,
        types::{Completion, CompletionRequest},
    },
    Result,
};
use serde::Serialize;
use tracing::{debug, trace};

mod sse;

use sse::{SseDecoder, SseLine};

/// Upper bound on stored messages across all threads; oldest go first.
pub const MAX_STORED_TURNS: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct ChatMessage {
    role: Role,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// One stored message of a thread, linked to the message it answers.
#[derive(Clone, Debug)]
struct StoredTurn {
    role: Role,
    text: String,
    parent_id: Option<String>,
}

/// Insertion-ordered turn map with a fixed capacity.
#[derive(Debug)]
struct TurnStore {
    turns: HashMap<String, StoredTurn>,
    order: VecDeque<String>,
    capacity: usize,
}

impl TurnStore {
    fn new(capacity: usize) -> Self {
        Self {
            turns: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, id: &str) -> Option<&StoredTurn> {
        self.turns.get(id)
    }

    fn insert(&mut self, id: String, turn: StoredTurn) {
        if self.turns.insert(id.clone(), turn).is_some() {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.turns.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.turns.len()
    }
}

/// Accumulated answer of one streamed completion.
#[derive(Debug, Default)]
struct StreamState {
    decoder: SseDecoder,
    text: String,
    completion_id: Option<String>,
}

impl StreamState {
    /// Feed one network chunk; returns `true` once `[DONE]` is seen.
    fn feed(
        &mut self,
        chunk: &[u8],
        on_partial: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> bool {
        for data in self.decoder.push(chunk) {
            match sse::parse_data(&data) {
                SseLine::Done => return true,
                SseLine::Skip => trace!(%data, "skipping sse payload"),
                SseLine::Chunk { id, delta } => {
                    if self.completion_id.is_none() {
                        self.completion_id = id;
                    }
                    if let Some(delta) = delta {
                        self.text.push_str(&delta);
                        on_partial(&self.text);
                    }
                }
            }
        }
        false
    }
}

#[derive(Clone, Debug)]
pub struct ChatGptSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    /// `None` uses the built-in persona.
    pub system_prompt: Option<String>,
    pub max_history_messages: usize,
}

impl ChatGptSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            api_key: cfg.openai_api_key.clone(),
            api_base: cfg.openai_api_base.clone(),
            model: cfg.openai_model.clone(),
            system_prompt: cfg.system_prompt.clone(),
            max_history_messages: cfg.max_history_messages,
        }
    }
}

pub struct ChatGptClient {
    settings: ChatGptSettings,
    http: reqwest::Client,
    turns: Mutex<TurnStore>,
}

impl ChatGptClient {
    pub fn new(settings: ChatGptSettings) -> Result<Self> {
        Self::with_store_capacity(settings, MAX_STORED_TURNS)
    }

    pub fn with_store_capacity(settings: ChatGptSettings, capacity: usize) -> Result<Self> {
        // No overall timeout: the caller bounds the whole streamed call.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::External(format!("openai client build error: {e}")))?;
        Ok(Self {
            settings,
            http,
            turns: Mutex::new(TurnStore::new(capacity)),
        })
    }

    fn system_prompt(&self) -> String {
        match &self.settings.system_prompt {
            Some(p) => p.clone(),
            None => default_system_prompt(&chrono::Local::now().format("%Y-%m-%d").to_string()),
        }
    }

    /// Prior messages of a thread, oldest first, ending at `last_turn_id`.
    fn history(&self, last_turn_id: Option<&str>) -> Vec<ChatMessage> {
        let turns = match self.turns.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut out = Vec::new();
        let mut cursor = last_turn_id.map(str::to_string);
        while let Some(id) = cursor {
            if out.len() >= self.settings.max_history_messages {
                break;
            }
            let Some(turn) = turns.get(&id) else {
                debug!(turn_id = %id, "unknown turn id, history truncated");
                break;
            };
            out.push(ChatMessage {
                role: turn.role,
                content: turn.text.clone(),
            });
            cursor = turn.parent_id.clone();
        }
        out.reverse();
        out
    }

    fn remember(&self, id: String, turn: StoredTurn) {
        let mut turns = match self.turns.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };
        turns.insert(id, turn);
        trace!(stored = turns.len(), "turn stored");
    }

    fn build_messages(&self, req: &CompletionRequest) -> Vec<ChatMessage> {
        let last_turn = req.continuation.as_ref().map(|c| c.turn_id.as_str());
        let mut messages = vec![ChatMessage {
            role: Role::System,
            content: self.system_prompt(),
        }];
        messages.extend(self.history(last_turn));
        messages.push(ChatMessage {
            role: Role::User,
            content: req.prompt.clone(),
        });
        messages
    }
}

#[async_trait]
impl CompletionBackend for ChatGptClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        req: CompletionRequest,
        on_partial: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<Completion> {
        let messages = self.build_messages(&req);
        let body = ChatCompletionBody {
            model: &self.settings.model,
            messages: &messages,
            stream: true,
        };
        debug!(
            model = %self.settings.model,
            messages = messages.len(),
            "openai chat completion request"
        );

        let mut resp = self
            .http
            .post(format!("{}/chat/completions", self.settings.api_base))
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::External(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "openai chat completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let mut stream = StreamState::default();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| Error::External(format!("openai stream error: {e}")))?
        {
            if stream.feed(&chunk, on_partial) {
                break;
            }
        }

        let text = stream.text.trim().to_string();
        let completion_id = stream.completion_id;
        let conversation_id = req
            .continuation
            .as_ref()
            .map(|c| c.conversation_id.clone())
            .unwrap_or_else(new_id);
        let user_turn_id = new_id();
        let turn_id = completion_id.unwrap_or_else(new_id);

        self.remember(
            user_turn_id.clone(),
            StoredTurn {
                role: Role::User,
                text: req.prompt,
                parent_id: req.continuation.map(|c| c.turn_id),
            },
        );
        self.remember(
            turn_id.clone(),
            StoredTurn {
                role: Role::Assistant,
                text: text.clone(),
                parent_id: Some(user_turn_id),
            },
        );

        Ok(Completion {
            text,
            conversation_id,
            turn_id,
        })
    }
}

fn default_system_prompt(current_date: &str) -> String {
    format!(
        "You are ChatGPT, a large language model trained by OpenAI. \
         Answer as concisely as possible.\nCurrent date: {current_date}"
    )
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
