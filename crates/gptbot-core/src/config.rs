use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CHAT_CMD: &str = "/chat";

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub owner_ids: Vec<i64>,
    pub group_ids: Vec<i64>,
    pub chat_cmd: String,

    // Backend
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub openai_model: String,
    pub system_prompt: Option<String>,
    pub max_history_messages: usize,

    // Runtime
    pub debug_level: u8,
    pub query_timeout: Duration,
    pub streaming_throttle: Duration,
}

impl Config {
    /// Load from the process environment, after merging `.env` (existing vars win).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = var("BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;
        let openai_api_key = var("OPENAI_API_KEY").and_then(non_empty).ok_or_else(|| {
            Error::Config("OPENAI_API_KEY environment variable is required".to_string())
        })?;

        let owner_ids = parse_csv_i64(var("OWNER_ID"));
        let group_ids = parse_csv_i64(var("GROUP_ID"));
        let chat_cmd = normalize_command(
            &var("CHAT_CMD")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_CHAT_CMD.to_string()),
        );

        let openai_api_base = var("OPENAI_API_BASE")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string());
        let openai_model = var("OPENAI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let system_prompt = var("OPENAI_SYSTEM_PROMPT").and_then(non_empty);
        let max_history_messages = parse_num(var("MAX_HISTORY_MESSAGES")).unwrap_or(20);

        let debug_level = parse_num::<u8>(var("DEBUG")).unwrap_or(0);
        let query_timeout =
            Duration::from_millis(parse_num(var("QUERY_TIMEOUT_MS")).unwrap_or(10 * 60 * 1000));
        let streaming_throttle =
            Duration::from_millis(parse_num(var("STREAMING_THROTTLE_MS")).unwrap_or(1500));

        Ok(Self {
            telegram_bot_token,
            owner_ids,
            group_ids,
            chat_cmd,
            openai_api_key,
            openai_api_base,
            openai_model,
            system_prompt,
            max_history_messages,
            debug_level,
            query_timeout,
            streaming_throttle,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn normalize_command(cmd: &str) -> String {
    let cmd = cmd.trim();
    if cmd.starts_with('/') {
        cmd.to_string()
    } else {
        format!("/{cmd}")
    }
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
