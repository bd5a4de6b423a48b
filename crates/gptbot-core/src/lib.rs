//! Core domain + application logic for the Telegram ChatGPT relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the completion
//! backend live behind ports (traits) implemented in adapter crates.

pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod security;
pub mod session;
pub mod streaming;

pub use errors::{Error, Result};
