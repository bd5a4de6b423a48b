//! Backend completion port and its request/response types.

pub mod client;
pub mod types;
