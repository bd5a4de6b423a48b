//! Messenger abstractions (inbound events, outbound port).

pub mod port;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;
