use tracing_subscriber::{fmt, fmt::time::ChronoLocal, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// `verbosity` is the `DEBUG` config value: 0 logs at info, 1 adds per-message
/// debug lines, 2 and above traces raw updates. `RUST_LOG` overrides it.
pub fn init(service_name: &str, verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name, verbosity)));

    fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::External(format!("logging init failed: {e}")))
}

fn default_directives(service_name: &str, verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // Dependencies stay at warn; only our crates follow DEBUG.
    format!(
        "warn,{service_name}={level},gptbot_core={level},gptbot_openai={level},gptbot_telegram={level}"
    )
}
