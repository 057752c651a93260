//! Tracing/logging initialization
//!
//! Logs go to stderr so that stdout carries only the settlements. Verbosity is
//! read from `RUST_LOG` and defaults to `warn`, which shows rejected operations
//! and flagged payments and nothing else.

use crate::cli::LogFormat;
use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init(LogFormat::Text);
        init(LogFormat::Json);
        tracing::warn!("still logging");
    }
}
