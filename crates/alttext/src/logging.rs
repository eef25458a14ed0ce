//! Logging initialization.
//!
//! Logs go to stderr so stdout carries only the generated alt text.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `level` is the default filter directive; the `RUST_LOG` environment
/// variable overrides it when set.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section, with CLI
/// overrides.
pub fn init_from_config(config: &alttext_core::Config, verbose: bool, json_logs: bool) {
    let (level, json_format) = resolve(config, verbose, json_logs);
    init(level, json_format);
}

fn resolve(config: &alttext_core::Config, verbose: bool, json_logs: bool) -> (&str, bool) {
    let level = if verbose && !matches!(config.logging.level.as_str(), "debug" | "trace") {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    (level, json_logs || config.logging.format == "json")
}
