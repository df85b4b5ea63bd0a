//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Maps a configured level name (`INFO`, `Warning`, ...) onto a filter directive.
pub fn filter_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `level` from the configuration is
/// used. Calling this twice is harmless: the second install is ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    if result.is_err() {
        tracing::debug!("[Logging] Subscriber already installed");
    }
}
