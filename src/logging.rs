//! tracing subscriber setup shared by both binaries.

use crate::config::Settings;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise info (debug when `DEBUG` is truthy) for this crate and tower-http.
/// Logs go to stderr so the migrate binary's stdout stays pure SQL.
pub fn init(settings: &Settings) {
    let default = if settings.debug {
        "splitsphere=debug,tower_http=debug"
    } else {
        "splitsphere=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
