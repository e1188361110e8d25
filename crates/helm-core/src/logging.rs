//! Structured logging with `tracing`.
//!
//! All crates log through `tracing` macros with structured fields
//! (`kind`, `id`, `context`, `command`). The binary installs the subscriber
//! once at startup via [`init_subscriber`].

use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber used by the `helm` binary.
///
/// `RUST_LOG` wins over `level` when it parses. Only the first call installs
/// anything.
pub fn init_subscriber(level: &str) {
    let directives = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    // an earlier subscriber stays in place
    let _ = tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_env_filter(directives)
        .with_writer(std::io::stderr)
        .try_init();
}
