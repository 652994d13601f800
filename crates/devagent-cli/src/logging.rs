//! Diagnostic tracing, separate from the `[devagent]` progress lines.
//!
//! Filter comes from `DEVAGENT_LOG`, then `RUST_LOG`, defaulting to `warn`.
//! Output goes to stderr so stdout stays reserved for the run artifact.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub(crate) fn init() {
    let filter = EnvFilter::try_from_env("DEVAGENT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests calling main twice) is harmless to ignore.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
