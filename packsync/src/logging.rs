//! Diagnostic tracing for packsync.
//!
//! packsync writes two kinds of output. What a user reads after a sync (the
//! collection plan, one line per installed or failed mod, the summary block)
//! is printed to stdout by `main` and never depends on `RUST_LOG`. Events from
//! the resolver, the packwiz subprocess runner and the executor go through
//! `tracing` to stderr, so piping stdout to a file keeps only the report.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber for the binary.
///
/// Only warnings show by default: packwiz timeouts, lookups that failed,
/// a failed refresh. `RUST_LOG=packsync=debug` adds one event per lookup and
/// per packwiz call, e.g. `RUST_LOG=packsync=debug packsync plan`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
