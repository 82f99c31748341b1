//! Logging bootstrap. Diagnostics go to stderr — stdout belongs to the RPC
//! transport.
//!
//! Library code logs through the `log` macros, so the `log`-to-`tracing`
//! bridge must be installed alongside the subscriber; without it `log`'s
//! global max level stays `Off` and every record is dropped. The bridge is
//! installed explicitly, before the subscriber, so the subscriber install
//! cannot race it with a second registration.

use tracing_subscriber::EnvFilter;

pub fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("webgal-agent: log bridge init failed: {e}");
    }

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("webgal-agent: subscriber init failed: {e}");
    }
}
