//! tracing bootstrap shared by the binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };
    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
    let _ = registry.try_init();
}
