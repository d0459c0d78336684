//! Tracing subscriber setup.
//!
//! One global `fmt` subscriber whose `EnvFilter` sits behind a reload layer, so
//! `logging.level` can be changed at runtime through [`apply_logging_level`].

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Install the subscriber at `info`.
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Install the subscriber filtered at `level`.
///
/// A parseable `RUST_LOG` takes precedence over `level`. Only the first call
/// installs anything; later calls leave the existing subscriber in place.
pub fn init_tracing_with_level(level: &str) {
    let (filter, handle) = reload::Layer::new(initial_filter(level));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER_HANDLE.set(handle);
    }
}

fn initial_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Swap the active filter for `level`.
///
/// Returns `false` when the subscriber was not installed by this module.
pub fn apply_logging_level(level: &str) -> bool {
    FILTER_HANDLE
        .get()
        .is_some_and(|handle| handle.reload(EnvFilter::new(level)).is_ok())
}
