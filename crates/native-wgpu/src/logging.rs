//! Logging setup.
//!
//! Everything in this crate logs through `tracing`. Events forwarded from the
//! native library use the [`NATIVE_LOG_TARGET`](crate::callback::NATIVE_LOG_TARGET)
//! target so they can be filtered separately.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,native_wgpu=debug,native_wgpu::native=warn";

/// Install a fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Install a fmt subscriber with an explicit filter directive.
pub fn init_with_filter(filter: &str) {
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
