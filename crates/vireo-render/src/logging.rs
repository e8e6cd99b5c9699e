//! Tracing subscriber setup for binaries and examples.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to debug-level output with the graphics
/// stack quieted down.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug,wgpu_core=warn,wgpu_hal=warn,naga=warn")),
        )
        .init();
}
