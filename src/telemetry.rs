//! Logging setup and span constructors.

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .try_init();
}

/// Standardized spans for bridge observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering one connection's whole run.
    pub fn connection(agent: &str, addr: &str) -> Span {
        info_span!("connection", agent = %agent, addr = %addr)
    }
}
