//! Tracing/logging initialization
//!
//! Diagnostics go to stderr so stdout carries only the account CSV.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process
///
/// The level comes from `RUST_LOG` and defaults to `warn`. Safe to call more
/// than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
        tracing::warn!("logged after init");
    }
}
