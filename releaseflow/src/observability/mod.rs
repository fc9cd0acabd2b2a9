//! Tracing setup for pipeline runs.
//!
//! Runs log through the `tracing` ecosystem. Library code only emits
//! events and spans; installing a subscriber is left to the embedding
//! binary, with `init_tracing` as the conventional setup.

use tracing_subscriber::EnvFilter;

/// Installs a global tracing subscriber filtered by `RELEASEFLOW_LOG`
/// (falling back to `info`).
///
/// Returns quietly if a subscriber is already installed, so tests can call
/// it repeatedly.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("RELEASEFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Like [`init_tracing`], but emits one JSON object per line. Suited to
/// log collectors.
pub fn init_json_tracing() {
    let filter = EnvFilter::try_from_env("RELEASEFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_reentrant() {
        init_tracing();
        init_tracing();
    }
}
