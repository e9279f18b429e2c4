//! Diagnostic logging.
//!
//! The subscriber is only initialised when `MATHSPAN_LOG` (or `RUST_LOG`) is set, so normal
//! runs pay nothing for it. Output goes to stderr and never mixes with converted documents.
//!
//! ```bash
//! MATHSPAN_LOG=mathspan=trace mathspan notes.md --list-spans
//! ```

use tracing_subscriber::EnvFilter;

/// Build an `EnvFilter` from `MATHSPAN_LOG`, falling back to `RUST_LOG`.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("MATHSPAN_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

pub fn init_tracing() {
    let has_own_log = std::env::var("MATHSPAN_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_own_log && !has_rust_log {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(build_filter())
        .with_writer(std::io::stderr)
        .init();
}
