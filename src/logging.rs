//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise `default_directive` applies. Output
//! goes to stderr so JSON responses on stdout stay machine-readable.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "webinstall=info";

pub fn build_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

pub fn init(json: bool, default_directive: &str) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_directive))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
