//! Diagnostic logging to stderr.
//!
//! Quiet by default (warnings only). `--debug` or `debug: true` in the config
//! turns on debug output for this crate; `RUST_LOG` overrides both.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub fn init(debug: bool) -> Result<()> {
    let filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        EnvFilter::from_default_env()
    } else {
        let level = if debug { "debug" } else { "warn" };
        EnvFilter::new("warn")
            .add_directive(format!("devopscli={level}").parse()?)
            .add_directive("reqwest=warn".parse()?)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
