//! Mode-gated diagnostics
//!
//! Diagnostics always go to stderr. In transparent mode no subscriber is
//! installed at all, so `tracing` events are dropped before formatting.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::args_parser::Mode;
use crate::config::LaunchConfig;

/// Install the diagnostics subscriber for this run
pub fn init(mode: Mode, config: &LaunchConfig) {
    if !mode.allows_diagnostics() {
        return;
    }

    let default_level = if config.debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .try_init();
}

/// Print a fatal error; allowed in every mode since no protocol channel exists yet
pub fn report_fatal(error: &crate::error::LaunchError) {
    eprintln!("Error: {}", error);
    eprintln!();
    eprintln!("{}", error.remediation());
    eprintln!();
    eprintln!("Troubleshooting:");
    eprintln!("  1. Ensure Python 3.10+ is installed and available in PATH");
    eprintln!("  2. Check internet connectivity for package installation");
    eprintln!("  3. Verify write permissions to the cache directory");
}
