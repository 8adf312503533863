// Tracing subscriber setup.
//
// Log lines go to stderr so stdout carries only the report, which keeps
// `--format json` output pipeable.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`;
/// `quiet` lowers the default to warnings only.
pub fn init_logging(level: &str, quiet: bool) {
    let effective_level = if quiet { "warn" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
