//! Utilities: logging setup.
//!
//! Logs go to stderr; stdout carries only command output (one JSON payload,
//! or event lines for `rtm.events`).
//!
//!   derive_level  -v / -q flags -> LevelFilter
//!   init_logging  install the tracing subscriber (RUST_LOG wins when set)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Map the verbosity flags to a log level.
///
///   -q      error
///   (none)  warn
///   -v      info
///   -vv     debug
///   -vvv    trace
pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
