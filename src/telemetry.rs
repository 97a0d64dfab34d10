//! Diagnostic logging to stderr

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{PunchlineError, Result};

/// Filter directives read from here first, then from `RUST_LOG`
pub const LOG_ENV: &str = "PUNCHLINE_LOG";

/// Default level from `-v`/`-q` flags, falling back to the configured one
pub fn resolve_level(verbose: u8, quiet: bool, configured: &str) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => configured.parse().unwrap_or(LevelFilter::WARN),
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber. Output goes to stderr so stdout stays
/// machine-readable.
pub fn init(level: LevelFilter) -> Result<()> {
    let env_var = if std::env::var_os(LOG_ENV).is_some() {
        LOG_ENV
    } else {
        EnvFilter::DEFAULT_ENV
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(env_var)
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| PunchlineError::Config(format!("failed to install logger: {err}")))
}
