//! Logging setup for the stresstest binary.

use std::env;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Initializes the tracing subscriber, writing to stderr so log lines do not
/// interleave with the final report on stdout.
pub fn init_tracing() {
    let (level, env_filter) = parse_rust_log();
    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(format.with_filter(LevelFilter::from(level)))
        .with(env_filter)
        .init();
}

/// Interprets `RUST_LOG` either as a plain level or as a full filter spec.
fn parse_rust_log() -> (Level, EnvFilter) {
    let level = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => match value.parse::<Level>() {
            Ok(level) => level,
            Err(_) => return (Level::TRACE, EnvFilter::new(value)),
        },
        Err(_) => Level::INFO,
    };

    // Maximum verbosity per target; filtered down to `level` above.
    let env_filter = EnvFilter::new("INFO,search_stresstest=TRACE");
    (level, env_filter)
}
