// src/logging.rs

//! Logging setup for `assetdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (applies to `assetdag` itself)
//! 2. `ASSETDAG_LOG` environment variable, as a full `EnvFilter` directive
//!    string (e.g. `"debug"` or `"assetdag=debug,tower_http=trace"`)
//! 3. default to `info` for `assetdag` and `warn` for everything else
//!
//! Logs go to STDERR; stdout is reserved for `--dry-run` output.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` flag is given.
pub const LOG_ENV_VAR: &str = "ASSETDAG_LOG";

const DEFAULT_DIRECTIVES: &str = "warn,assetdag=info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::try_new(format!("warn,assetdag={}", directive_for(lvl)))
            .context("building log filter from --log-level")?,
        None => match std::env::var(LOG_ENV_VAR) {
            Ok(spec) if !spec.trim().is_empty() => EnvFilter::try_new(spec.trim())
                .with_context(|| format!("parsing {LOG_ENV_VAR}"))?,
            _ => EnvFilter::new(DEFAULT_DIRECTIVES),
        },
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cli_level_builds_a_valid_filter() {
        for lvl in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            let spec = format!("warn,assetdag={}", directive_for(lvl));
            assert!(EnvFilter::try_new(&spec).is_ok(), "{spec}");
        }
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
    }
}
