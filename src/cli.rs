// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Name of the pipeline run when no target is given.
pub const DEFAULT_TARGET: &str = "default";

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build front-end assets through a task DAG, then watch and live-reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Pipeline to run (e.g. `default`, `build`), or the name of a single
    /// task to run once.
    #[arg(value_name = "TARGET", default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Path to the config file (TOML).
    ///
    /// When omitted, `Assetdag.toml` in the current directory is used if it
    /// exists; otherwise the built-in pipeline definition applies.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Run the build pass once and exit, even for watching pipelines.
    #[arg(long)]
    pub once: bool,

    /// Override the dev server port.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved pipeline, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_defaults_to_default_pipeline() {
        let args = CliArgs::parse_from(["assetdag"]);
        assert_eq!(args.target, DEFAULT_TARGET);
        assert!(!args.once);
        assert!(args.config.is_none());
    }

    #[test]
    fn explicit_target_and_flags() {
        let args =
            CliArgs::parse_from(["assetdag", "build", "--once", "--port", "4000", "--dry-run"]);
        assert_eq!(args.target, "build");
        assert!(args.once);
        assert!(args.dry_run);
        assert_eq!(args.port, Some(4000));
    }
}
