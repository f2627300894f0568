// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::builtin::BUILTIN_CONFIG;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetdagError, Result};

/// File name looked up in the working directory when `--config` is omitted.
pub const DEFAULT_CONFIG_FILE: &str = "Assetdag.toml";

/// Where a configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Builtin,
}

/// Parse TOML into a `RawConfigFile` without semantic validation.
pub fn parse_raw(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (task compilation, pipeline DAGs). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_raw(&contents)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Parse and validate the built-in pipeline definition.
pub fn load_builtin() -> Result<ConfigFile> {
    ConfigFile::try_from(parse_raw(BUILTIN_CONFIG)?)
}

/// Resolve the configuration for a run.
///
/// - An explicit path must exist.
/// - Without one, `Assetdag.toml` in `cwd` is used when present, and the
///   built-in definition otherwise.
pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<(ConfigFile, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(AssetdagError::ConfigError(format!(
                "config file {:?} does not exist",
                path
            )));
        }
        let cfg = load_and_validate(path)?;
        return Ok((cfg, ConfigSource::File(path.to_path_buf())));
    }

    let candidate = cwd.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        info!(path = ?candidate, "using project config file");
        let cfg = load_and_validate(&candidate)?;
        return Ok((cfg, ConfigSource::File(candidate)));
    }

    info!("no {DEFAULT_CONFIG_FILE} found; using built-in pipeline definition");
    Ok((load_builtin()?, ConfigSource::Builtin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_is_valid() {
        let cfg = load_builtin().expect("built-in config must validate");
        assert!(cfg.pipeline("default").is_some());
        assert!(cfg.pipeline("build").is_some());
        assert!(cfg.task("scripts").is_some());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = resolve(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(_)));
    }

    #[test]
    fn falls_back_to_builtin_without_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let (_, source) = resolve(None, dir.path()).unwrap();
        assert_eq!(source, ConfigSource::Builtin);
    }

    #[test]
    fn picks_up_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"
[task.clean]
kind = "clean"

[pipeline.default]
steps = ["clean"]
"#,
        )
        .unwrap();

        let (cfg, source) = resolve(None, dir.path()).unwrap();
        assert_eq!(source, ConfigSource::File(dir.path().join(DEFAULT_CONFIG_FILE)));
        assert_eq!(cfg.tasks.len(), 1);
    }
}
