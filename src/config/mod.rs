// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Provide the built-in pipeline definition (`builtin.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate tasks and pipelines (`validate.rs`).

pub mod builtin;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    ConfigSource, DEFAULT_CONFIG_FILE, load_and_validate, load_builtin, load_from_path, parse_raw,
    resolve,
};
pub use model::{
    ConfigFile, ConfigSection, PathsSection, PipelineConfig, RawConfigFile, ServerSection,
    StepConfig, TaskConfig,
};
